//! List Navigation Controller
//!
//! State machine behind select and multiselect prompts: a cursor moves over
//! a fixed list of choices with wraparound, skipping disabled entries.
//! Single-select submits the focused choice (a digit picks and submits at
//! once); multiselect toggles with Space and submits the set with Enter.

use std::collections::BTreeSet;

use async_trait::async_trait;
use crossterm::style::Stylize;
use serde_json::Value;
use tracing::{debug, trace};

use super::config::{Choice, EngineConfig, Messages, PromptConfig, StyleOptions};
use super::controller::{Controller, ControllerState, Reaction};
use super::error::PromptError;
use super::format::{Frame, FrameStatus};
use super::keys::KeyEvent;
use super::validate::{ValidationOutcome, ValidationPipeline};

const POINTER: &str = "❯";
const CHECKED: &str = "◉";
const UNCHECKED: &str = "◯";

pub struct ListNavController {
    title: String,
    hint: Option<String>,
    choices: Vec<Choice>,
    cursor: usize,
    selected: BTreeSet<usize>,
    multiple: bool,
    horizontal: bool,
    required: bool,
    notice: Option<String>,
    state: ControllerState,
    pipeline: ValidationPipeline,
    messages: Messages,
    style: StyleOptions,
}

impl ListNavController {
    pub fn new(
        config: &PromptConfig,
        choices: Vec<Choice>,
        multiple: bool,
        engine: &EngineConfig,
    ) -> Result<Self, PromptError> {
        if choices.is_empty() {
            return Err(PromptError::MalformedChoiceList {
                reason: "no choices supplied".to_string(),
            });
        }
        if choices.iter().all(|choice| choice.disabled) {
            return Err(PromptError::MalformedChoiceList {
                reason: "every choice is disabled".to_string(),
            });
        }

        // Required-ness of a multiselect is checked locally, not in the pipeline
        let pipeline = ValidationPipeline::new(config.schema.clone(), config.validate.clone())
            .with_messages(engine.messages.clone());

        let mut controller = Self {
            title: config.title.clone(),
            hint: config.hint.clone(),
            choices,
            cursor: 0,
            selected: BTreeSet::new(),
            multiple,
            horizontal: config.horizontal,
            required: config.required.unwrap_or(!multiple),
            notice: None,
            state: ControllerState::Editing,
            pipeline,
            messages: engine.messages.clone(),
            style: config.style.clone(),
        };
        controller.apply_default(config.default_value.as_ref());
        Ok(controller)
    }

    fn apply_default(&mut self, default: Option<&Value>) {
        self.cursor = self.first_enabled();

        let ids: Vec<&str> = match default {
            Some(Value::String(id)) => vec![id.as_str()],
            Some(Value::Array(ids)) => ids.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };

        if self.multiple {
            for id in ids {
                if let Some(index) = self.enabled_index_of(id) {
                    self.selected.insert(index);
                }
            }
        } else if let Some(index) = ids.first().and_then(|id| self.enabled_index_of(id)) {
            self.cursor = index;
        } else if let Some(id) = ids.first() {
            debug!(id, "default choice not in list, starting at the top");
        }
    }

    fn enabled_index_of(&self, id: &str) -> Option<usize> {
        self.choices
            .iter()
            .position(|choice| choice.id == id && !choice.disabled)
    }

    fn first_enabled(&self) -> usize {
        self.choices
            .iter()
            .position(|choice| !choice.disabled)
            .unwrap_or(0)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Ids of toggled choices, in list order
    pub fn selected_ids(&self) -> Vec<String> {
        self.selected
            .iter()
            .map(|&index| self.choices[index].id.clone())
            .collect()
    }

    /// Move to the next enabled choice in either direction, wrapping around
    fn step(&mut self, forward: bool) {
        let len = self.choices.len();
        let mut index = self.cursor;
        for _ in 0..len {
            index = if forward { (index + 1) % len } else { (index + len - 1) % len };
            if !self.choices[index].disabled {
                self.cursor = index;
                return;
            }
        }
    }

    fn toggle(&mut self) {
        if !self.selected.remove(&self.cursor) {
            self.selected.insert(self.cursor);
        }
    }

    fn answer(&self) -> Value {
        if self.multiple {
            Value::Array(self.selected_ids().into_iter().map(Value::String).collect())
        } else {
            Value::String(self.choices[self.cursor].id.clone())
        }
    }

    fn begin_submit(&mut self) -> Reaction {
        self.notice = None;
        self.state = ControllerState::Validating;
        Reaction::Submit
    }

    fn label_for<'a>(&'a self, id: &'a str) -> &'a str {
        self.choices
            .iter()
            .find(|choice| choice.id == id)
            .map_or(id, |choice| choice.label.as_str())
    }

    fn summary(&self, value: &Value) -> String {
        match value {
            Value::String(id) => self.label_for(id).to_string(),
            Value::Array(ids) => ids
                .iter()
                .filter_map(Value::as_str)
                .map(|id| self.label_for(id))
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        }
    }

    fn row(&self, index: usize, choice: &Choice) -> String {
        let focused = index == self.cursor;
        let pointer = if focused { POINTER } else { " " };
        let marker = if self.multiple {
            let mark = if self.selected.contains(&index) { CHECKED } else { UNCHECKED };
            mark.to_string()
        } else {
            format!("{}.", index + 1)
        };

        let mut row = format!("{marker} {}", choice.label);
        if choice.disabled {
            row.push_str(" (disabled)");
            return format!("{pointer} {}", row.dim());
        }
        if let Some(hint) = &choice.hint {
            row.push_str(&format!(" - {hint}"));
        }
        if focused {
            format!("{} {}", pointer.with(self.style.accent()), row.with(self.style.accent()))
        } else {
            format!("{pointer} {row}")
        }
    }

    fn default_hint(&self) -> &'static str {
        if self.multiple {
            "(↑/↓ move, space toggles, enter submits)"
        } else {
            "(↑/↓ move, 1-9 picks, enter submits)"
        }
    }
}

#[async_trait]
impl Controller for ListNavController {
    fn state(&self) -> &ControllerState {
        &self.state
    }

    fn frame(&self) -> Frame {
        let mut frame = Frame::new(self.title.as_str());
        match &self.state {
            ControllerState::Submitted(value) => {
                frame.status = FrameStatus::Done;
                frame.content = Some(self.summary(value));
                return frame;
            }
            ControllerState::Validating => frame.status = FrameStatus::Pending,
            ControllerState::Error(message) => frame.error = Some(message.clone()),
            ControllerState::Editing | ControllerState::Cancelled => {
                frame.error = self.notice.clone();
            }
        }

        frame.hint = Some(
            self.hint
                .clone()
                .unwrap_or_else(|| self.default_hint().to_string()),
        );
        let rows: Vec<String> = self
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| self.row(index, choice))
            .collect();
        frame.content = Some(rows.join("\n"));
        frame
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Reaction {
        if self.state.is_terminal() {
            return Reaction::Ignored;
        }
        if key.is_abort() {
            debug!(multiple = self.multiple, "selection cancelled");
            self.state = ControllerState::Cancelled;
            return Reaction::Cancel;
        }
        if self.state == ControllerState::Validating {
            return Reaction::Ignored;
        }

        match key {
            KeyEvent::Up => self.step(false),
            KeyEvent::Down => self.step(true),
            KeyEvent::Left if self.horizontal => self.step(false),
            KeyEvent::Right if self.horizontal => self.step(true),
            KeyEvent::Space if self.multiple => self.toggle(),
            KeyEvent::Digit(n) if !self.multiple => {
                let n = usize::from(*n);
                if n == 0 || n > self.choices.len() || self.choices[n - 1].disabled {
                    return Reaction::Ignored;
                }
                self.cursor = n - 1;
                return self.begin_submit();
            }
            KeyEvent::Enter => {
                if self.multiple && self.required && self.selected.is_empty() {
                    self.notice = Some(self.messages.select_at_least_one.clone());
                    return Reaction::Redraw;
                }
                return self.begin_submit();
            }
            _ => return Reaction::Ignored,
        }

        self.notice = None;
        if matches!(self.state, ControllerState::Error(_)) {
            self.state = ControllerState::Editing;
        }
        trace!(cursor = self.cursor, selected = self.selected.len(), "list navigated");
        Reaction::Redraw
    }

    async fn submit(&mut self) {
        let value = self.answer();
        match self.pipeline.check(&value).await {
            ValidationOutcome::Ok => {
                debug!(multiple = self.multiple, "selection accepted");
                self.state = ControllerState::Submitted(value);
            }
            ValidationOutcome::Err(message) => {
                debug!(%message, "selection rejected");
                self.state = ControllerState::Error(message);
            }
        }
    }
}
