//! Line Edit Controller
//!
//! State machine behind text, number, password and confirm prompts. The user
//! edits one line in place; Enter freezes it, substitutes the default when it
//! is empty, coerces it for the mode and runs the validation pipeline. A
//! rejected answer stays in the buffer so it can be fixed rather than retyped.

use async_trait::async_trait;
use crossterm::style::Stylize;
use serde_json::{Number, Value};
use tracing::{debug, trace};

use super::config::{EngineConfig, Messages, PromptConfig};
use super::controller::{Controller, ControllerState, Reaction};
use super::format::{Frame, FrameStatus};
use super::keys::KeyEvent;
use super::validate::{ValidationOutcome, ValidationPipeline};

/// Flavor of line input; only changes coercion and echo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    PlainText,
    Numeric,
    Masked,
    YesNo,
}

pub struct LineEditController {
    mode: EditMode,
    title: String,
    hint: Option<String>,
    placeholder: Option<String>,
    default_text: Option<String>,
    buffer: Vec<char>,
    cursor: usize,
    state: ControllerState,
    pipeline: ValidationPipeline,
    messages: Messages,
    mask_char: char,
    keep_buffer_on_error: bool,
}

impl LineEditController {
    pub fn new(config: &PromptConfig, mode: EditMode, engine: &EngineConfig) -> Self {
        let pipeline = ValidationPipeline::new(config.schema.clone(), config.validate.clone())
            .required(config.required.unwrap_or(true))
            .with_messages(engine.messages.clone());

        Self {
            mode,
            title: config.title.clone(),
            hint: config.hint.clone(),
            placeholder: config.placeholder.clone(),
            default_text: config.default_text(),
            buffer: Vec::new(),
            cursor: 0,
            state: ControllerState::Editing,
            pipeline,
            messages: engine.messages.clone(),
            mask_char: engine.mask_char,
            keep_buffer_on_error: true,
        }
    }

    /// Cooked-line input: after a rejection the user types a fresh line
    pub fn line_mode(mut self) -> Self {
        self.keep_buffer_on_error = false;
        self
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn buffer(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn insert(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.buffer.remove(self.cursor);
        }
    }

    fn delete_forward(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
        }
    }

    /// Mode-specific type gate, applied before schema and validator
    fn coerce(&self, answer: &str) -> Result<Value, String> {
        match self.mode {
            EditMode::PlainText | EditMode::Masked => Ok(Value::String(answer.to_string())),
            EditMode::Numeric if answer.trim().is_empty() => Ok(Value::Null),
            EditMode::Numeric => {
                parse_number(answer).ok_or_else(|| self.messages.invalid_number.clone())
            }
            EditMode::YesNo => parse_yes_no(answer)
                .map(Value::Bool)
                .ok_or_else(|| self.messages.confirm_vocabulary.clone()),
        }
    }

    async fn evaluate(&self, raw_answer: &str) -> Result<Value, String> {
        let answer = ValidationPipeline::resolve_answer(raw_answer, self.default_text.as_deref());

        // For confirm, an empty answer without default fails the vocabulary gate instead
        if self.mode != EditMode::YesNo {
            if let ValidationOutcome::Err(message) = self.pipeline.check_required(&answer) {
                return Err(message);
            }
        }

        let value = self.coerce(&answer)?;
        match self.pipeline.check(&value).await {
            ValidationOutcome::Ok => Ok(value),
            ValidationOutcome::Err(message) => Err(message),
        }
    }

    fn shown_chars(&self) -> Vec<char> {
        match self.mode {
            EditMode::Masked => vec![self.mask_char; self.buffer.len()],
            _ => self.buffer.clone(),
        }
    }

    /// Buffer with a reverse-video cell marking the caret
    fn input_line(&self) -> String {
        if self.buffer.is_empty() {
            if let Some(placeholder) = &self.placeholder {
                let mut rest = placeholder.chars();
                let first = rest.next().map_or_else(|| " ".to_string(), String::from);
                return format!("{}{}", first.reverse(), rest.as_str().dim());
            }
        }

        let shown = self.shown_chars();
        let before: String = shown[..self.cursor].iter().collect();
        let at = shown
            .get(self.cursor)
            .map_or_else(|| " ".to_string(), char::to_string);
        let after: String = shown.iter().skip(self.cursor + 1).collect();
        format!("{before}{}{after}", at.reverse())
    }

    fn hint_text(&self) -> Option<String> {
        let default = match self.mode {
            EditMode::YesNo => {
                let yes_no = match self.default_text.as_deref().and_then(parse_yes_no) {
                    Some(true) => "(Y/n)",
                    Some(false) => "(y/N)",
                    None => "(y/n)",
                };
                Some(yes_no.to_string())
            }
            EditMode::Masked => None,
            _ => self.default_text.as_ref().map(|text| format!("({text})")),
        };

        match (&self.hint, default) {
            (Some(hint), Some(default)) => Some(format!("{hint} {default}")),
            (Some(hint), None) => Some(hint.clone()),
            (None, default) => default,
        }
    }

    fn summary(&self, value: &Value) -> String {
        match (self.mode, value) {
            (EditMode::Masked, Value::String(s)) => {
                self.mask_char.to_string().repeat(s.chars().count())
            }
            (EditMode::YesNo, Value::Bool(yes)) => (if *yes { "Yes" } else { "No" }).to_string(),
            (_, Value::String(s)) => s.clone(),
            (_, Value::Null) => String::new(),
            (_, other) => other.to_string(),
        }
    }
}

#[async_trait]
impl Controller for LineEditController {
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
            ControllerState::Editing | ControllerState::Cancelled => {}
        }
        frame.hint = self.hint_text();
        frame.content = Some(self.input_line());
        frame
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Reaction {
        if self.state.is_terminal() {
            return Reaction::Ignored;
        }
        if key.is_abort() {
            debug!(mode = ?self.mode, "prompt cancelled");
            self.state = ControllerState::Cancelled;
            return Reaction::Cancel;
        }
        if self.state == ControllerState::Validating {
            return Reaction::Ignored;
        }

        let edited = match key {
            KeyEvent::Enter => {
                self.state = ControllerState::Validating;
                return Reaction::Submit;
            }
            KeyEvent::Backspace => {
                self.backspace();
                true
            }
            KeyEvent::Delete => {
                self.delete_forward();
                true
            }
            KeyEvent::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyEvent::Right => {
                self.cursor = (self.cursor + 1).min(self.buffer.len());
                true
            }
            other => match other.as_char() {
                Some(ch) if !ch.is_control() => {
                    self.insert(ch);
                    true
                }
                _ => false,
            },
        };

        if !edited {
            return Reaction::Ignored;
        }
        if matches!(self.state, ControllerState::Error(_)) {
            self.state = ControllerState::Editing;
        }
        trace!(len = self.buffer.len(), cursor = self.cursor, "buffer edited");
        Reaction::Redraw
    }

    async fn submit(&mut self) {
        let raw_answer = self.buffer();
        match self.evaluate(&raw_answer).await {
            Ok(value) => {
                debug!(mode = ?self.mode, "answer accepted");
                self.state = ControllerState::Submitted(value);
            }
            Err(message) => {
                debug!(mode = ?self.mode, %message, "answer rejected");
                if !self.keep_buffer_on_error {
                    self.buffer.clear();
                    self.cursor = 0;
                }
                self.state = ControllerState::Error(message);
            }
        }
    }
}

/// Integers stay integers; anything else must be a finite float
pub fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

pub fn parse_yes_no(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::keys::KeyDecoder;
    use crate::cli::render::strip_ansi;
    use crate::cli::validate::Validator;
    use serde_json::json;

    fn controller(config: PromptConfig, mode: EditMode) -> LineEditController {
        LineEditController::new(&config, mode, &EngineConfig::default())
    }

    fn press(controller: &mut LineEditController, script: &str) -> Vec<Reaction> {
        KeyDecoder::decode_all(script.as_bytes())
            .iter()
            .map(|key| controller.handle_key(key))
            .collect()
    }

    #[tokio::test]
    async fn test_enter_on_empty_submits_default() {
        let mut c = controller(
            PromptConfig::new("Project path").with_default("./sparkling-solid"),
            EditMode::PlainText,
        );
        assert_eq!(press(&mut c, "\r"), vec![Reaction::Submit]);
        assert_eq!(c.state(), &ControllerState::Validating);

        c.submit().await;
        assert_eq!(c.state(), &ControllerState::Submitted(json!("./sparkling-solid")));
    }

    #[tokio::test]
    async fn test_empty_without_default_reprompts() {
        let mut c = controller(PromptConfig::new("Name"), EditMode::PlainText);
        press(&mut c, "\r");
        c.submit().await;
        assert_eq!(c.state(), &ControllerState::Error("Please enter a value.".to_string()));
        assert_eq!(c.frame().error.as_deref(), Some("Please enter a value."));
    }

    #[tokio::test]
    async fn test_numeric_gate_then_retry() {
        let mut c = controller(PromptConfig::new("Port"), EditMode::Numeric);
        press(&mut c, "abc\r");
        c.submit().await;
        assert_eq!(
            c.state(),
            &ControllerState::Error("Please enter a valid number.".to_string())
        );
        assert_eq!(c.buffer(), "abc");

        press(&mut c, "\x7f\x7f\x7f42\r");
        c.submit().await;
        assert_eq!(c.state(), &ControllerState::Submitted(json!(42)));
    }

    #[tokio::test]
    async fn test_numeric_gate_runs_before_validator() {
        let validator = Validator::sync(|_: &Value| "validator reached");
        let mut c = controller(
            PromptConfig::new("Port").with_validator(validator),
            EditMode::Numeric,
        );
        press(&mut c, "x\r");
        c.submit().await;
        assert_eq!(
            c.state(),
            &ControllerState::Error("Please enter a valid number.".to_string())
        );
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 7 "), Some(json!(7)));
        assert_eq!(parse_number("3.5"), Some(json!(3.5)));
        assert_eq!(parse_number("-12"), Some(json!(-12)));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[tokio::test]
    async fn test_password_masks_and_backspaces_logical_chars() {
        let mut c = controller(PromptConfig::new("Secret"), EditMode::Masked);
        press(&mut c, "pé日");
        assert_eq!(strip_ansi(c.frame().content.as_deref().unwrap()), "*** ");

        press(&mut c, "\x7f");
        assert_eq!(c.buffer(), "pé");
        assert_eq!(strip_ansi(c.frame().content.as_deref().unwrap()), "** ");

        press(&mut c, "\r");
        c.submit().await;
        assert_eq!(c.state(), &ControllerState::Submitted(json!("pé")));
        assert_eq!(c.frame().content.as_deref(), Some("**"));
    }

    #[tokio::test]
    async fn test_confirm_vocabulary() {
        let mut c = controller(PromptConfig::new("Install?"), EditMode::YesNo);
        press(&mut c, "maybe\r");
        c.submit().await;
        assert_eq!(c.state(), &ControllerState::Error("Please answer y or n.".to_string()));

        let mut c = controller(PromptConfig::new("Install?"), EditMode::YesNo);
        press(&mut c, "\r");
        c.submit().await;
        assert_eq!(c.state(), &ControllerState::Error("Please answer y or n.".to_string()));

        let mut c = controller(PromptConfig::new("Install?"), EditMode::YesNo);
        press(&mut c, "YES\r");
        c.submit().await;
        assert_eq!(c.state(), &ControllerState::Submitted(json!(true)));
        assert_eq!(c.frame().content.as_deref(), Some("Yes"));
    }

    #[tokio::test]
    async fn test_confirm_default() {
        let mut c = controller(PromptConfig::new("Install?").with_default(false), EditMode::YesNo);
        assert_eq!(c.frame().hint.as_deref(), Some("(y/N)"));
        press(&mut c, "\r");
        c.submit().await;
        assert_eq!(c.state(), &ControllerState::Submitted(json!(false)));
    }

    #[test]
    fn test_cursor_editing() {
        let mut c = controller(PromptConfig::new("Name"), EditMode::PlainText);
        press(&mut c, "acd\x1b[D\x1b[D");
        assert_eq!(c.cursor(), 1);
        press(&mut c, "b");
        assert_eq!(c.buffer(), "abcd");

        press(&mut c, "\x1b[3~");
        assert_eq!(c.buffer(), "abd");
        press(&mut c, "\x1b[C\x1b[C\x1b[C");
        assert_eq!(c.cursor(), 3);
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let mut c = controller(PromptConfig::new("Name"), EditMode::PlainText);
        assert_eq!(press(&mut c, "\x1b[A\x1b[15~"), vec![Reaction::Ignored, Reaction::Ignored]);
        assert_eq!(c.buffer(), "");
    }

    #[tokio::test]
    async fn test_edit_after_error_returns_to_editing() {
        let mut c = controller(PromptConfig::new("Port"), EditMode::Numeric);
        press(&mut c, "x\r");
        c.submit().await;
        assert!(matches!(c.state(), ControllerState::Error(_)));

        assert_eq!(press(&mut c, "\x7f"), vec![Reaction::Redraw]);
        assert_eq!(c.state(), &ControllerState::Editing);
        assert_eq!(c.frame().error, None);
    }

    #[tokio::test]
    async fn test_line_mode_clears_rejected_buffer() {
        let mut c = controller(PromptConfig::new("Port"), EditMode::Numeric).line_mode();
        press(&mut c, "abc\r");
        c.submit().await;
        assert_eq!(c.buffer(), "");
    }

    #[test]
    fn test_ctrl_c_is_terminal() {
        let mut c = controller(PromptConfig::new("Name"), EditMode::PlainText);
        assert_eq!(press(&mut c, "a\x03b"), vec![Reaction::Redraw, Reaction::Cancel, Reaction::Ignored]);
        assert_eq!(c.state(), &ControllerState::Cancelled);
        assert_eq!(c.buffer(), "a");
    }

    #[test]
    fn test_placeholder_and_default_hint() {
        let c = controller(
            PromptConfig::new("Project path")
                .with_placeholder("my-app")
                .with_default("./sparkling-solid"),
            EditMode::PlainText,
        );
        let frame = c.frame();
        assert_eq!(frame.hint.as_deref(), Some("(./sparkling-solid)"));
        assert_eq!(strip_ansi(frame.content.as_deref().unwrap()), "my-app");
    }
}
