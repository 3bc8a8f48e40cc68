//! Prompt Formatting
//!
//! The engine describes what to show as a `Frame`; a `Formatter` turns it
//! into the styled string the renderer draws. `ThemeFormatter` is the
//! built-in one.

use crossterm::style::Stylize;

use super::config::StyleOptions;

/// Where the prompt is in its lifecycle, as far as display goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Active,
    Pending,
    Done,
}

impl FrameStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            FrameStatus::Active => "?",
            FrameStatus::Pending => "…",
            FrameStatus::Done => "✔",
        }
    }
}

/// Unstyled description of one prompt render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub title: String,
    pub content: Option<String>,
    pub hint: Option<String>,
    pub error: Option<String>,
    pub status: FrameStatus,
}

impl Frame {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: None,
            hint: None,
            error: None,
            status: FrameStatus::Active,
        }
    }
}

/// Formatting collaborator: one styled, possibly multi-line string per frame
pub trait Formatter: Send + Sync {
    fn format(&self, frame: &Frame, style: &StyleOptions) -> String;
}

/// Default look: symbol and bold title, indented content, error underneath.
/// A finished prompt collapses to a single summary line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeFormatter;

impl Formatter for ThemeFormatter {
    fn format(&self, frame: &Frame, style: &StyleOptions) -> String {
        let title = frame.title.as_str().bold();

        if frame.status == FrameStatus::Done {
            let symbol = frame.status.symbol().with(style.done());
            let answer = frame.content.as_deref().unwrap_or_default();
            return format!("{symbol} {title} {}", answer.with(style.accent()));
        }

        let symbol = frame.status.symbol().with(style.accent());
        let mut head = format!("{symbol} {title}");
        if let Some(hint) = &frame.hint {
            head.push(' ');
            head.push_str(&hint.as_str().with(style.hint()).to_string());
        }

        let mut lines = vec![head];
        if let Some(content) = &frame.content {
            lines.extend(content.split('\n').map(|line| format!("  {line}")));
        }
        if let Some(error) = &frame.error {
            lines.push(format!("  {}", format!("✖ {error}").with(style.error())));
        }
        lines.join("\n")
    }
}
