//! Controller seam shared by the line-editing and list-navigation prompts.

use async_trait::async_trait;
use serde_json::Value;

use super::format::Frame;
use super::keys::KeyEvent;

/// Lifecycle of one prompt run.
///
/// `Editing` also covers list navigation. `Error` is `Editing` with a
/// message on show; the next edit drops back to plain `Editing`.
/// `Submitted` and `Cancelled` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Editing,
    Validating,
    Error(String),
    Submitted(Value),
    Cancelled,
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ControllerState::Submitted(_) | ControllerState::Cancelled)
    }
}

/// What the session should do after a key was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Nothing changed; no render
    Ignored,
    Redraw,
    /// State is now `Validating`; call `submit`
    Submit,
    Cancel,
}

#[async_trait]
pub trait Controller: Send {
    fn state(&self) -> &ControllerState;

    /// Describe the current render
    fn frame(&self) -> Frame;

    fn handle_key(&mut self, key: &KeyEvent) -> Reaction;

    /// Validate the frozen answer; leaves the state `Submitted` or `Error`
    async fn submit(&mut self);
}
