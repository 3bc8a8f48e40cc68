//! Interactive Prompt Engine Module
//!
//! Single-line and list prompts rendered in place in the terminal, with
//! async validation that can be interrupted by Ctrl+C.
//!
//! ## Module Structure
//!
//! - `keys` - Raw byte stream to logical key events
//! - `render` - Erase-and-redraw of a multi-line block with a row budget
//! - `validate` - Required, schema and validator checks in one pass
//! - `controller` - State and reaction types shared by the controllers
//! - `line_edit` - Text, number, password and confirm input
//! - `list_nav` - Select and multiselect navigation
//! - `format` - Frame description and the default formatter
//! - `config` - Prompt, choice, style and engine configuration
//! - `terminal` - Terminal control seam and raw-mode guard
//! - `session` - Runs one prompt against a terminal
//! - `prompter` - Typed prompt wrappers
//! - `error` - Error types

pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod keys;
pub mod line_edit;
pub mod list_nav;
pub mod prompter;
pub mod render;
pub mod session;
pub mod terminal;
pub mod validate;

// Re-export main types for convenience
pub use config::{Choice, EngineConfig, Messages, PromptConfig, StyleOptions};
pub use controller::{Controller, ControllerState, Reaction};
pub use error::{ConfigError, PromptError};
pub use format::{Formatter, Frame, FrameStatus, ThemeFormatter};
pub use keys::{KeyDecoder, KeyEvent, KeySource};
pub use line_edit::{EditMode, LineEditController};
pub use list_nav::ListNavController;
pub use prompter::Prompter;
pub use render::LineBudgetRenderer;
pub use session::{Outcome, PromptMode, PromptSession};
pub use terminal::{CrosstermControl, RawModeGuard, TerminalControl, TerminalHandle};
pub use validate::{Schema, ValidationOutcome, ValidationPipeline, Validator};
