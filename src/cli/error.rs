//! Error types for prompt sessions and configuration loading.
//!
//! Validation failures are not errors: they stay inside the controller as
//! `ControllerState::Error` and drive the retry loop. A user abort is not an
//! error either; it resolves the session with `Outcome::Cancelled`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    /// The requested prompt needs raw single-key input but there is no TTY
    #[error("{mode} prompts need an interactive terminal")]
    UnsupportedTerminal { mode: &'static str },

    #[error("malformed choice list: {reason}")]
    MalformedChoiceList { reason: String },

    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
