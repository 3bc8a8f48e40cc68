//! Prompter - interactive command-line prompts
//!
//! This library asks the user for values in the terminal: free text, numbers,
//! passwords, yes/no confirmations and choices from a list. Each prompt is
//! redrawn in place as the user types and collapses to a one-line summary
//! once answered.
//!
//! # Features
//!
//! - **Line Editing**: Cursor movement, forward delete, masked input, placeholders and defaults
//! - **Lists**: Single and multiple selection with wraparound, digit shortcuts and disabled entries
//! - **Validation**: Required check, pluggable schema and sync or async validator callbacks
//! - **Cancellation**: Ctrl+C or Ctrl+D ends a prompt, even while validation is pending
//! - **Fallback**: Line-based input when stdin is not a terminal
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use prompter::{Choice, Outcome, PromptConfig, Prompter};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut prompter = Prompter::stdio()?;
//!
//! let path = prompter
//!     .text(&PromptConfig::new("Where should we create your project?").with_default("./my-app"))
//!     .await?;
//!
//! let choices = vec![Choice::new("bare", "Bare"), Choice::new("ssr", "SSR")];
//! if let Outcome::Submitted(template) = prompter.select(&PromptConfig::new("Template"), choices).await? {
//!     println!("{path:?} with {template}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Answers come back as `Outcome::Submitted(value)` or `Outcome::Cancelled`;
//! only terminal failures and malformed choice lists are errors.

pub mod cli;

// Re-export commonly used types for convenience
pub use cli::{
    Choice, EngineConfig, Outcome, PromptConfig, PromptError, PromptMode, PromptSession, Prompter,
    TerminalHandle, Validator,
};
