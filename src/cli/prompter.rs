//! Typed Prompter
//!
//! Thin layer over `PromptSession` that runs one prompt per call and hands
//! back answers as plain Rust types instead of JSON values.

use serde_json::Value;
use tracing::debug;

use super::config::{Choice, EngineConfig, PromptConfig};
use super::error::{ConfigError, PromptError};
use super::session::{Outcome, PromptMode, PromptSession};
use super::terminal::TerminalHandle;

pub struct Prompter {
    session: PromptSession,
}

impl Prompter {
    /// Prompter over the process terminal, configured from `PROMPTER_CONFIG`
    pub fn stdio() -> Result<Self, ConfigError> {
        let engine = EngineConfig::from_env()?;
        Ok(Self::with_session(PromptSession::new(TerminalHandle::stdio(), engine)))
    }

    pub fn with_session(session: PromptSession) -> Self {
        Self { session }
    }

    pub fn session(&mut self) -> &mut PromptSession {
        &mut self.session
    }

    pub async fn text(&mut self, config: &PromptConfig) -> Result<Outcome<String>, PromptError> {
        let outcome = self.session.run(config, PromptMode::Text).await?;
        Ok(outcome.map(into_string))
    }

    /// `None` when the prompt was optional and left empty
    pub async fn number(&mut self, config: &PromptConfig) -> Result<Outcome<Option<f64>>, PromptError> {
        let outcome = self.session.run(config, PromptMode::Number).await?;
        Ok(outcome.map(|value| value.as_f64()))
    }

    pub async fn password(&mut self, config: &PromptConfig) -> Result<Outcome<String>, PromptError> {
        let outcome = self.session.run(config, PromptMode::Password).await?;
        Ok(outcome.map(into_string))
    }

    pub async fn confirm(&mut self, config: &PromptConfig) -> Result<Outcome<bool>, PromptError> {
        let outcome = self.session.run(config, PromptMode::Confirm).await?;
        Ok(outcome.map(|value| value.as_bool().unwrap_or(false)))
    }

    /// Pick one choice. The picked choice's action, if any, runs before this
    /// returns.
    pub async fn select(
        &mut self,
        config: &PromptConfig,
        choices: Vec<Choice>,
    ) -> Result<Outcome<String>, PromptError> {
        let outcome = self
            .session
            .run(config, PromptMode::Select(choices.clone()))
            .await?
            .map(into_string);

        if let Outcome::Submitted(id) = &outcome {
            if let Some(choice) = choices.iter().find(|choice| &choice.id == id) {
                if choice.has_action() {
                    debug!(id = %choice.id, "running choice action");
                    choice.run_action().await;
                }
            }
        }
        Ok(outcome)
    }

    /// Pick any number of choices; ids come back in list order
    pub async fn multiselect(
        &mut self,
        config: &PromptConfig,
        choices: Vec<Choice>,
    ) -> Result<Outcome<Vec<String>>, PromptError> {
        let outcome = self.session.run(config, PromptMode::MultiSelect(choices)).await?;
        Ok(outcome.map(|value| match value {
            Value::Array(ids) => ids.into_iter().map(into_string).collect(),
            _ => Vec::new(),
        }))
    }
}

fn into_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
