//! Validation Pipeline
//!
//! Folds the required check, the structural schema check and the user's
//! validator callback into one ordered pass. At most one message comes out of
//! a pass: the first source to fail wins.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use tracing::debug;

use super::config::Messages;

/// Normalized result of any validation source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok,
    Err(String),
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Ok)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Ok => None,
            ValidationOutcome::Err(message) => Some(message),
        }
    }
}

/// `true` passes; `false` fails without a message of its own. An empty
/// message is replaced by the engine's `invalid_input` message.
impl From<bool> for ValidationOutcome {
    fn from(valid: bool) -> Self {
        if valid {
            ValidationOutcome::Ok
        } else {
            ValidationOutcome::Err(String::new())
        }
    }
}

/// Any string returned by a validator is the failure message
impl From<String> for ValidationOutcome {
    fn from(message: String) -> Self {
        ValidationOutcome::Err(message)
    }
}

impl From<&str> for ValidationOutcome {
    fn from(message: &str) -> Self {
        ValidationOutcome::Err(message.to_string())
    }
}

impl From<Result<(), String>> for ValidationOutcome {
    fn from(result: Result<(), String>) -> Self {
        match result {
            Ok(()) => ValidationOutcome::Ok,
            Err(message) => ValidationOutcome::Err(message),
        }
    }
}

/// Structural check consulted as a black box: an empty list means valid
pub trait Schema: Send + Sync {
    fn check(&self, value: &Value) -> Vec<String>;
}

impl<F> Schema for F
where
    F: Fn(&Value) -> Vec<String> + Send + Sync,
{
    fn check(&self, value: &Value) -> Vec<String> {
        self(value)
    }
}

type ValidateFn = dyn Fn(Value) -> BoxFuture<'static, ValidationOutcome> + Send + Sync;

/// User-supplied validator, sync or async, normalized at construction
#[derive(Clone)]
pub struct Validator(Arc<ValidateFn>);

impl Validator {
    /// Wrap an async validator
    pub fn new<F, Fut, R>(validate: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<ValidationOutcome>,
    {
        Self(Arc::new(move |value| {
            let pending = validate(value);
            async move {
                let outcome: ValidationOutcome = pending.await.into();
                outcome
            }
            .boxed()
        }))
    }

    /// Wrap a plain function
    pub fn sync<F, R>(validate: F) -> Self
    where
        F: Fn(&Value) -> R + Send + Sync + 'static,
        R: Into<ValidationOutcome>,
    {
        Self(Arc::new(move |value| {
            let outcome: ValidationOutcome = validate(&value).into();
            future::ready(outcome).boxed()
        }))
    }

    pub async fn call(&self, value: Value) -> ValidationOutcome {
        (self.0)(value).await
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator(..)")
    }
}

#[derive(Clone, Default)]
pub struct ValidationPipeline {
    schema: Option<Arc<dyn Schema>>,
    validator: Option<Validator>,
    required: bool,
    messages: Messages,
}

impl ValidationPipeline {
    pub fn new(schema: Option<Arc<dyn Schema>>, validator: Option<Validator>) -> Self {
        Self {
            schema,
            validator,
            required: false,
            messages: Messages::default(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Empty input falls back to the default when there is one
    pub fn resolve_answer(raw_answer: &str, default_value: Option<&str>) -> String {
        match default_value {
            Some(default) if raw_answer.is_empty() => default.to_string(),
            _ => raw_answer.to_string(),
        }
    }

    /// Full pass over a text answer: default substitution, required check,
    /// then schema and validator on the resolved string
    pub async fn validate(&self, raw_answer: &str, default_value: Option<&str>) -> ValidationOutcome {
        let answer = Self::resolve_answer(raw_answer, default_value);
        let required = self.check_required(&answer);
        if !required.is_ok() {
            return required;
        }
        self.check(&Value::String(answer)).await
    }

    pub fn check_required(&self, answer: &str) -> ValidationOutcome {
        if self.required && answer.is_empty() {
            ValidationOutcome::Err(self.messages.required.clone())
        } else {
            ValidationOutcome::Ok
        }
    }

    /// Schema first, then the validator; the first failure short-circuits
    pub async fn check(&self, value: &Value) -> ValidationOutcome {
        if let Some(schema) = &self.schema {
            let errors = schema.check(value);
            if !errors.is_empty() {
                let message = errors
                    .into_iter()
                    .find(|message| !message.is_empty())
                    .unwrap_or_else(|| self.messages.invalid_input.clone());
                debug!(%message, "schema rejected answer");
                return ValidationOutcome::Err(message);
            }
        }

        if let Some(validator) = &self.validator {
            return match validator.call(value.clone()).await {
                ValidationOutcome::Ok => ValidationOutcome::Ok,
                ValidationOutcome::Err(message) => {
                    let message = if message.is_empty() {
                        self.messages.invalid_input.clone()
                    } else {
                        message
                    };
                    debug!(%message, "validator rejected answer");
                    ValidationOutcome::Err(message)
                }
            };
        }

        ValidationOutcome::Ok
    }
}

impl fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("schema", &self.schema.is_some())
            .field("validator", &self.validator)
            .field("required", &self.required)
            .finish()
    }
}
