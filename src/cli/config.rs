//! Prompt Configuration
//!
//! Per-prompt settings (`PromptConfig`, `Choice`), the style options handed
//! through to the formatter, and the engine-wide `EngineConfig` with every
//! user-visible engine message.

use std::env;
use std::fmt;
use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crossterm::style::Color;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::ConfigError;
use super::validate::{Schema, Validator};

/// Environment variable naming a JSON engine config file
pub const CONFIG_ENV_VAR: &str = "PROMPTER_CONFIG";

/// Every message the engine itself shows to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub invalid_number: String,
    pub required: String,
    pub invalid_input: String,
    pub confirm_vocabulary: String,
    pub select_at_least_one: String,
    pub non_tty_warning: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            invalid_number: "Please enter a valid number.".to_string(),
            required: "Please enter a value.".to_string(),
            invalid_input: "Invalid input.".to_string(),
            confirm_vocabulary: "Please answer y or n.".to_string(),
            select_at_least_one: "Please select at least one option.".to_string(),
            non_tty_warning: "Warning: not running in an interactive terminal, reading plain lines from stdin."
                .to_string(),
        }
    }
}

/// Engine-wide settings shared by every prompt of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mask_char: char,
    pub fallback_width: usize,
    pub escape_timeout_ms: u64,
    pub messages: Messages,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mask_char: '*',
            fallback_width: 80,
            escape_timeout_ms: 10,
            messages: Messages::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the file named by `PROMPTER_CONFIG`, or defaults when unset
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => {
                debug!(path = ?path, "loading engine config");
                Self::from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Style fields owned by the formatter; the engine passes them through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleOptions {
    pub accent_color: String,
    pub error_color: String,
    pub hint_color: String,
    pub done_color: String,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            accent_color: "Cyan".to_string(),
            error_color: "Red".to_string(),
            hint_color: "DarkGrey".to_string(),
            done_color: "Green".to_string(),
        }
    }
}

impl StyleOptions {
    pub fn accent(&self) -> Color {
        color_by_name(&self.accent_color)
    }

    pub fn error(&self) -> Color {
        color_by_name(&self.error_color)
    }

    pub fn hint(&self) -> Color {
        color_by_name(&self.hint_color)
    }

    pub fn done(&self) -> Color {
        color_by_name(&self.done_color)
    }
}

/// Map a color name to a terminal color, falling back to the terminal default
pub fn color_by_name(name: &str) -> Color {
    match name {
        "Black" => Color::Black,
        "DarkBlue" => Color::DarkBlue,
        "Blue" => Color::Blue,
        "Cyan" => Color::Cyan,
        "DarkCyan" => Color::DarkCyan,
        "Gray" | "Grey" => Color::Grey,
        "DarkGray" | "DarkGrey" => Color::DarkGrey,
        "Magenta" => Color::Magenta,
        "Green" => Color::Green,
        "Red" => Color::Red,
        "Yellow" => Color::Yellow,
        "White" => Color::White,
        _ => Color::Reset,
    }
}

/// Async side effect attached to a choice, run after it is picked
pub type ChoiceAction = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// One entry of a select or multiselect list
#[derive(Clone)]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub hint: Option<String>,
    pub disabled: bool,
    action: Option<ChoiceAction>,
}

impl Choice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            hint: None,
            disabled: false,
            action: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.action = Some(Arc::new(move || action().boxed()));
        self
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Run the attached action, if any
    pub async fn run_action(&self) {
        if let Some(action) = &self.action {
            action().await;
        }
    }
}

impl fmt::Debug for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Choice")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("hint", &self.hint)
            .field("disabled", &self.disabled)
            .field("action", &self.action.is_some())
            .finish()
    }
}

/// Settings for one prompt run
#[derive(Clone, Default)]
pub struct PromptConfig {
    pub title: String,
    pub hint: Option<String>,
    pub placeholder: Option<String>,
    pub default_value: Option<Value>,
    pub schema: Option<Arc<dyn Schema>>,
    pub validate: Option<Validator>,
    /// Reject an empty answer. Unset means: required for typed input,
    /// optional for multiselect.
    pub required: Option<bool>,
    /// Let Left/Right move through list choices too
    pub horizontal: bool,
    pub style: StyleOptions,
}

impl PromptConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn horizontal(mut self) -> Self {
        self.horizontal = true;
        self
    }

    pub fn with_style(mut self, style: StyleOptions) -> Self {
        self.style = style;
        self
    }

    /// The default as the text a user would have typed for it
    pub fn default_text(&self) -> Option<String> {
        match self.default_value.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(true) => Some("y".to_string()),
            Value::Bool(false) => Some("n".to_string()),
            _ => None,
        }
    }
}

impl fmt::Debug for PromptConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptConfig")
            .field("title", &self.title)
            .field("hint", &self.hint)
            .field("placeholder", &self.placeholder)
            .field("default_value", &self.default_value)
            .field("schema", &self.schema.is_some())
            .field("validate", &self.validate)
            .field("required", &self.required)
            .field("horizontal", &self.horizontal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.mask_char, '*');
        assert_eq!(config.fallback_width, 80);
        assert_eq!(config.messages.invalid_number, "Please enter a valid number.");
    }

    #[test]
    fn test_color_conversion() {
        let style = StyleOptions::default();
        assert!(matches!(style.accent(), Color::Cyan));
        assert!(matches!(style.error(), Color::Red));
        assert!(matches!(color_by_name("Chartreuse"), Color::Reset));
    }

    #[test]
    fn test_partial_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "mask_char": "•", "messages": {{ "invalid_number": "Numbers only." }} }}"#
        )
        .unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mask_char, '•');
        assert_eq!(config.messages.invalid_number, "Numbers only.");
        assert_eq!(config.messages.required, Messages::default().required);
        assert_eq!(config.fallback_width, 80);
    }

    #[test]
    fn test_config_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            EngineConfig::from_file(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            EngineConfig::from_file(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_default_text() {
        assert_eq!(
            PromptConfig::new("t").with_default("./app").default_text(),
            Some("./app".to_string())
        );
        assert_eq!(PromptConfig::new("t").with_default(42).default_text(), Some("42".to_string()));
        assert_eq!(PromptConfig::new("t").with_default(true).default_text(), Some("y".to_string()));
        assert_eq!(PromptConfig::new("t").with_default(json!(["a"])).default_text(), None);
        assert_eq!(PromptConfig::new("t").default_text(), None);
    }

    #[tokio::test]
    async fn test_choice_action_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let choice = Choice::new("deploy", "Deploy").with_action(move || {
            let flag = flag.clone();
            async move { flag.store(true, Ordering::SeqCst) }
        });

        assert!(choice.has_action());
        choice.run_action().await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
