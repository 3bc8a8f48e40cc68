//! Prompter - Demo Entry Point
//!
//! Walks through a project-setup flow using every prompt kind. Pass a prompt
//! kind (`text`, `number`, `password`, `confirm`, `select`, `multiselect`) as
//! the first argument to run just that one.

use std::env;
use std::process;

use prompter::cli::ConfigError;
use prompter::{Choice, Outcome, PromptConfig, PromptError, Prompter, Validator};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum DemoError {
    Config(ConfigError),
    Prompt(PromptError),
    Cancelled,
    UnknownKind(String),
}

impl From<ConfigError> for DemoError {
    fn from(e: ConfigError) -> Self {
        DemoError::Config(e)
    }
}

impl From<PromptError> for DemoError {
    fn from(e: PromptError) -> Self {
        DemoError::Prompt(e)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let kind = env::args().nth(1);

    // Exit explicitly: a pending stdin read would otherwise hold the runtime open
    match run_demo(kind.as_deref()).await {
        Ok(()) => process::exit(0),
        Err(DemoError::Cancelled) => {
            eprintln!("Operation cancelled.");
            process::exit(1);
        }
        Err(DemoError::UnknownKind(kind)) => {
            eprintln!("ERROR: unknown prompt kind '{}'", kind);
            eprintln!("Expected one of: text, number, password, confirm, select, multiselect");
            process::exit(2);
        }
        Err(DemoError::Config(e)) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
        Err(DemoError::Prompt(e)) => {
            eprintln!("ERROR: {}", e);
            eprintln!("Please check your terminal compatibility and try again.");
            process::exit(1);
        }
    }
}

/// Unwrap an answer, turning a cancel into an early return
fn answered<T>(outcome: Outcome<T>) -> Result<T, DemoError> {
    outcome.submitted().ok_or(DemoError::Cancelled)
}

async fn run_demo(kind: Option<&str>) -> Result<(), DemoError> {
    let mut prompter = Prompter::stdio()?;

    match kind {
        None => run_setup_flow(&mut prompter).await,
        Some("text") => {
            let path = answered(prompter.text(&path_prompt()).await?)?;
            println!("{}", path);
            Ok(())
        }
        Some("number") => {
            let port = answered(prompter.number(&port_prompt()).await?)?;
            println!("{}", port.map_or_else(String::new, |p| p.to_string()));
            Ok(())
        }
        Some("password") => {
            let token = answered(prompter.password(&token_prompt()).await?)?;
            println!("{} characters", token.chars().count());
            Ok(())
        }
        Some("confirm") => {
            let install = answered(prompter.confirm(&install_prompt()).await?)?;
            println!("{}", install);
            Ok(())
        }
        Some("select") => {
            let template = answered(prompter.select(&PromptConfig::new("Which template?"), templates()).await?)?;
            println!("{}", template);
            Ok(())
        }
        Some("multiselect") => {
            let features =
                answered(prompter.multiselect(&PromptConfig::new("Which features?"), features()).await?)?;
            println!("{}", features.join(", "));
            Ok(())
        }
        Some(other) => Err(DemoError::UnknownKind(other.to_string())),
    }
}

async fn run_setup_flow(prompter: &mut Prompter) -> Result<(), DemoError> {
    let path = answered(prompter.text(&path_prompt()).await?)?;

    let template = answered(
        prompter
            .select(
                &PromptConfig::new("Which template would you like to use?").with_default("bare"),
                templates(),
            )
            .await?,
    )?;

    let features = answered(
        prompter
            .multiselect(
                &PromptConfig::new("Which features should be included?")
                    .with_default(serde_json::json!(["typescript"])),
                features(),
            )
            .await?,
    )?;

    let port = answered(prompter.number(&port_prompt()).await?)?;
    let install = answered(prompter.confirm(&install_prompt()).await?)?;
    let token = answered(prompter.password(&token_prompt()).await?)?;

    println!();
    println!("Project:  {}", path);
    println!("Template: {}", template);
    println!("Features: {}", if features.is_empty() { "none".to_string() } else { features.join(", ") });
    if let Some(port) = port {
        println!("Port:     {}", port);
    }
    println!("Install:  {}", if install { "yes" } else { "no" });
    println!("Token:    {}", if token.is_empty() { "not set" } else { "set" });
    Ok(())
}

fn path_prompt() -> PromptConfig {
    PromptConfig::new("Where should we create your project?")
        .with_default("./sparkling-solid")
        .with_schema(|value: &Value| match value.as_str() {
            Some(path) if path.trim().is_empty() => vec!["Path cannot be blank.".to_string()],
            _ => Vec::new(),
        })
}

fn port_prompt() -> PromptConfig {
    let in_range = Validator::sync(|value: &Value| match value.as_f64() {
        Some(port) if port.fract() == 0.0 && (1.0..=65535.0).contains(&port) => Ok(()),
        Some(_) => Err("Port must be a whole number between 1 and 65535.".to_string()),
        None => Ok(()),
    });
    PromptConfig::new("Dev server port")
        .with_placeholder("3000")
        .required(false)
        .with_validator(in_range)
}

fn install_prompt() -> PromptConfig {
    PromptConfig::new("Install dependencies now?").with_default(true)
}

fn token_prompt() -> PromptConfig {
    PromptConfig::new("Deploy token")
        .with_hint("(leave empty to skip)")
        .required(false)
}

fn templates() -> Vec<Choice> {
    vec![
        Choice::new("bare", "Bare").with_hint("minimal starter"),
        Choice::new("router", "With router"),
        Choice::new("tailwind", "With Tailwind CSS"),
        Choice::new("ssr", "Server-side rendering").disabled(),
    ]
}

fn features() -> Vec<Choice> {
    vec![
        Choice::new("typescript", "TypeScript"),
        Choice::new("eslint", "ESLint"),
        Choice::new("prettier", "Prettier"),
        Choice::new("vitest", "Vitest").with_hint("unit tests"),
    ]
}
