//! Prompt Session
//!
//! Runs one prompt end to end: decides the presentation mode, holds raw mode
//! for the duration, pumps keys into the controller and repaints after every
//! change. Validation races the input stream so Ctrl+C still cancels while an
//! async validator is pending.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use super::config::{Choice, EngineConfig, PromptConfig, StyleOptions};
use super::controller::{Controller, ControllerState, Reaction};
use super::error::PromptError;
use super::format::{Formatter, ThemeFormatter};
use super::keys::{KeyEvent, KeySource};
use super::line_edit::{EditMode, LineEditController};
use super::list_nav::ListNavController;
use super::render::LineBudgetRenderer;
use super::terminal::{RawModeGuard, TerminalControl, TerminalHandle};

/// How a prompt ended, when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Submitted(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Submitted(value) => Outcome::Submitted(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }

    pub fn submitted(self) -> Option<T> {
        match self {
            Outcome::Submitted(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }
}

/// Kind of prompt to run
#[derive(Debug, Clone)]
pub enum PromptMode {
    Text,
    Number,
    Password,
    Confirm,
    Select(Vec<Choice>),
    MultiSelect(Vec<Choice>),
}

impl PromptMode {
    pub fn name(&self) -> &'static str {
        match self {
            PromptMode::Text => "text",
            PromptMode::Number => "number",
            PromptMode::Password => "password",
            PromptMode::Confirm => "confirm",
            PromptMode::Select(_) => "select",
            PromptMode::MultiSelect(_) => "multiselect",
        }
    }

    /// List prompts have no line-based fallback
    pub fn needs_raw_input(&self) -> bool {
        matches!(self, PromptMode::Select(_) | PromptMode::MultiSelect(_))
    }
}

type Input = Box<dyn AsyncRead + Unpin + Send>;

/// Runs prompts one after another over a single terminal. Keys typed ahead
/// of a prompt stay queued for it.
pub struct PromptSession {
    keys: KeySource<Input>,
    output: Box<dyn Write + Send>,
    control: Arc<dyn TerminalControl>,
    engine: EngineConfig,
    formatter: Arc<dyn Formatter>,
    warned_non_tty: bool,
}

impl PromptSession {
    pub fn new(terminal: TerminalHandle, engine: EngineConfig) -> Self {
        let TerminalHandle {
            input,
            output,
            control,
        } = terminal;
        let escape_timeout = Duration::from_millis(engine.escape_timeout_ms);

        Self {
            keys: KeySource::new(input, escape_timeout),
            output,
            control,
            engine,
            formatter: Arc::new(ThemeFormatter),
            warned_non_tty: false,
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Run one prompt to completion.
    ///
    /// Resolves exactly once, with the validated answer or `Cancelled`.
    /// Raw mode is released before this returns, whatever the exit path.
    pub async fn run(
        &mut self,
        config: &PromptConfig,
        mode: PromptMode,
    ) -> Result<Outcome<Value>, PromptError> {
        let name = mode.name();
        let needs_raw = mode.needs_raw_input();
        let tty = self.control.is_tty();
        debug!(mode = name, tty, title = %config.title, "starting prompt");

        let mut controller: Box<dyn Controller> = match mode {
            PromptMode::Select(choices) => {
                Box::new(ListNavController::new(config, choices, false, &self.engine)?)
            }
            PromptMode::MultiSelect(choices) => {
                Box::new(ListNavController::new(config, choices, true, &self.engine)?)
            }
            PromptMode::Text => self.line_controller(config, EditMode::PlainText, tty),
            PromptMode::Number => self.line_controller(config, EditMode::Numeric, tty),
            PromptMode::Password => self.line_controller(config, EditMode::Masked, tty),
            PromptMode::Confirm => self.line_controller(config, EditMode::YesNo, tty),
        };

        let outcome = if tty {
            self.run_interactive(controller.as_mut(), &config.style).await?
        } else if needs_raw {
            return Err(PromptError::UnsupportedTerminal { mode: name });
        } else {
            self.warn_non_tty()?;
            self.run_plain(controller.as_mut(), &config.style).await?
        };

        match &outcome {
            Outcome::Submitted(_) => info!(mode = name, "prompt submitted"),
            Outcome::Cancelled => info!(mode = name, "prompt cancelled"),
        }
        Ok(outcome)
    }

    fn line_controller(&self, config: &PromptConfig, mode: EditMode, tty: bool) -> Box<dyn Controller> {
        let controller = LineEditController::new(config, mode, &self.engine);
        if tty {
            Box::new(controller)
        } else {
            Box::new(controller.line_mode())
        }
    }

    fn warn_non_tty(&mut self) -> Result<(), PromptError> {
        if self.warned_non_tty {
            return Ok(());
        }
        self.warned_non_tty = true;
        warn!("input is not a terminal, falling back to line input");
        writeln!(self.output, "{}", self.engine.messages.non_tty_warning)?;
        self.output.flush()?;
        Ok(())
    }

    async fn run_interactive(
        &mut self,
        controller: &mut dyn Controller,
        style: &StyleOptions,
    ) -> Result<Outcome<Value>, PromptError> {
        let Self {
            keys,
            output,
            control,
            engine,
            formatter,
            ..
        } = self;
        let _guard = RawModeGuard::acquire(control.clone())?;

        let mut painter = Painter {
            renderer: LineBudgetRenderer::new(&mut **output, engine.fallback_width)
                .raw_line_endings(true),
            control: control.as_ref(),
            fallback_width: engine.fallback_width,
            formatter: formatter.as_ref(),
            style,
        };

        painter.paint(controller)?;
        loop {
            // Running out of input counts as an abort
            let key = keys.next_key().await?.unwrap_or(KeyEvent::CtrlD);

            match controller.handle_key(&key) {
                Reaction::Ignored => {}
                Reaction::Redraw => painter.paint(controller)?,
                Reaction::Cancel => {
                    painter.renderer.clear()?;
                    return Ok(Outcome::Cancelled);
                }
                Reaction::Submit => {
                    painter.paint(controller)?;

                    // An abort already queued behind Enter wins over validation
                    let aborted = if keys.take_queued_abort() {
                        true
                    } else {
                        tokio::select! {
                            biased;
                            _ = controller.submit() => false,
                            watched = keys.watch_for_abort() => {
                                watched?;
                                true
                            }
                        }
                    };

                    if aborted {
                        debug!("aborted while validating");
                        controller.handle_key(&KeyEvent::CtrlC);
                        painter.renderer.clear()?;
                        return Ok(Outcome::Cancelled);
                    }

                    painter.paint(controller)?;
                    if let ControllerState::Submitted(value) = controller.state() {
                        let value = value.clone();
                        painter.renderer.commit()?;
                        return Ok(Outcome::Submitted(value));
                    }
                }
            }
        }
    }

    /// Line-by-line fallback: no in-place redraws, each frame is printed once
    /// and left on screen
    async fn run_plain(
        &mut self,
        controller: &mut dyn Controller,
        style: &StyleOptions,
    ) -> Result<Outcome<Value>, PromptError> {
        let Self {
            keys,
            output,
            engine,
            formatter,
            ..
        } = self;
        let mut renderer = LineBudgetRenderer::new(&mut **output, engine.fallback_width);

        renderer.render(&formatter.format(&controller.frame(), style))?;
        renderer.commit()?;
        loop {
            let key = keys.next_key().await?.unwrap_or(KeyEvent::CtrlD);

            match controller.handle_key(&key) {
                Reaction::Ignored | Reaction::Redraw => {}
                Reaction::Cancel => return Ok(Outcome::Cancelled),
                Reaction::Submit => {
                    controller.submit().await;
                    renderer.render(&formatter.format(&controller.frame(), style))?;
                    renderer.commit()?;
                    if let ControllerState::Submitted(value) = controller.state() {
                        return Ok(Outcome::Submitted(value.clone()));
                    }
                }
            }
        }
    }
}

/// Erase-and-redraw of the current controller frame
struct Painter<'a, W: Write> {
    renderer: LineBudgetRenderer<W>,
    control: &'a dyn TerminalControl,
    fallback_width: usize,
    formatter: &'a dyn Formatter,
    style: &'a StyleOptions,
}

impl<W: Write> Painter<'_, W> {
    fn paint(&mut self, controller: &dyn Controller) -> std::io::Result<()> {
        let width = self.control.width().unwrap_or(self.fallback_width);
        self.renderer.set_width(width);
        let text = self.formatter.format(&controller.frame(), self.style);
        self.renderer.redraw(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::render::strip_ansi;
    use crate::cli::validate::Validator;
    use serde_json::json;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::io::AsyncWriteExt;

    #[derive(Default)]
    struct FakeControl {
        tty: bool,
        raw: AtomicBool,
        entered_raw: AtomicBool,
    }

    impl FakeControl {
        fn tty() -> Arc<Self> {
            Arc::new(Self {
                tty: true,
                ..Self::default()
            })
        }

        fn piped() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    impl TerminalControl for FakeControl {
        fn is_tty(&self) -> bool {
            self.tty
        }

        fn width(&self) -> Option<usize> {
            Some(80)
        }

        fn enable_raw_mode(&self) -> io::Result<()> {
            self.raw.store(true, Ordering::SeqCst);
            self.entered_raw.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn disable_raw_mode(&self) -> io::Result<()> {
            self.raw.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn set_cursor_visible(&self, _visible: bool) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct SharedOutput(Arc<Mutex<Vec<u8>>>);

    impl SharedOutput {
        fn text(&self) -> String {
            let bytes = self.0.lock().unwrap().clone();
            strip_ansi(&String::from_utf8_lossy(&bytes)).into_owned()
        }
    }

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session(input: &[u8], control: Arc<FakeControl>) -> (PromptSession, SharedOutput) {
        let output = SharedOutput::default();
        let terminal = TerminalHandle::new(
            std::io::Cursor::new(input.to_vec()),
            output.clone(),
            control,
        );
        (PromptSession::new(terminal, EngineConfig::default()), output)
    }

    fn templates() -> Vec<Choice> {
        vec![
            Choice::new("bare", "Bare"),
            Choice::new("router", "With router"),
            Choice::new("tailwind", "With Tailwind"),
            Choice::new("ssr", "SSR"),
        ]
    }

    #[tokio::test]
    async fn test_text_default_on_enter() {
        let control = FakeControl::tty();
        let (mut session, output) = session(b"\r", control.clone());
        let config = PromptConfig::new("Project path").with_default("./sparkling-solid");

        let outcome = session.run(&config, PromptMode::Text).await.unwrap();
        assert_eq!(outcome, Outcome::Submitted(json!("./sparkling-solid")));
        assert!(output.text().contains("✔ Project path ./sparkling-solid"));
        assert!(control.entered_raw.load(Ordering::SeqCst));
        assert!(!control.raw.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_number_retry_after_error() {
        let (mut session, output) = session(b"abc\r\x7f\x7f\x7f42\r", FakeControl::tty());
        let outcome = session
            .run(&PromptConfig::new("Port"), PromptMode::Number)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Submitted(json!(42)));
        assert!(output.text().contains("✖ Please enter a valid number."));
    }

    #[tokio::test]
    async fn test_select_digit_submits() {
        let (mut session, output) = session(b"3", FakeControl::tty());
        let outcome = session
            .run(&PromptConfig::new("Template"), PromptMode::Select(templates()))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Submitted(json!("tailwind")));
        assert!(output.text().contains("✔ Template With Tailwind"));
    }

    #[tokio::test]
    async fn test_multiselect_in_list_order() {
        let (mut session, _) = session(b"\x1b[B \x1b[B \r", FakeControl::tty());
        let outcome = session
            .run(&PromptConfig::new("Features"), PromptMode::MultiSelect(templates()))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Submitted(json!(["router", "tailwind"])));
    }

    #[tokio::test]
    async fn test_ctrl_c_cancels_and_restores() {
        let control = FakeControl::tty();
        let (mut session, _) = session(b"par\x03", control.clone());
        let outcome = session
            .run(&PromptConfig::new("Project path"), PromptMode::Text)
            .await
            .unwrap();

        assert!(outcome.is_cancelled());
        assert!(!control.raw.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_end_of_input_cancels() {
        let (mut session, _) = session(b"y", FakeControl::tty());
        let outcome = session
            .run(&PromptConfig::new("Install?"), PromptMode::Confirm)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
    }

    #[tokio::test]
    async fn test_raw_output_uses_crlf() {
        let (mut session, output) = session(b"\r", FakeControl::tty());
        let config = PromptConfig::new("Template").with_default("ssr");
        session.run(&config, PromptMode::Select(templates())).await.unwrap();

        let bytes = output.0.lock().unwrap().clone();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("\r\n"));
        assert!(!text.replace("\r\n", "").contains('\n'));
    }

    #[tokio::test]
    async fn test_list_without_tty_is_unsupported() {
        let control = FakeControl::piped();
        let (mut session, _) = session(b"1\n", control.clone());
        let result = session
            .run(&PromptConfig::new("Template"), PromptMode::Select(templates()))
            .await;

        assert!(matches!(
            result,
            Err(PromptError::UnsupportedTerminal { mode: "select" })
        ));
        assert!(!control.entered_raw.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_choice_list_is_malformed() {
        let (mut session, _) = session(b"\r", FakeControl::tty());
        let result = session
            .run(&PromptConfig::new("Features"), PromptMode::MultiSelect(Vec::new()))
            .await;
        assert!(matches!(result, Err(PromptError::MalformedChoiceList { .. })));
    }

    #[tokio::test]
    async fn test_plain_fallback_reads_lines() {
        let control = FakeControl::piped();
        let (mut session, output) = session(b"abc\n42\n", control.clone());
        let outcome = session
            .run(&PromptConfig::new("Port"), PromptMode::Number)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Submitted(json!(42)));
        assert!(!control.entered_raw.load(Ordering::SeqCst));

        let text = output.text();
        assert!(text.starts_with(&EngineConfig::default().messages.non_tty_warning));
        assert!(text.contains("✖ Please enter a valid number."));
        assert!(text.contains("✔ Port 42"));
    }

    #[tokio::test]
    async fn test_non_tty_warning_is_shown_once() {
        let (mut session, output) = session(b"a\nb\n", FakeControl::piped());
        let first = session.run(&PromptConfig::new("First"), PromptMode::Text).await.unwrap();
        let second = session.run(&PromptConfig::new("Second"), PromptMode::Text).await.unwrap();
        assert_eq!(first, Outcome::Submitted(json!("a")));
        assert_eq!(second, Outcome::Submitted(json!("b")));

        let warning = EngineConfig::default().messages.non_tty_warning;
        assert_eq!(output.text().matches(warning.as_str()).count(), 1);
    }

    #[tokio::test]
    async fn test_ctrl_c_during_slow_validation() {
        let control = FakeControl::tty();
        let (mut writer, reader) = tokio::io::duplex(64);
        let output = SharedOutput::default();
        let terminal = TerminalHandle::new(reader, output, control.clone());
        let mut session = PromptSession::new(terminal, EngineConfig::default());

        let validator = Validator::new(|_value: Value| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            true
        });
        let config = PromptConfig::new("Project path").with_validator(validator);

        let typing = tokio::spawn(async move {
            writer.write_all(b"app\r").await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            writer.write_all(b"\x03").await.unwrap();
            writer
        });

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            session.run(&config, PromptMode::Text),
        )
        .await
        .expect("validation was not interrupted")
        .unwrap();

        assert_eq!(outcome, Outcome::Cancelled);
        assert!(!control.raw.load(Ordering::SeqCst));
        drop(typing.await.unwrap());
    }

    #[tokio::test]
    async fn test_queued_ctrl_c_cancels_before_slow_validation() {
        let control = FakeControl::tty();
        let (mut session, _) = session(b"app\r\x03next\r", control.clone());
        let validator = Validator::new(|_value: Value| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            true
        });
        let config = PromptConfig::new("Project path").with_validator(validator);

        let first = session.run(&config, PromptMode::Text).await.unwrap();
        assert_eq!(first, Outcome::Cancelled);
        assert!(!control.raw.load(Ordering::SeqCst));

        // The consumed Ctrl+C does not leak into the next prompt
        let second = session
            .run(&PromptConfig::new("Name"), PromptMode::Text)
            .await
            .unwrap();
        assert_eq!(second, Outcome::Submitted(json!("next")));
    }

    #[tokio::test]
    async fn test_custom_formatter() {
        struct Bare;
        impl Formatter for Bare {
            fn format(&self, frame: &crate::cli::format::Frame, _style: &StyleOptions) -> String {
                format!("[{}] {}", frame.title, frame.content.clone().unwrap_or_default())
            }
        }

        let (session, output) = session(b"hi\r", FakeControl::tty());
        let mut session = session.with_formatter(Arc::new(Bare));
        session.run(&PromptConfig::new("Name"), PromptMode::Text).await.unwrap();
        assert!(output.text().contains("[Name] hi"));
    }
}
