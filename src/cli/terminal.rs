//! Terminal control seam.
//!
//! Everything the session needs from the real terminal sits behind
//! `TerminalControl`, so sessions can run against in-memory streams in tests.
//! `RawModeGuard` ties raw mode and the hidden cursor to a scope.

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{self, disable_raw_mode, enable_raw_mode},
    tty::IsTty,
};
use tokio::io::AsyncRead;
use tracing::{debug, warn};

pub trait TerminalControl: Send + Sync {
    /// Whether both ends are attached to an interactive terminal
    fn is_tty(&self) -> bool;

    /// Current width in columns, if it can be queried
    fn width(&self) -> Option<usize>;

    fn enable_raw_mode(&self) -> io::Result<()>;

    fn disable_raw_mode(&self) -> io::Result<()>;

    fn set_cursor_visible(&self, visible: bool) -> io::Result<()>;
}

/// The process terminal, driven through crossterm
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosstermControl;

impl TerminalControl for CrosstermControl {
    fn is_tty(&self) -> bool {
        io::stdin().is_tty() && io::stdout().is_tty()
    }

    fn width(&self) -> Option<usize> {
        match terminal::size() {
            Ok((0, _)) | Err(_) => None,
            Ok((columns, _)) => Some(usize::from(columns)),
        }
    }

    fn enable_raw_mode(&self) -> io::Result<()> {
        enable_raw_mode()
    }

    fn disable_raw_mode(&self) -> io::Result<()> {
        disable_raw_mode()
    }

    fn set_cursor_visible(&self, visible: bool) -> io::Result<()> {
        let mut stdout = io::stdout();
        if visible {
            execute!(stdout, Show)
        } else {
            execute!(stdout, Hide)
        }
    }
}

/// Input stream, output sink and control handle of one terminal
pub struct TerminalHandle {
    pub input: Box<dyn AsyncRead + Unpin + Send>,
    pub output: Box<dyn Write + Send>,
    pub control: Arc<dyn TerminalControl>,
}

impl TerminalHandle {
    pub fn new(
        input: impl AsyncRead + Unpin + Send + 'static,
        output: impl Write + Send + 'static,
        control: Arc<dyn TerminalControl>,
    ) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            control,
        }
    }

    /// Process stdin and stdout
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), io::stdout(), Arc::new(CrosstermControl))
    }
}

/// Raw mode with a hidden cursor for as long as the guard lives.
/// Restoration runs on every exit path, including unwinding.
pub struct RawModeGuard {
    control: Arc<dyn TerminalControl>,
}

impl RawModeGuard {
    pub fn acquire(control: Arc<dyn TerminalControl>) -> io::Result<Self> {
        control.enable_raw_mode()?;
        let guard = Self { control };
        guard.control.set_cursor_visible(false)?;
        debug!("raw mode enabled");
        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = self.control.set_cursor_visible(true) {
            warn!(error = %e, "failed to show cursor");
        }
        if let Err(e) = self.control.disable_raw_mode() {
            warn!(error = %e, "failed to leave raw mode");
        }
        debug!("raw mode disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct Flags {
        raw: AtomicBool,
        hidden: AtomicBool,
    }

    impl TerminalControl for Flags {
        fn is_tty(&self) -> bool {
            true
        }

        fn width(&self) -> Option<usize> {
            Some(40)
        }

        fn enable_raw_mode(&self) -> io::Result<()> {
            self.raw.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn disable_raw_mode(&self) -> io::Result<()> {
            self.raw.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn set_cursor_visible(&self, visible: bool) -> io::Result<()> {
            self.hidden.store(!visible, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let flags = Arc::new(Flags::default());
        {
            let _guard = RawModeGuard::acquire(flags.clone()).unwrap();
            assert!(flags.raw.load(Ordering::SeqCst));
            assert!(flags.hidden.load(Ordering::SeqCst));
        }
        assert!(!flags.raw.load(Ordering::SeqCst));
        assert!(!flags.hidden.load(Ordering::SeqCst));
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let flags = Arc::new(Flags::default());
        let inner = flags.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = RawModeGuard::acquire(inner).unwrap();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!flags.raw.load(Ordering::SeqCst));
    }
}
