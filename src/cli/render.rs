//! Line Budget Renderer
//!
//! Draws a prompt block and remembers how many terminal rows it took, so the
//! next draw can erase exactly those rows first. Rows are counted after
//! soft-wrapping at the terminal width, with wide glyphs taking two columns
//! and ANSI styling taking none.

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::OnceLock;

use crossterm::{
    cursor, queue,
    terminal::{Clear, ClearType},
};
use regex::Regex;
use tracing::debug;
use unicode_width::UnicodeWidthChar;

fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // CSI, OSC (BEL or ST terminated), then two-byte Fe escapes
        Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-_])")
            .expect("ANSI escape pattern is valid")
    })
}

/// Remove ANSI escape sequences so they don't count toward width
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }
    ansi_pattern().replace_all(text, "")
}

/// Display width in terminal columns of a single line
pub fn display_width(text: &str) -> usize {
    strip_ansi(text)
        .chars()
        .map(|ch| ch.width().unwrap_or(0))
        .sum()
}

/// Number of terminal rows `text` occupies once wrapped at `width` columns.
///
/// Every `\n`-separated line takes at least one row, so a trailing newline
/// adds a row. The empty string takes none.
pub fn visual_line_count(text: &str, width: usize) -> usize {
    if text.is_empty() {
        return 0;
    }
    let width = width.max(1);
    strip_ansi(text)
        .split('\n')
        .map(|line| wrapped_rows(line, width))
        .sum()
}

fn wrapped_rows(line: &str, width: usize) -> usize {
    let mut rows = 1;
    let mut column = 0;

    for ch in line.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if ch_width == 0 {
            continue;
        }
        // A wide glyph that doesn't fit moves whole to the next row
        if column > 0 && column + ch_width > width {
            rows += 1;
            column = 0;
        }
        column += ch_width;
    }

    rows
}

/// Erase-then-redraw renderer over any output sink
pub struct LineBudgetRenderer<W: Write> {
    out: W,
    width: usize,
    last_lines: usize,
    line_ending: &'static str,
}

impl<W: Write> LineBudgetRenderer<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: width.max(1),
            last_lines: 0,
            line_ending: "\n",
        }
    }

    /// Raw mode turns off output post-processing, so `\n` needs an explicit `\r`
    pub fn raw_line_endings(mut self, raw: bool) -> Self {
        self.line_ending = if raw { "\r\n" } else { "\n" };
        self
    }

    pub fn set_width(&mut self, width: usize) {
        self.width = width.max(1);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows occupied by the most recent render that is still on screen
    pub fn last_line_count(&self) -> usize {
        self.last_lines
    }

    /// Write `text` and record its row count as the next erase budget
    pub fn render(&mut self, text: &str) -> io::Result<()> {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.out.write_all(self.line_ending.as_bytes())?;
            }
            self.out.write_all(line.as_bytes())?;
        }
        self.out.flush()?;
        self.last_lines = visual_line_count(text, self.width);
        Ok(())
    }

    /// Clear the `n` rows ending at the cursor row and park the cursor at
    /// column 0 of the topmost one
    pub fn erase_last(&mut self, n: usize) -> io::Result<()> {
        if n == 0 {
            debug!("erase_last called with an empty budget");
            return Ok(());
        }

        for row in 0..n {
            queue!(self.out, Clear(ClearType::CurrentLine))?;
            if row + 1 < n {
                queue!(self.out, cursor::MoveUp(1))?;
            }
        }
        queue!(self.out, cursor::MoveToColumn(0))?;
        self.out.flush()?;

        self.last_lines = self.last_lines.saturating_sub(n);
        Ok(())
    }

    /// Erase whatever the last render left on screen
    pub fn clear(&mut self) -> io::Result<()> {
        let n = self.last_lines;
        if n > 0 {
            self.erase_last(n)?;
        }
        Ok(())
    }

    pub fn redraw(&mut self, text: &str) -> io::Result<()> {
        self.clear()?;
        self.render(text)
    }

    /// Keep the last block on screen and move below it
    pub fn commit(&mut self) -> io::Result<()> {
        self.out.write_all(self.line_ending.as_bytes())?;
        self.out.flush()?;
        self.last_lines = 0;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
