//! Key Decoding Module
//!
//! Turns the raw byte stream read from the terminal into logical key events.
//! `KeyDecoder` is a pure byte-level state machine; `KeySource` owns the
//! reader, feeds the decoder and hands out keys in arrival order.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

const ESC: u8 = 0x1B;
const READ_CHUNK: usize = 1024;

/// A logical key press produced from one physical keystroke
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Space,
    Digit(u8),
    CtrlC,
    CtrlD,
    Other(Vec<u8>),
}

impl KeyEvent {
    /// True for the two keys that abort a prompt
    pub fn is_abort(&self) -> bool {
        matches!(self, KeyEvent::CtrlC | KeyEvent::CtrlD)
    }

    /// The character this key inserts into a line buffer, if any
    pub fn as_char(&self) -> Option<char> {
        match self {
            KeyEvent::Char(ch) => Some(*ch),
            KeyEvent::Space => Some(' '),
            KeyEvent::Digit(n) => char::from_digit(u32::from(*n), 10),
            _ => None,
        }
    }
}

enum Decoded {
    Key(KeyEvent, usize),
    Incomplete,
}

/// Incremental decoder from raw input bytes to key events
#[derive(Debug, Default)]
pub struct KeyDecoder {
    buf: Vec<u8>,
    after_cr: bool,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes and return every key completed by it.
    /// Trailing bytes of an unfinished sequence are kept for the next chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<KeyEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            match decode_one(&self.buf[pos..]) {
                Decoded::Key(key, used) => {
                    let first = self.buf[pos];
                    pos += used;

                    // "\r\n" from a cooked line counts as one Enter
                    if first == b'\n' && self.after_cr {
                        self.after_cr = false;
                        continue;
                    }
                    self.after_cr = first == b'\r';
                    events.push(key);
                }
                Decoded::Incomplete => break,
            }
        }

        self.buf.drain(..pos);
        events
    }

    /// Check if an unfinished sequence is waiting for more bytes
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Give up on an unfinished sequence (escape timeout or end of input)
    pub fn flush(&mut self) -> Vec<KeyEvent> {
        if self.buf.is_empty() {
            return Vec::new();
        }
        self.after_cr = false;
        vec![KeyEvent::Other(std::mem::take(&mut self.buf))]
    }

    /// Decode a complete byte script in one go
    pub fn decode_all(bytes: &[u8]) -> Vec<KeyEvent> {
        let mut decoder = Self::new();
        let mut events = decoder.feed(bytes);
        events.extend(decoder.flush());
        events
    }
}

fn decode_one(bytes: &[u8]) -> Decoded {
    let first = bytes[0];
    let key = match first {
        0x03 => KeyEvent::CtrlC,
        0x04 => KeyEvent::CtrlD,
        b'\r' | b'\n' => KeyEvent::Enter,
        0x08 | 0x7F => KeyEvent::Backspace,
        b' ' => KeyEvent::Space,
        b'0'..=b'9' => KeyEvent::Digit(first - b'0'),
        ESC => return decode_escape(bytes),
        0x21..=0x7E => KeyEvent::Char(char::from(first)),
        0x80..=0xFF => return decode_utf8(bytes),
        _ => KeyEvent::Other(vec![first]),
    };
    Decoded::Key(key, 1)
}

fn decode_escape(bytes: &[u8]) -> Decoded {
    let Some(&intro) = bytes.get(1) else {
        return Decoded::Incomplete;
    };

    match intro {
        b'[' => decode_csi(bytes),
        // SS3 arrows, sent in application cursor mode
        b'O' => match bytes.get(2) {
            None => Decoded::Incomplete,
            Some(&last) => {
                let key = arrow(last).unwrap_or_else(|| KeyEvent::Other(bytes[..3].to_vec()));
                Decoded::Key(key, 3)
            }
        },
        _ => Decoded::Key(KeyEvent::Other(bytes[..2].to_vec()), 2),
    }
}

/// CSI: parameter bytes 0x30-0x3F, intermediate bytes 0x20-0x2F, final byte 0x40-0x7E
fn decode_csi(bytes: &[u8]) -> Decoded {
    let mut i = 2;
    while i < bytes.len() {
        let b = bytes[i];
        if (0x40..=0x7E).contains(&b) {
            let params = &bytes[2..i];
            let key = match (params, b) {
                (b"3", b'~') => KeyEvent::Delete,
                (_, b'A'..=b'D') => arrow(b).unwrap_or(KeyEvent::Other(bytes[..=i].to_vec())),
                _ => KeyEvent::Other(bytes[..=i].to_vec()),
            };
            return Decoded::Key(key, i + 1);
        }
        if !(0x20..=0x3F).contains(&b) {
            return Decoded::Key(KeyEvent::Other(bytes[..i].to_vec()), i);
        }
        i += 1;
    }
    Decoded::Incomplete
}

fn arrow(last: u8) -> Option<KeyEvent> {
    match last {
        b'A' => Some(KeyEvent::Up),
        b'B' => Some(KeyEvent::Down),
        b'C' => Some(KeyEvent::Right),
        b'D' => Some(KeyEvent::Left),
        _ => None,
    }
}

fn decode_utf8(bytes: &[u8]) -> Decoded {
    let invalid = || Decoded::Key(KeyEvent::Other(vec![bytes[0]]), 1);
    let len = match bytes[0] {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return invalid(),
    };

    if bytes.len() < len {
        return if bytes[1..].iter().all(|b| b & 0xC0 == 0x80) {
            Decoded::Incomplete
        } else {
            invalid()
        };
    }

    match std::str::from_utf8(&bytes[..len]) {
        Ok(s) => match s.chars().next() {
            Some(ch) => Decoded::Key(KeyEvent::Char(ch), len),
            None => invalid(),
        },
        Err(_) => invalid(),
    }
}

/// Lazily reads the input stream and yields keys in arrival order.
/// A session keeps one source across prompts, so typeahead carries over.
pub struct KeySource<R> {
    reader: R,
    decoder: KeyDecoder,
    pending: VecDeque<KeyEvent>,
    chunk: Vec<u8>,
    escape_timeout: Duration,
    eof: bool,
}

impl<R: AsyncRead + Unpin> KeySource<R> {
    pub fn new(reader: R, escape_timeout: Duration) -> Self {
        Self {
            reader,
            decoder: KeyDecoder::new(),
            pending: VecDeque::new(),
            chunk: vec![0; READ_CHUNK],
            escape_timeout,
            eof: false,
        }
    }

    /// Wait for the next key. Returns `None` once input is exhausted.
    pub async fn next_key(&mut self) -> io::Result<Option<KeyEvent>> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                return Ok(Some(key));
            }

            if self.eof {
                let rest = self.decoder.flush();
                if rest.is_empty() {
                    return Ok(None);
                }
                self.pending.extend(rest);
                continue;
            }

            if self.decoder.has_pending() {
                // A lone ESC only becomes a key once nothing follows it quickly
                match tokio::time::timeout(self.escape_timeout, self.read_chunk()).await {
                    Ok(read) => {
                        read?;
                    }
                    Err(_) => {
                        let flushed = self.decoder.flush();
                        self.pending.extend(flushed);
                    }
                }
            } else {
                self.read_chunk().await?;
            }
        }
    }

    /// Remove the first queued abort key, if any. Keys around it stay queued.
    pub fn take_queued_abort(&mut self) -> bool {
        match self.pending.iter().position(KeyEvent::is_abort) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Keep reading while something else is in flight and resolve as soon as
    /// an abort key is queued, including one read before the call. The abort
    /// key is consumed; other keys stay queued for `next_key`. Never resolves
    /// once input is exhausted.
    pub async fn watch_for_abort(&mut self) -> io::Result<()> {
        loop {
            if self.take_queued_abort() {
                return Ok(());
            }
            if self.eof {
                return std::future::pending().await;
            }
            self.read_chunk().await?;
        }
    }

    async fn read_chunk(&mut self) -> io::Result<usize> {
        let n = self.reader.read(&mut self.chunk).await?;
        if n == 0 {
            trace!("input exhausted");
            self.eof = true;
            return Ok(0);
        }
        let keys = self.decoder.feed(&self.chunk[..n]);
        trace!(bytes = n, keys = keys.len(), "decoded input chunk");
        self.pending.extend(keys);
        Ok(n)
    }
}
