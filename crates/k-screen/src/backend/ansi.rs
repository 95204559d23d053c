// SPDX-License-Identifier: MIT
//
// ANSI terminal backend.
//
// Raw mode and the alternate screen come from `k_term::terminal`; output
// goes through one `OutputBuffer` per frame, written by a `GlyphWriter`
// that skips escapes the terminal state already satisfies. Each flush is
// wrapped in synchronized-output markers so a frame appears at once.
//
// Input arrives from the background stdin reader as byte chunks. Bytes are
// parsed as they come; a lone ESC is held until no further byte arrives
// within the escape timeout, then reported as the Escape key. SIGWINCH
// sets a flag that the next read turns into `RawEvent::Resize`.

use std::collections::VecDeque;
use std::env;
use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use k_term::ansi::{self, MouseMode};
use k_term::glyph::Glyph;
use k_term::input::{Event, Parser};
use k_term::output::{GlyphWriter, OutputBuffer};
use k_term::reader::StdinReader;
use k_term::terminal::{self, Size, Terminal};
use tracing::debug;

use super::{Backend, RawEvent};

/// How long a lone ESC waits for the rest of a sequence.
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(25);

/// Longest single wait on the input channel, so resizes are noticed while
/// blocked.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct AnsiBackend {
    terminal: Terminal,
    out: OutputBuffer,
    writer: GlyphWriter,
    reader: Option<(StdinReader, Receiver<Vec<u8>>)>,
    parser: Parser,
    /// When the parser started holding an incomplete sequence.
    pending_since: Option<Instant>,
    events: VecDeque<Event>,
    /// Logical size; follows the terminal unless set by `resize`.
    size: Size,
    colors: u16,
    pairs: u16,
    /// A frame is open: begin-sync has been written.
    in_frame: bool,
    escape_timeout: Duration,
}

impl AnsiBackend {
    /// A backend for the controlling terminal. Color support is guessed
    /// from `COLORTERM` and `TERM`.
    #[must_use]
    pub fn new() -> Self {
        let colors = detect_colors();
        let terminal = Terminal::new();
        let size = terminal.size();
        Self {
            terminal,
            out: OutputBuffer::new(),
            writer: GlyphWriter::new(),
            reader: None,
            parser: Parser::new(),
            pending_since: None,
            events: VecDeque::new(),
            size,
            colors,
            pairs: pairs_for(colors),
            in_frame: false,
            escape_timeout: ESCAPE_TIMEOUT,
        }
    }

    pub fn set_escape_timeout(&mut self, timeout: Duration) {
        self.escape_timeout = timeout;
    }

    fn begin_frame(&mut self) -> io::Result<()> {
        if !self.in_frame {
            ansi::begin_sync(&mut self.out)?;
            self.in_frame = true;
        }
        Ok(())
    }

    fn take_bytes(&mut self, bytes: &[u8]) {
        self.events.extend(self.parser.advance(bytes));
        self.pending_since = self.parser.has_pending().then(Instant::now);
    }

    /// Wait limit for one channel receive.
    fn next_wait(&self, deadline: Option<Instant>, now: Instant) -> Duration {
        let mut wait = POLL_INTERVAL;
        if let Some(deadline) = deadline {
            wait = wait.min(deadline.saturating_duration_since(now));
        }
        if let Some(since) = self.pending_since {
            let escape_deadline = since + self.escape_timeout;
            wait = wait.min(escape_deadline.saturating_duration_since(now));
        }
        wait
    }
}

impl Default for AnsiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for AnsiBackend {
    fn open(&mut self) -> io::Result<()> {
        if !terminal::is_tty() {
            return Err(io::Error::other("stdout is not a terminal"));
        }
        self.terminal.enter()?;
        terminal::install_resize_handler();
        if self.reader.is_none() {
            self.reader = Some(StdinReader::spawn()?);
        }
        self.writer.reset_state();
        self.size = self.terminal.refresh_size();
        debug!(target: "k_screen::backend", cols = self.size.cols, rows = self.size.rows, "terminal opened");
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.in_frame {
            self.flush()?;
        }
        // Stop reading so the shell gets its stdin back.
        if let Some((mut reader, _)) = self.reader.take() {
            reader.stop();
        }
        self.parser = Parser::new();
        self.pending_since = None;
        self.events.clear();
        self.terminal.leave()?;
        debug!(target: "k_screen::backend", "terminal closed");
        Ok(())
    }

    fn size(&mut self) -> io::Result<Size> {
        self.size = self.terminal.refresh_size();
        Ok(self.size)
    }

    fn resize(&mut self, size: Size) -> io::Result<()> {
        self.size = size;
        Ok(())
    }

    fn max_colors(&self) -> u16 {
        self.colors
    }

    fn max_pairs(&self) -> u16 {
        self.pairs
    }

    fn clear(&mut self) -> io::Result<()> {
        self.begin_frame()?;
        ansi::reset(&mut self.out)?;
        ansi::clear_screen(&mut self.out)?;
        self.writer.reset_state();
        Ok(())
    }

    fn write_run(&mut self, y: u16, x: u16, glyphs: &[Glyph]) -> io::Result<()> {
        self.begin_frame()?;
        self.writer.write_run(&mut self.out, x, y, glyphs)
    }

    fn move_cursor(&mut self, y: u16, x: u16) -> io::Result<()> {
        self.begin_frame()?;
        self.writer.move_to(&mut self.out, x, y)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.begin_frame()?;
        if visible {
            ansi::cursor_show(&mut self.out)
        } else {
            ansi::cursor_hide(&mut self.out)
        }
    }

    fn set_mouse(&mut self, enabled: bool) -> io::Result<()> {
        self.terminal.set_mouse(enabled.then_some(MouseMode::Click))
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.in_frame {
            return Ok(());
        }
        self.in_frame = false;
        ansi::reset(&mut self.out)?;
        ansi::end_sync(&mut self.out)?;
        // SGR 0 invalidated the tracked colors.
        self.writer.reset_state();
        self.out.flush_stdout()
    }

    fn read_event(&mut self, timeout: Option<Duration>) -> io::Result<Option<RawEvent>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if terminal::take_resize() {
                return Ok(Some(RawEvent::Resize));
            }
            if let Some(event) = self.events.pop_front() {
                return Ok(Some(RawEvent::Input(event)));
            }

            let wait = self.next_wait(deadline, Instant::now());
            let received = match &self.reader {
                Some((_, rx)) => rx.recv_timeout(wait),
                None => return Ok(None),
            };
            match received {
                Ok(bytes) => self.take_bytes(&bytes),
                Err(RecvTimeoutError::Timeout) => {
                    let expired = self
                        .pending_since
                        .is_some_and(|since| since.elapsed() >= self.escape_timeout);
                    if expired {
                        self.events.extend(self.parser.flush());
                        self.pending_since = None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stdin reader stopped",
                    ));
                }
            }

            let timed_out = deadline.is_some_and(|d| Instant::now() >= d);
            if timed_out && self.events.is_empty() && self.pending_since.is_none() {
                return Ok(None);
            }
        }
    }
}

/// Color count from the environment: 256 for 256-color and truecolor
/// terminals, 16 for other xterm-likes, 8 otherwise.
fn detect_colors() -> u16 {
    let colorterm = env::var("COLORTERM").unwrap_or_default();
    let term = env::var("TERM").unwrap_or_default();
    colors_for(&colorterm, &term)
}

fn colors_for(colorterm: &str, term: &str) -> u16 {
    if colorterm.contains("truecolor") || colorterm.contains("24bit") || term.contains("256color")
    {
        256
    } else if term.contains("xterm") || term.contains("16color") {
        16
    } else {
        8
    }
}

/// Most pairs offered, as 256-color terminal descriptions cap it.
const MAX_PAIRS: u16 = 32767;

/// Pair count for a color count: every combination, up to the cap.
fn pairs_for(colors: u16) -> u16 {
    u16::try_from(u32::from(colors) * u32::from(colors))
        .unwrap_or(MAX_PAIRS)
        .min(MAX_PAIRS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_detection() {
        assert_eq!(colors_for("truecolor", "xterm"), 256);
        assert_eq!(colors_for("", "xterm-256color"), 256);
        assert_eq!(colors_for("", "xterm"), 16);
        assert_eq!(colors_for("", "vt100"), 8);
    }

    #[test]
    fn pair_counts() {
        assert_eq!(pairs_for(8), 64);
        assert_eq!(pairs_for(16), 256);
        assert_eq!(pairs_for(256), 32767);
    }

    #[test]
    fn escape_wait_is_bounded() {
        let mut backend = AnsiBackend::new();
        let now = Instant::now();
        assert_eq!(backend.next_wait(None, now), POLL_INTERVAL);
        assert_eq!(backend.next_wait(Some(now), now), Duration::ZERO);
        backend.pending_since = Some(now);
        assert!(backend.next_wait(None, now) <= ESCAPE_TIMEOUT);
    }

    #[test]
    fn output_is_buffered_until_flush() {
        let mut backend = AnsiBackend::new();
        backend.write_run(0, 0, &[Glyph::new('x')]).unwrap();
        assert!(backend.in_frame);
        assert!(!backend.out.is_empty());
    }
}
