// SPDX-License-Identifier: MIT
//
// In-memory backend.
//
// Keeps the glyph grid a terminal would show after the same output, plus
// a log of every call. Input is scripted: tests queue raw events or bytes
// and `read_event` hands them out without ever blocking. Failures can be
// injected into `write_run` and `flush` to exercise error recovery.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use k_term::glyph::Glyph;
use k_term::input::Parser;
use k_term::terminal::Size;

use super::{Backend, RawEvent};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Open,
    Close,
    Resize(Size),
    Clear,
    Write { y: u16, x: u16, glyphs: Vec<Glyph> },
    MoveCursor { y: u16, x: u16 },
    CursorVisible(bool),
    Mouse(bool),
    Flush,
}

#[derive(Debug, Clone)]
pub struct MemoryBackend {
    size: Size,
    grid: Vec<Glyph>,
    cursor: (u16, u16),
    cursor_visible: bool,
    mouse: bool,
    open: bool,
    colors: u16,
    pairs: u16,
    ops: Vec<Op>,
    input: VecDeque<RawEvent>,
    /// Successful writes left before the next one fails.
    writes_before_failure: Option<usize>,
    fail_next_flush: bool,
}

impl MemoryBackend {
    /// A `cols` x `rows` display with 256 colors and 256 pairs.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        let size = Size { cols, rows };
        Self {
            size,
            grid: vec![Glyph::EMPTY; size.area() as usize],
            cursor: (0, 0),
            cursor_visible: true,
            mouse: false,
            open: false,
            colors: 256,
            pairs: 256,
            ops: Vec::new(),
            input: VecDeque::new(),
            writes_before_failure: None,
            fail_next_flush: false,
        }
    }

    /// Override the color and pair counts reported to the session.
    #[must_use]
    pub const fn with_colors(mut self, colors: u16, pairs: u16) -> Self {
        self.colors = colors;
        self.pairs = pairs;
        self
    }

    // ─── Inspection ──────────────────────────────────────────────────────

    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Return and forget the recorded calls.
    pub fn take_ops(&mut self) -> Vec<Op> {
        std::mem::take(&mut self.ops)
    }

    #[must_use]
    pub fn glyph(&self, y: u16, x: u16) -> Option<Glyph> {
        self.index(y, x).map(|i| self.grid[i])
    }

    /// What row `y` shows: continuation glyphs skipped, marks included.
    #[must_use]
    pub fn line_text(&self, y: u16) -> String {
        let mut text = String::new();
        for x in 0..self.size.cols {
            let Some(glyph) = self.glyph(y, x) else {
                break;
            };
            if let Some(c) = glyph.character() {
                text.push(c);
            }
            if let Some(mark) = glyph.combining() {
                text.push(mark);
            }
        }
        text
    }

    /// Every row, top to bottom.
    #[must_use]
    pub fn screen_text(&self) -> Vec<String> {
        (0..self.size.rows).map(|y| self.line_text(y)).collect()
    }

    #[must_use]
    pub const fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    #[must_use]
    pub const fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub const fn mouse_enabled(&self) -> bool {
        self.mouse
    }

    // ─── Scripting ───────────────────────────────────────────────────────

    pub fn push_event(&mut self, event: RawEvent) {
        self.input.push_back(event);
    }

    /// Queue the events a terminal would produce for `bytes`. Incomplete
    /// trailing sequences are flushed as if the escape timeout expired.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let mut parser = Parser::new();
        let mut events = parser.advance(bytes);
        events.extend(parser.flush());
        self.input.extend(events.into_iter().map(RawEvent::Input));
    }

    /// Change the physical size, as a terminal window resize would:
    /// content is cropped or padded and a resize event is queued.
    pub fn set_size(&mut self, cols: u16, rows: u16) {
        self.regrid(Size { cols, rows });
        self.input.push_back(RawEvent::Resize);
    }

    /// Let `successes` more `write_run` calls succeed, then fail the next
    /// one. The failure fires once.
    pub fn fail_writes_after(&mut self, successes: usize) {
        self.writes_before_failure = Some(successes);
    }

    pub fn fail_next_flush(&mut self) {
        self.fail_next_flush = true;
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn index(&self, y: u16, x: u16) -> Option<usize> {
        (y < self.size.rows && x < self.size.cols)
            .then(|| usize::from(y) * usize::from(self.size.cols) + usize::from(x))
    }

    fn regrid(&mut self, size: Size) {
        let mut grid = vec![Glyph::EMPTY; size.area() as usize];
        for y in 0..self.size.rows.min(size.rows) {
            for x in 0..self.size.cols.min(size.cols) {
                let from = usize::from(y) * usize::from(self.size.cols) + usize::from(x);
                grid[usize::from(y) * usize::from(size.cols) + usize::from(x)] = self.grid[from];
            }
        }
        self.grid = grid;
        self.size = size;
    }
}

impl Backend for MemoryBackend {
    fn open(&mut self) -> io::Result<()> {
        self.ops.push(Op::Open);
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.ops.push(Op::Close);
        self.open = false;
        Ok(())
    }

    fn size(&mut self) -> io::Result<Size> {
        Ok(self.size)
    }

    fn resize(&mut self, size: Size) -> io::Result<()> {
        self.ops.push(Op::Resize(size));
        self.regrid(size);
        Ok(())
    }

    fn max_colors(&self) -> u16 {
        self.colors
    }

    fn max_pairs(&self) -> u16 {
        self.pairs
    }

    fn clear(&mut self) -> io::Result<()> {
        self.ops.push(Op::Clear);
        self.grid.fill(Glyph::EMPTY);
        Ok(())
    }

    fn write_run(&mut self, y: u16, x: u16, glyphs: &[Glyph]) -> io::Result<()> {
        if let Some(left) = self.writes_before_failure {
            if left == 0 {
                self.writes_before_failure = None;
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected write failure"));
            }
            self.writes_before_failure = Some(left - 1);
        }
        self.ops.push(Op::Write {
            y,
            x,
            glyphs: glyphs.to_vec(),
        });
        for (i, glyph) in glyphs.iter().enumerate() {
            let Some(col) = u16::try_from(usize::from(x) + i).ok() else {
                break;
            };
            let Some(idx) = self.index(y, col) else {
                break;
            };
            self.grid[idx] = *glyph;
        }
        Ok(())
    }

    fn move_cursor(&mut self, y: u16, x: u16) -> io::Result<()> {
        self.ops.push(Op::MoveCursor { y, x });
        self.cursor = (y, x);
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.ops.push(Op::CursorVisible(visible));
        self.cursor_visible = visible;
        Ok(())
    }

    fn set_mouse(&mut self, enabled: bool) -> io::Result<()> {
        self.ops.push(Op::Mouse(enabled));
        self.mouse = enabled;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if std::mem::take(&mut self.fail_next_flush) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected flush failure"));
        }
        self.ops.push(Op::Flush);
        Ok(())
    }

    fn read_event(&mut self, _timeout: Option<Duration>) -> io::Result<Option<RawEvent>> {
        Ok(self.input.pop_front())
    }
}
