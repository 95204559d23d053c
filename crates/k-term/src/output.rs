// SPDX-License-Identifier: MIT
//
// Output buffering and stateful glyph rendering.
//
// Two components work together to minimize terminal I/O:
//
//   OutputBuffer accumulates every byte of an update in memory so it
//   reaches the terminal in a single write() call.
//
//   GlyphWriter remembers what the terminal currently has selected
//   (cursor position, colors, attributes) and only emits the escapes
//   needed to change it. A run of glyphs sharing one style costs one
//   cursor move, at most three SGR sequences, then plain characters.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use crate::ansi;
use crate::color::CellColor;
use crate::glyph::{Attr, Glyph, acs_to_unicode};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates ANSI output for a single `write()`.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with 16 KB of capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Write a `char` as UTF-8.
    #[inline]
    pub fn write_char(&mut self, ch: char) {
        let mut enc = [0u8; 4];
        self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
    }

    /// Drop accumulated bytes, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write accumulated output to stdout and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails. The buffer is kept so
    /// the caller may retry.
    pub fn flush_stdout(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        self.flush_to(&mut stdout)
    }

    /// Write accumulated output to an arbitrary writer and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing goes through flush_stdout() / flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── GlyphWriter ─────────────────────────────────────────────────────────────

/// Stateful glyph renderer that skips redundant escapes.
///
/// - **Cursor**: moved only when the next glyph is not where the terminal
///   cursor already sits. Wide characters advance the tracked cursor by two.
/// - **Attributes**: on change, SGR 0 then the new set. SGR 0 also clears
///   colors, so both are re-emitted afterwards.
/// - **Colors**: emitted only when they differ from the last ones sent.
/// - **Continuations**: skipped when they follow their wide owner; an
///   orphan continuation is drawn as a space in its own style.
pub struct GlyphWriter {
    cursor: Option<(u32, u16)>,
    wide_owner: Option<(u16, u16)>,
    fg: Option<CellColor>,
    bg: Option<CellColor>,
    attrs: Attr,
}

impl GlyphWriter {
    /// A writer that assumes nothing about the terminal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cursor: None,
            wide_owner: None,
            fg: None,
            bg: None,
            attrs: Attr::empty(),
        }
    }

    /// Forget all tracked state. Call after emitting SGR 0 or clearing.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Move the terminal cursor to `(x, y)` unless it is already there.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn move_to(&mut self, out: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
        if self.cursor != Some((u32::from(x), y)) {
            ansi::cursor_to(out, x, y)?;
            self.cursor = Some((u32::from(x), y));
        }
        Ok(())
    }

    /// Write consecutive glyphs starting at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn write_run(
        &mut self,
        out: &mut impl Write,
        x: u16,
        y: u16,
        glyphs: &[Glyph],
    ) -> io::Result<()> {
        for (i, glyph) in glyphs.iter().enumerate() {
            let Ok(col) = u16::try_from(usize::from(x) + i) else {
                break;
            };
            self.write_glyph(out, col, y, glyph)?;
        }
        Ok(())
    }

    /// Write one glyph at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn write_glyph(
        &mut self,
        out: &mut impl Write,
        x: u16,
        y: u16,
        glyph: &Glyph,
    ) -> io::Result<()> {
        if glyph.is_continuation() {
            if x > 0 && self.wide_owner == Some((x - 1, y)) {
                self.wide_owner = None;
                return Ok(());
            }
            self.move_to(out, x, y)?;
            self.apply_style(out, glyph)?;
            out.write_all(b" ")?;
            self.advance(x, y, 1);
            return Ok(());
        }

        self.move_to(out, x, y)?;
        self.apply_style(out, glyph)?;

        let mut ch = glyph.character().unwrap_or('?');
        if glyph.attrs.contains(Attr::ALTCHARSET) {
            ch = acs_to_unicode(ch);
        }
        let mut enc = [0u8; 4];
        out.write_all(ch.encode_utf8(&mut enc).as_bytes())?;
        if let Some(mark) = glyph.combining() {
            out.write_all(mark.encode_utf8(&mut enc).as_bytes())?;
        }

        let width = if ch.width().unwrap_or(1) >= 2 { 2 } else { 1 };
        self.advance(x, y, width);
        if width == 2 {
            self.wide_owner = Some((x, y));
        }
        Ok(())
    }

    fn advance(&mut self, x: u16, y: u16, width: u32) {
        self.cursor = Some((u32::from(x) + width, y));
        self.wide_owner = None;
    }

    fn apply_style(&mut self, out: &mut impl Write, glyph: &Glyph) -> io::Result<()> {
        let attrs = glyph.attrs.sgr();
        if attrs != self.attrs {
            if !self.attrs.is_empty() {
                ansi::reset(out)?;
                self.fg = None;
                self.bg = None;
            }
            self.attrs = attrs;
            ansi::attrs(out, attrs)?;
        }
        if self.fg != Some(glyph.fg) {
            ansi::fg(out, glyph.fg)?;
            self.fg = Some(glyph.fg);
        }
        if self.bg != Some(glyph.bg) {
            ansi::bg(out, glyph.bg)?;
            self.bg = Some(glyph.bg);
        }
        Ok(())
    }
}

impl Default for GlyphWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn render(glyphs: &[(u16, u16, Glyph)]) -> String {
        let mut out = OutputBuffer::new();
        let mut w = GlyphWriter::new();
        for (x, y, g) in glyphs {
            w.write_glyph(&mut out, *x, *y, g).unwrap();
        }
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn output_buffer_write_trait() {
        let mut buf = OutputBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"hello 42");
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn output_buffer_write_char_utf8() {
        let mut buf = OutputBuffer::new();
        buf.write_char('中');
        assert_eq!(buf.as_bytes(), "中".as_bytes());
    }

    #[test]
    fn output_buffer_flush_to_clears() {
        let mut buf = OutputBuffer::new();
        buf.write_char('x');
        let mut sink = Vec::new();
        buf.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"x");
        assert!(buf.is_empty());
    }

    // ── GlyphWriter ─────────────────────────────────────────────────────

    #[test]
    fn first_glyph_positions_and_styles() {
        let s = render(&[(0, 0, Glyph::new('A'))]);
        assert_eq!(s, "\x1b[1;1H\x1b[39m\x1b[49mA");
    }

    #[test]
    fn sequential_glyphs_skip_cursor_and_style() {
        let s = render(&[(0, 0, Glyph::new('A')), (1, 0, Glyph::new('B'))]);
        assert_eq!(s, "\x1b[1;1H\x1b[39m\x1b[49mAB");
    }

    #[test]
    fn gap_moves_cursor() {
        let s = render(&[(0, 0, Glyph::new('A')), (5, 0, Glyph::new('B'))]);
        assert!(s.ends_with("A\x1b[1;6HB"));
    }

    #[test]
    fn color_change_emits_only_fg() {
        let red = Glyph::new('b').with_fg(CellColor::Ansi256(1));
        let s = render(&[(0, 0, Glyph::new('a')), (1, 0, red)]);
        assert!(s.ends_with("a\x1b[31mb"));
    }

    #[test]
    fn dropping_attrs_resets_and_reemits_colors() {
        let bold = Glyph::new('a').with_attrs(Attr::BOLD);
        let s = render(&[(0, 0, bold), (1, 0, Glyph::new('b'))]);
        assert!(s.contains("\x1b[1m"));
        assert!(s.ends_with("a\x1b[0m\x1b[39m\x1b[49mb"));
    }

    #[test]
    fn wide_char_skips_its_continuation() {
        let wide = Glyph::new('中');
        let cont = Glyph::continuation(CellColor::Default, CellColor::Default, Attr::empty());
        let s = render(&[(0, 0, wide), (1, 0, cont), (2, 0, Glyph::new('x'))]);
        assert!(s.ends_with("中x"));
    }

    #[test]
    fn orphan_continuation_is_a_space() {
        let cont = Glyph::continuation(CellColor::Default, CellColor::Default, Attr::empty());
        let s = render(&[(3, 0, cont)]);
        assert!(s.ends_with(' '));
        assert!(s.starts_with("\x1b[1;4H"));
    }

    #[test]
    fn combining_mark_follows_base() {
        let g = Glyph::new('e').with_mark('\u{301}');
        let s = render(&[(0, 0, g)]);
        assert!(s.ends_with("e\u{301}"));
    }

    #[test]
    fn altcharset_maps_line_drawing() {
        let g = Glyph::new('q').with_attrs(Attr::ALTCHARSET);
        let s = render(&[(0, 0, g)]);
        assert!(s.ends_with('─'));
        assert!(!s.contains("\x1b[0m"));
    }

    #[test]
    fn write_run_is_contiguous() {
        let mut out = OutputBuffer::new();
        let mut w = GlyphWriter::new();
        let run = [Glyph::new('h'), Glyph::new('i')];
        w.write_run(&mut out, 2, 1, &run).unwrap();
        assert_eq!(out.as_bytes(), b"\x1b[2;3H\x1b[39m\x1b[49mhi");
    }

    #[test]
    fn reset_state_forces_reemit() {
        let mut out = OutputBuffer::new();
        let mut w = GlyphWriter::new();
        w.write_glyph(&mut out, 0, 0, &Glyph::new('a')).unwrap();
        w.reset_state();
        out.clear();
        w.write_glyph(&mut out, 1, 0, &Glyph::new('b')).unwrap();
        assert_eq!(out.as_bytes(), b"\x1b[1;2H\x1b[39m\x1b[49mb");
    }
}
