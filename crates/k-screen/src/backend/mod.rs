// SPDX-License-Identifier: MIT
//
// Backend: everything the curses core needs from a display.
//
// The core never touches a terminal directly. It hands resolved glyph
// runs, cursor moves and clears to a `Backend`, and asks it for raw input.
// Two implementations ship:
//
//   - `AnsiBackend`: a real terminal through raw mode and escape sequences.
//   - `MemoryBackend`: a glyph grid in memory, for tests and for embedding
//     the library where no terminal exists.

use std::io;
use std::time::Duration;

use k_term::glyph::Glyph;
use k_term::input::Event;
use k_term::terminal::Size;

pub mod ansi;
pub mod memory;

pub use ansi::AnsiBackend;
pub use memory::MemoryBackend;

/// Raw input as the backend sees it, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    Input(Event),
    /// The display changed size.
    Resize,
}

/// A display the curses core can drive.
///
/// Coordinates are `(y, x)`, zero-based, in display cells. Output may be
/// buffered until [`flush`](Self::flush); nothing is guaranteed visible
/// before it returns `Ok`.
pub trait Backend {
    /// Take over the display. Called once at session start and again when
    /// a refresh follows `end`.
    ///
    /// # Errors
    ///
    /// Returns an error if the display cannot be opened.
    fn open(&mut self) -> io::Result<()>;

    /// Give the display back in the state `open` found it.
    ///
    /// # Errors
    ///
    /// Returns an error if restoring the display fails.
    fn close(&mut self) -> io::Result<()>;

    /// Current display size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&mut self) -> io::Result<Size>;

    /// Adopt a new logical size (resize_term with explicit dimensions).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot change size.
    fn resize(&mut self, size: Size) -> io::Result<()>;

    /// Number of distinct colors.
    fn max_colors(&self) -> u16;

    /// Number of color pairs, counting pair 0.
    fn max_pairs(&self) -> u16;

    /// Blank the whole display with default colors.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn clear(&mut self) -> io::Result<()>;

    /// Draw consecutive glyphs starting at `(y, x)`.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn write_run(&mut self, y: u16, x: u16, glyphs: &[Glyph]) -> io::Result<()>;

    /// Park the hardware cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn move_cursor(&mut self, y: u16, x: u16) -> io::Result<()>;

    /// # Errors
    ///
    /// Returns an error if output fails.
    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;

    /// Turn mouse reporting on or off. Backends without a mouse accept and
    /// ignore this.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails.
    fn set_mouse(&mut self, enabled: bool) -> io::Result<()> {
        let _ = enabled;
        Ok(())
    }

    /// Make everything written so far visible.
    ///
    /// # Errors
    ///
    /// Returns an error if output fails; the display may then show any
    /// subset of the buffered output.
    fn flush(&mut self) -> io::Result<()>;

    /// Wait up to `timeout` (`None` = forever) for one input event.
    /// `Ok(None)` means the wait timed out.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input fails.
    fn read_event(&mut self, timeout: Option<Duration>) -> io::Result<Option<RawEvent>>;
}
