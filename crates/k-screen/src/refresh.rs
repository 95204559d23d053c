// SPDX-License-Identifier: MIT
//
// Screen diff and refresh engine.
//
// Two screen images are kept. `current` is what the display is known to
// show; `staged` is what it should show once the next update completes.
// Refreshing a window is two steps, as in curses:
//
//   1. `stage` (wnoutrefresh) copies the window's touched cells onto the
//      staged image and marks those screen spans dirty. Nothing is sent.
//   2. `update` (doupdate) compares each dirty line of `staged` against
//      `current` and sends only the differences to the backend.
//
// Per dirty line:
//
//   - Identical lines cost one slice comparison and produce no output.
//   - Differing cells are grouped into runs. Runs separated by a gap of
//     at most `MERGE_GAP` unchanged cells are merged, because one longer
//     write is cheaper than a second cursor move.
//   - Runs are widened so a double-width character and its continuation
//     column always go out together.
//   - Colors are looked up in the pair table at emission, so a cell whose
//     pair was freed goes out in the default pair's colors.
//
// A line is copied into `current` only after the backend flush succeeds.
// If a write or the flush fails, the error is returned, the line stays
// dirty, and the next update sends it again. Repeated updates therefore
// converge on the staged image however often the backend fails.

use k_term::glyph::Glyph;
use k_term::terminal::Size;
use tracing::{debug, trace};

use crate::backend::Backend;
use crate::buffer::{CellBuffer, Rect};
use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::pair::PairTable;
use crate::palette::Palette;
use crate::touch::TouchMap;
use crate::window::Window;

/// Unchanged cells tolerated inside one run.
pub const MERGE_GAP: usize = 4;

// ─── RefreshStats ───────────────────────────────────────────────────────────

/// What one update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshStats {
    /// Dirty lines that were compared.
    pub lines_compared: usize,
    /// Lines that produced output.
    pub lines_emitted: usize,
    /// `write_run` calls.
    pub runs: usize,
    pub cells_written: usize,
    pub full_repaint: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    /// The display matches the staged image.
    Idle,
    /// Staged changes are waiting for an update.
    Dirty,
    /// An update is running.
    Refreshing,
}

// ─── Screen ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Screen {
    current: CellBuffer,
    staged: CellBuffer,
    dirty: TouchMap,
    full_repaint: bool,
    state: RefreshState,
    /// Where the hardware cursor should be parked.
    cursor: (u16, u16),
    /// Cursor position the backend last received.
    placed: Option<(u16, u16)>,
    glyphs: Vec<Glyph>,
    runs: Vec<(usize, usize)>,
}

impl Screen {
    /// A `lines` x `cols` screen. The first update repaints everything.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if the images cannot be allocated.
    pub fn new(lines: u16, cols: u16) -> Result<Self> {
        Ok(Self {
            current: CellBuffer::try_new(cols, lines, Cell::BLANK)?,
            staged: CellBuffer::try_new(cols, lines, Cell::BLANK)?,
            dirty: TouchMap::new(lines),
            full_repaint: true,
            state: RefreshState::Dirty,
            cursor: (0, 0),
            placed: None,
            glyphs: Vec::new(),
            runs: Vec::new(),
        })
    }

    #[must_use]
    pub const fn lines(&self) -> u16 {
        self.staged.height()
    }

    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.staged.width()
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        Size {
            cols: self.staged.width(),
            rows: self.staged.height(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> RefreshState {
        self.state
    }

    /// The image the display is known to show (curscr).
    #[must_use]
    pub const fn current(&self) -> &CellBuffer {
        &self.current
    }

    /// The image the next update will produce (newscr).
    #[must_use]
    pub const fn staged(&self) -> &CellBuffer {
        &self.staged
    }

    /// Repaint everything on the next update, whatever changed.
    pub fn request_full_repaint(&mut self) {
        self.full_repaint = true;
        self.state = RefreshState::Dirty;
    }

    /// Skip the full repaint of the first update (the display already
    /// shows blanks, or its content should be kept).
    pub fn cancel_full_repaint(&mut self) {
        self.full_repaint = false;
        self.placed = None;
        self.sync_state();
    }

    #[must_use]
    pub const fn full_repaint_pending(&self) -> bool {
        self.full_repaint
    }

    fn sync_state(&mut self) {
        self.state = if self.full_repaint || self.dirty.any_touched() {
            RefreshState::Dirty
        } else {
            RefreshState::Idle
        };
    }

    /// Change both images to `lines` x `cols`. The staged image keeps its
    /// overlapping content; the next update repaints everything.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if the images cannot be allocated; the screen
    /// is unchanged.
    pub fn resize(&mut self, lines: u16, cols: u16) -> Result<()> {
        let current = CellBuffer::try_new(cols, lines, Cell::BLANK)?;
        self.staged.resize(cols, lines, Cell::BLANK)?;
        self.current = current;
        self.dirty = TouchMap::new(lines);
        self.cursor = (
            self.cursor.0.min(lines.saturating_sub(1)),
            self.cursor.1.min(cols.saturating_sub(1)),
        );
        debug!(target: "k_screen::refresh", lines, cols, "screen resized");
        self.request_full_repaint();
        Ok(())
    }

    // ─── Staging ─────────────────────────────────────────────────────────

    /// Copy the window's touched cells onto the staged image (wnoutrefresh)
    /// and park the cursor at the window's cursor. The window ends up
    /// untouched. A pending `clear` on the window becomes a full repaint.
    pub fn stage(&mut self, win: &mut Window) {
        if win.take_clear_request() {
            self.full_repaint = true;
        }
        let (oy, ox) = win.origin();
        let staged = &mut self.staged;
        let dirty = &mut self.dirty;
        win.drain_touched(|y, x, cells| {
            let (Some(sy), Some(sx)) = (oy.checked_add(y), ox.checked_add(x)) else {
                return;
            };
            if let Some(area) = staged.put_cells(sx, sy, cells) {
                let max_x = staged.width() - 1;
                dirty.touch(
                    sy,
                    area.x.saturating_sub(1),
                    area.right().min(max_x),
                );
            }
        });

        let (cy, cx) = win.cursor();
        let at = (oy.saturating_add(cy), ox.saturating_add(cx));
        if self.staged.in_bounds(at.1, at.0) {
            self.cursor = at;
        }
        self.sync_state();
    }

    // ─── Update ──────────────────────────────────────────────────────────

    /// Bring the display in line with the staged image (doupdate).
    ///
    /// With nothing staged since the last successful update this makes no
    /// backend calls at all.
    ///
    /// # Errors
    ///
    /// [`Error::Backend`] if a write or the flush fails; lines not
    /// confirmed by a flush stay dirty for the next update.
    /// [`Error::RefreshInProgress`] if called while an update is running.
    pub fn update<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        pairs: &PairTable,
        palette: &Palette,
    ) -> Result<RefreshStats> {
        if self.state == RefreshState::Refreshing {
            return Err(Error::RefreshInProgress);
        }
        let cursor_moved = self.placed != Some(self.cursor);
        if !self.full_repaint && !self.dirty.any_touched() && !cursor_moved {
            self.state = RefreshState::Idle;
            return Ok(RefreshStats::default());
        }

        self.state = RefreshState::Refreshing;
        let result = self.emit(backend, pairs, palette);
        self.sync_state();

        match &result {
            Ok(stats) => trace!(target: "k_screen::refresh", ?stats, "update complete"),
            Err(err) => debug!(target: "k_screen::refresh", %err, "update failed, lines stay dirty"),
        }
        result
    }

    fn emit<B: Backend + ?Sized>(
        &mut self,
        backend: &mut B,
        pairs: &PairTable,
        palette: &Palette,
    ) -> Result<RefreshStats> {
        let mut stats = RefreshStats::default();
        let width = self.staged.width();
        let height = self.staged.height();

        if self.full_repaint {
            backend.clear()?;
            self.current.clear(Cell::BLANK);
            self.dirty.touch_rows(0, height, width);
            stats.full_repaint = true;
        }

        // Rows written but not yet confirmed by a flush.
        let mut written = Vec::new();
        for y in 0..height {
            if !self.dirty.is_touched(y) {
                continue;
            }
            stats.lines_compared += 1;
            let (Some(old), Some(new)) = (self.current.row(y), self.staged.row(y)) else {
                continue;
            };
            if new.is_empty() {
                continue;
            }

            self.runs.clear();
            if stats.full_repaint {
                self.runs.push((0, new.len().saturating_sub(1)));
            } else {
                diff_runs(old, new, &mut self.runs);
            }
            if self.runs.is_empty() {
                self.dirty.untouch_rows(y, y + 1);
                continue;
            }

            for &(first, last) in &self.runs {
                self.glyphs.clear();
                self.glyphs
                    .extend(new[first..=last].iter().map(|&cell| glyph_for(cell, pairs, palette)));
                // `first` indexes a row of at most u16::MAX cells.
                #[allow(clippy::cast_possible_truncation)]
                backend.write_run(y, first as u16, &self.glyphs)?;
                stats.runs += 1;
                stats.cells_written += self.glyphs.len();
            }
            stats.lines_emitted += 1;
            written.push(y);
        }

        backend.move_cursor(self.cursor.0, self.cursor.1)?;
        backend.flush()?;

        for y in written {
            self.current
                .copy_rect(&self.staged, Rect::new(0, y, width, 1), 0, y);
            self.dirty.untouch_rows(y, y + 1);
        }
        self.full_repaint = false;
        self.placed = Some(self.cursor);
        Ok(stats)
    }
}

/// The glyph a cell is displayed as, with colors from the pair table.
#[must_use]
pub fn glyph_for(cell: Cell, pairs: &PairTable, palette: &Palette) -> Glyph {
    let (fg, bg) = pairs.resolve(cell.pair, palette);
    Glyph {
        ch: cell.ch,
        mark: cell.mark,
        fg,
        bg,
        attrs: cell.attrs,
    }
}

/// Inclusive column ranges where `new` differs from `old`, merged across
/// short gaps and widened to whole double-width characters.
pub fn diff_runs(old: &[Cell], new: &[Cell], runs: &mut Vec<(usize, usize)>) {
    runs.clear();
    if old == new {
        return;
    }
    let len = old.len().min(new.len());
    let mut x = 0;
    while x < len {
        if old[x] == new[x] {
            x += 1;
            continue;
        }
        let mut first = x;
        let mut last = x;
        x += 1;
        while x < len {
            if old[x] != new[x] {
                last = x;
            } else if x - last > MERGE_GAP {
                break;
            }
            x += 1;
        }

        // Pull in the owner of a leading continuation and the continuation
        // of a trailing wide character, on either image.
        if first > 0 && (new[first].is_continuation() || old[first].is_continuation()) {
            first -= 1;
        }
        if last + 1 < len && (new[last].width() == 2 || old[last].width() == 2) {
            last += 1;
        }

        match runs.last_mut() {
            Some(prev) if first <= prev.1 + 1 => prev.1 = prev.1.max(last),
            _ => runs.push((first, last)),
        }
        x = x.max(last + 1);
    }
}
