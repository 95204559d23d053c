// SPDX-License-Identifier: MIT
//
// Windows: rectangular drawing surfaces with a cursor.
//
// A window created with `Window::new` owns its storage: a cell buffer and
// the touch map recording which cells changed since it was last staged for
// refresh. A sub-window (`derive`, `subwindow`) owns nothing. It holds a
// weak reference to its parent's storage plus its offset inside it, so a
// write through either window lands in the same cells and marks the same
// touch map.
//
// If every owner of the storage is dropped, a sub-window is orphaned:
// every operation on it silently does nothing and reports failure. No
// dangling access is possible.
//
// All drawing clips. Operations that could not complete return `false`
// rather than an error, matching curses' ERR convention.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use k_term::glyph::Attr;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use crate::buffer::{CellBuffer, Rect};
use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::touch::TouchMap;

/// Default distance between tab stops.
pub const DEFAULT_TAB_SIZE: u16 = 8;

// ─── Storage ────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Storage {
    cells: CellBuffer,
    touched: TouchMap,
}

impl Storage {
    /// Touch `x0..=x1` of row `y` plus one column either side, for the
    /// halves of any wide character the write split.
    fn touch_around(&mut self, y: u16, x0: u16, x1: u16) {
        let Some(max_x) = self.cells.width().checked_sub(1) else {
            return;
        };
        self.touched
            .touch(y, x0.saturating_sub(1), x1.saturating_add(1).min(max_x));
    }

    /// Touch every row of `area` across the given column range.
    fn touch_area(&mut self, area: Rect) {
        for y in area.y..area.bottom() {
            self.touch_around(y, area.x, area.right().saturating_sub(1));
        }
    }
}

/// Widen `first..=last` of `row` so it neither starts on a continuation
/// nor ends on the owner of a wide character. A half that would fall
/// outside `left..=right` is dropped from the run instead.
fn whole_glyphs(
    row: &[Cell],
    mut first: u16,
    mut last: u16,
    left: u16,
    right: u16,
) -> Option<(u16, u16)> {
    if first > last {
        return None;
    }
    if row[usize::from(first)].is_continuation() {
        if first > left {
            first -= 1;
        } else {
            first += 1;
        }
    }
    if row[usize::from(last)].width() == 2 {
        if last < right {
            last += 1;
        } else {
            last = last.checked_sub(1)?;
        }
    }
    (first <= last).then_some((first, last))
}

#[derive(Debug)]
enum Backing {
    Owned(Rc<RefCell<Storage>>),
    Shared(Weak<RefCell<Storage>>),
}

// ─── Window ─────────────────────────────────────────────────────────────────

/// A window or sub-window.
///
/// Coordinates are `(y, x)` in curses order, relative to the window.
#[derive(Debug)]
pub struct Window {
    backing: Backing,
    /// Top-left of this window inside the storage.
    offset: (u16, u16),
    height: u16,
    width: u16,
    /// Screen position of the top-left cell.
    origin: (u16, u16),
    cursor: (u16, u16),
    /// Cell that received the last character, for combining marks.
    last_written: Option<(u16, u16)>,
    attrs: Attr,
    pair: u16,
    background: Cell,
    tab_size: u16,
    scroll_ok: bool,
    /// Inclusive first and last row of the scrolling region.
    region: (u16, u16),
    clear_ok: bool,
}

impl Window {
    // ─── Creation ────────────────────────────────────────────────────────

    /// An independent `height` x `width` window placed at screen `(y, x)`.
    /// The whole window starts touched.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] for a zero dimension, [`Error::OutOfMemory`]
    /// if the cells cannot be allocated.
    pub fn new(height: u16, width: u16, y: u16, x: u16) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(Error::OutOfBounds { y, x, height, width });
        }
        let cells = CellBuffer::try_new(width, height, Cell::BLANK)?;
        let mut touched = TouchMap::new(height);
        touched.touch_rows(0, height, width);
        let storage = Rc::new(RefCell::new(Storage { cells, touched }));
        Ok(Self::with_backing(
            Backing::Owned(storage),
            (0, 0),
            height,
            width,
            (y, x),
        ))
    }

    fn with_backing(
        backing: Backing,
        offset: (u16, u16),
        height: u16,
        width: u16,
        origin: (u16, u16),
    ) -> Self {
        Self {
            backing,
            offset,
            height,
            width,
            origin,
            cursor: (0, 0),
            last_written: None,
            attrs: Attr::empty(),
            pair: 0,
            background: Cell::BLANK,
            tab_size: DEFAULT_TAB_SIZE,
            scroll_ok: false,
            region: (0, height - 1),
            clear_ok: false,
        }
    }

    /// A sub-window at `(rel_y, rel_x)` inside this window (derwin). A zero
    /// dimension extends to this window's edge. Style, background and tab
    /// size are inherited.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] if the region does not fit inside this
    /// window, [`Error::Unsupported`] if this window is orphaned.
    pub fn derive(&self, height: u16, width: u16, rel_y: u16, rel_x: u16) -> Result<Self> {
        let out_of_bounds = Error::OutOfBounds {
            y: rel_y,
            x: rel_x,
            height,
            width,
        };
        let h = if height == 0 { self.height.saturating_sub(rel_y) } else { height };
        let w = if width == 0 { self.width.saturating_sub(rel_x) } else { width };
        let fits = h > 0
            && w > 0
            && u32::from(rel_y) + u32::from(h) <= u32::from(self.height)
            && u32::from(rel_x) + u32::from(w) <= u32::from(self.width);
        if !fits {
            return Err(out_of_bounds);
        }
        let storage = self
            .storage()
            .ok_or(Error::Unsupported("parent window storage has been released"))?;

        let mut child = Self::with_backing(
            Backing::Shared(Rc::downgrade(&storage)),
            (self.offset.0 + rel_y, self.offset.1 + rel_x),
            h,
            w,
            (
                self.origin.0.saturating_add(rel_y),
                self.origin.1.saturating_add(rel_x),
            ),
        );
        child.attrs = self.attrs;
        child.pair = self.pair;
        child.background = self.background;
        child.tab_size = self.tab_size;
        Ok(child)
    }

    /// A sub-window placed at screen `(y, x)` (subwin).
    ///
    /// # Errors
    ///
    /// As [`derive`](Self::derive); also [`Error::OutOfBounds`] when
    /// `(y, x)` is above or left of this window.
    pub fn subwindow(&self, height: u16, width: u16, y: u16, x: u16) -> Result<Self> {
        let rel = y
            .checked_sub(self.origin.0)
            .zip(x.checked_sub(self.origin.1));
        let Some((rel_y, rel_x)) = rel else {
            return Err(Error::OutOfBounds { y, x, height, width });
        };
        self.derive(height, width, rel_y, rel_x)
    }

    fn storage(&self) -> Option<Rc<RefCell<Storage>>> {
        match &self.backing {
            Backing::Owned(rc) => Some(Rc::clone(rc)),
            Backing::Shared(weak) => weak.upgrade(),
        }
    }

    fn with_storage<R>(&self, f: impl FnOnce(&mut Storage) -> R) -> Option<R> {
        let rc = self.storage()?;
        let mut guard = rc.borrow_mut();
        Some(f(&mut guard))
    }

    /// A window-relative rectangle in storage coordinates.
    const fn to_storage(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x + self.offset.1,
            rect.y + self.offset.0,
            rect.width,
            rect.height,
        )
    }

    const fn full_rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Screen position `(y, x)` of the top-left cell.
    #[must_use]
    pub const fn origin(&self) -> (u16, u16) {
        self.origin
    }

    #[must_use]
    pub const fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    #[must_use]
    pub const fn is_subwindow(&self) -> bool {
        matches!(self.backing, Backing::Shared(_))
    }

    /// Whether this is a sub-window whose parent storage is gone.
    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        match &self.backing {
            Backing::Owned(_) => false,
            Backing::Shared(weak) => weak.strong_count() == 0,
        }
    }

    /// Move the window on screen (mvwin). Sub-windows stay attached to
    /// their parent and cannot be moved.
    pub fn move_to(&mut self, y: u16, x: u16) -> bool {
        if self.is_subwindow() {
            return false;
        }
        self.origin = (y, x);
        self.touch();
        true
    }

    /// Change the size of an owned window, keeping its content and filling
    /// new cells with the background.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] for sub-windows, [`Error::OutOfBounds`] for a
    /// zero dimension, [`Error::OutOfMemory`] if the cells cannot be
    /// allocated.
    pub fn resize(&mut self, height: u16, width: u16) -> Result<()> {
        let Backing::Owned(rc) = &self.backing else {
            return Err(Error::Unsupported("resizing a sub-window"));
        };
        if height == 0 || width == 0 {
            let (y, x) = self.origin;
            return Err(Error::OutOfBounds { y, x, height, width });
        }
        {
            let mut s = rc.borrow_mut();
            s.cells.resize(width, height, self.background)?;
            s.touched.resize(height);
            s.touched.touch_rows(0, height, width);
        }
        self.height = height;
        self.width = width;
        self.cursor = (self.cursor.0.min(height - 1), self.cursor.1.min(width - 1));
        self.region = (0, height - 1);
        self.last_written = None;
        Ok(())
    }

    // ─── Cursor & Style ──────────────────────────────────────────────────

    /// Place the cursor (wmove). Fails outside the window.
    pub fn move_cursor(&mut self, y: u16, x: u16) -> bool {
        if y >= self.height || x >= self.width {
            return false;
        }
        self.cursor = (y, x);
        self.last_written = None;
        true
    }

    pub fn set_attrs(&mut self, attrs: Attr) {
        self.attrs = attrs;
    }

    pub fn attr_on(&mut self, attrs: Attr) {
        self.attrs |= attrs;
    }

    pub fn attr_off(&mut self, attrs: Attr) {
        self.attrs &= !attrs;
    }

    #[must_use]
    pub const fn attrs(&self) -> Attr {
        self.attrs
    }

    /// Color pair for subsequent writes. Pair 0 falls back to the
    /// background's pair.
    pub fn set_pair(&mut self, pair: u16) {
        self.pair = pair;
    }

    #[must_use]
    pub const fn pair(&self) -> u16 {
        self.pair
    }

    /// Cell used for cleared and newly exposed areas (bkgdset). Its
    /// attributes and pair also apply to every character written.
    pub fn set_background(&mut self, cell: Cell) {
        self.background = cell;
    }

    #[must_use]
    pub const fn background(&self) -> Cell {
        self.background
    }

    pub fn set_tab_size(&mut self, size: u16) {
        self.tab_size = size.max(1);
    }

    #[must_use]
    pub const fn tab_size(&self) -> u16 {
        self.tab_size
    }

    fn styled(&self, ch: char) -> Cell {
        let pair = if self.pair == 0 { self.background.pair } else { self.pair };
        Cell::styled(ch, self.attrs | self.background.attrs, pair)
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Write one character at the cursor and advance it (waddch).
    ///
    /// `\n` clears to the end of the line and moves to the next one, `\r`
    /// returns to column 0, `\t` advances to the next tab stop, backspace
    /// moves left, and other control characters are shown as `^X`.
    /// Zero-width characters combine with the previous character. Writing
    /// past the right edge wraps; past the bottom of the scrolling region
    /// scrolls if scrolling is enabled and fails otherwise.
    pub fn add_char(&mut self, ch: char) -> bool {
        match ch {
            '\n' => {
                self.clear_to_eol();
                self.cursor.1 = 0;
                self.last_written = None;
                self.line_feed()
            }
            '\r' => {
                self.cursor.1 = 0;
                self.last_written = None;
                true
            }
            '\t' => {
                let tab = self.tab_size;
                let stop = (self.cursor.1 / tab + 1).saturating_mul(tab).min(self.width);
                let spaces = stop - self.cursor.1;
                (0..spaces).all(|_| self.emit(self.styled(' ')))
            }
            '\x08' => {
                self.cursor.1 = self.cursor.1.saturating_sub(1);
                self.last_written = None;
                true
            }
            c if c.is_ascii_control() => {
                let shown = char::from(u8::try_from(c).unwrap_or(b'?') ^ 0x40);
                self.add_char('^') && self.add_char(shown)
            }
            c if c.is_control() => self.emit(self.styled('\u{fffd}')),
            c if c.width() == Some(0) => self.attach_mark(c),
            c => self.emit(self.styled(c)),
        }
    }

    /// Write a prepared cell at the cursor, without interpreting control
    /// characters, and advance.
    pub fn add_cell(&mut self, cell: Cell) -> bool {
        if cell.is_continuation() {
            return false;
        }
        self.emit(cell)
    }

    /// Write a string, one grapheme cluster at a time. Stops at the first
    /// character that cannot be written.
    pub fn add_str(&mut self, s: &str) -> bool {
        self.add_graphemes(s.graphemes(true))
    }

    /// Write at most `n` grapheme clusters of `s`.
    pub fn add_nstr(&mut self, s: &str, n: usize) -> bool {
        self.add_graphemes(s.graphemes(true).take(n))
    }

    /// Move, then write a string (mvwaddstr).
    pub fn mv_add_str(&mut self, y: u16, x: u16, s: &str) -> bool {
        self.move_cursor(y, x) && self.add_str(s)
    }

    fn add_graphemes<'a>(&mut self, graphemes: impl Iterator<Item = &'a str>) -> bool {
        for grapheme in graphemes {
            let mut marked = false;
            for (i, c) in grapheme.chars().enumerate() {
                let combining = i > 0 && c.width() == Some(0);
                // A cell holds one mark; further ones are dropped.
                if combining && marked {
                    continue;
                }
                marked |= combining;
                if !self.add_char(c) {
                    return false;
                }
            }
        }
        true
    }

    /// Attach a combining mark to the last written cell, or to a blank at
    /// the cursor if nothing was written yet.
    fn attach_mark(&mut self, mark: char) -> bool {
        let Some((y, x)) = self.last_written else {
            return self.emit(self.styled(' ').with_mark(mark));
        };
        let area = self.to_storage(Rect::new(x, y, 1, 1));
        self.with_storage(|s| {
            let Some(cell) = s.cells.get_mut(area.x, area.y) else {
                return false;
            };
            if cell.mark == 0 {
                cell.mark = u32::from(mark);
            }
            s.touch_around(area.y, area.x, area.x);
            true
        })
        .unwrap_or(false)
    }

    /// Put `cell` at the cursor, wrapping first if a wide character does
    /// not fit, then advance.
    fn emit(&mut self, cell: Cell) -> bool {
        if self.is_orphaned() {
            return false;
        }
        let wide = cell.width() == 2;
        if wide {
            if self.width < 2 {
                return false;
            }
            let (y, x) = self.cursor;
            if x + 1 >= self.width {
                self.put(y, x, self.background);
                self.cursor.1 = 0;
                if !self.line_feed() {
                    self.cursor.1 = x;
                    return false;
                }
            }
        }
        let (y, x) = self.cursor;
        self.put(y, x, cell);
        self.last_written = Some((y, x));
        self.advance(if wide { 2 } else { 1 })
    }

    /// Store `cell` (and its continuation if wide) at window `(y, x)`,
    /// repairing any wide characters the write splits.
    fn put(&self, y: u16, x: u16, cell: Cell) {
        let wide = cell.width() == 2;
        let at = self.to_storage(Rect::new(x, y, 1, 1));
        self.with_storage(|s| {
            s.cells.break_wide_at(at.x, at.y);
            if wide {
                s.cells.break_wide_at(at.x + 1, at.y);
            }
            s.cells.set(at.x, at.y, cell);
            let mut last = at.x;
            if wide && s.cells.set(at.x + 1, at.y, Cell::continuation_of(cell)) {
                last += 1;
            }
            s.touch_around(at.y, at.x, last);
        });
    }

    fn advance(&mut self, columns: u16) -> bool {
        let x = self.cursor.1 + columns;
        if x < self.width {
            self.cursor.1 = x;
            return true;
        }
        self.cursor.1 = 0;
        if self.line_feed() {
            true
        } else {
            self.cursor.1 = self.width - 1;
            false
        }
    }

    /// Move the cursor down a row, scrolling the region when at its bottom.
    fn line_feed(&mut self) -> bool {
        let y = self.cursor.0;
        if y == self.region.1 {
            if !self.scroll_ok {
                return false;
            }
            self.scroll_rows(self.region.0, self.region.1, 1);
            return true;
        }
        if y + 1 < self.height {
            self.cursor.0 = y + 1;
            true
        } else {
            false
        }
    }

    // ─── Clearing ────────────────────────────────────────────────────────

    /// Fill a window-relative rectangle with the background.
    fn blank_area(&self, rect: Rect) {
        let Some(local) = rect.intersect(self.full_rect()) else {
            return;
        };
        let target = self.to_storage(local);
        let background = self.background;
        self.with_storage(|s| {
            if let Some(area) = s.cells.fill(target, background) {
                s.touch_area(area);
            }
        });
    }

    /// Blank the whole window and home the cursor (werase).
    pub fn erase(&mut self) {
        self.blank_area(self.full_rect());
        self.cursor = (0, 0);
        self.last_written = None;
    }

    /// Like [`erase`](Self::erase), and also repaint the whole screen on
    /// the next refresh (wclear).
    pub fn clear(&mut self) {
        self.erase();
        self.clear_ok = true;
    }

    /// Blank from the cursor to the end of its line.
    pub fn clear_to_eol(&mut self) {
        let (y, x) = self.cursor;
        self.blank_area(Rect::new(x, y, self.width - x, 1));
    }

    /// Blank from the cursor to the end of the window.
    pub fn clear_to_bottom(&mut self) {
        self.clear_to_eol();
        let below = self.cursor.0 + 1;
        if below < self.height {
            self.blank_area(Rect::new(0, below, self.width, self.height - below));
        }
    }

    // ─── Scrolling ───────────────────────────────────────────────────────

    /// Allow writes past the bottom of the region to scroll (scrollok).
    pub fn set_scrollok(&mut self, on: bool) {
        self.scroll_ok = on;
    }

    #[must_use]
    pub const fn scrollok(&self) -> bool {
        self.scroll_ok
    }

    /// Limit scrolling to rows `top..=bottom` (wsetscrreg).
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) -> bool {
        if top > bottom || bottom >= self.height {
            return false;
        }
        self.region = (top, bottom);
        true
    }

    #[must_use]
    pub const fn scroll_region(&self) -> (u16, u16) {
        self.region
    }

    /// Scroll the region up `n` rows (down if negative). Requires
    /// [`set_scrollok`](Self::set_scrollok).
    pub fn scroll(&mut self, n: i32) -> bool {
        if !self.scroll_ok || self.is_orphaned() {
            return false;
        }
        self.scroll_rows(self.region.0, self.region.1, n);
        true
    }

    /// Insert `n` blank rows at the cursor row; rows below move down and
    /// the bottom ones fall off.
    pub fn insert_lines(&mut self, n: u16) -> bool {
        if self.is_orphaned() {
            return false;
        }
        self.scroll_rows(self.cursor.0, self.height - 1, -i32::from(n));
        true
    }

    /// Delete `n` rows at the cursor row; rows below move up and blank
    /// rows appear at the bottom.
    pub fn delete_lines(&mut self, n: u16) -> bool {
        if self.is_orphaned() {
            return false;
        }
        self.scroll_rows(self.cursor.0, self.height - 1, i32::from(n));
        true
    }

    fn scroll_rows(&mut self, top: u16, bottom: u16, n: i32) {
        let rect = self.to_storage(Rect::new(0, top, self.width, bottom - top + 1));
        let background = self.background;
        self.with_storage(|s| {
            if let Some(area) = s.cells.scroll(rect, n, background) {
                s.touch_area(area);
            }
        });
        self.last_written = None;
    }

    // ─── Touch ───────────────────────────────────────────────────────────

    /// Mark the whole window changed (touchwin).
    pub fn touch(&mut self) {
        self.touch_lines(0, self.height, true);
    }

    /// Mark the whole window unchanged (untouchwin).
    pub fn untouch(&mut self) {
        self.touch_lines(0, self.height, false);
    }

    /// Mark `count` rows from `start` changed or unchanged (wtouchln).
    pub fn touch_lines(&mut self, start: u16, count: u16, changed: bool) {
        let end = start.saturating_add(count).min(self.height);
        if start >= end {
            return;
        }
        let (oy, ox) = self.offset;
        let last_x = ox + self.width - 1;
        self.with_storage(|s| {
            for y in oy + start..oy + end {
                if changed {
                    s.touched.touch(y, ox, last_x);
                } else {
                    s.touched.untouch(y, ox, last_x);
                }
            }
        });
    }

    #[must_use]
    pub fn is_line_touched(&self, y: u16) -> bool {
        if y >= self.height {
            return false;
        }
        let (oy, ox) = self.offset;
        self.with_storage(|s| s.touched.is_touched_in(oy + y, ox, ox + self.width - 1))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_touched(&self) -> bool {
        (0..self.height).any(|y| self.is_line_touched(y))
    }

    /// Repaint the whole screen the next time this window is refreshed
    /// (clearok).
    pub fn set_clear_ok(&mut self, on: bool) {
        self.clear_ok = on;
    }

    #[must_use]
    pub const fn clear_ok(&self) -> bool {
        self.clear_ok
    }

    pub(crate) fn take_clear_request(&mut self) -> bool {
        std::mem::take(&mut self.clear_ok)
    }

    /// Hand every touched run of this window to `f` as
    /// `(row, column, cells)` in window coordinates, then mark the window
    /// untouched.
    pub(crate) fn drain_touched(&self, mut f: impl FnMut(u16, u16, &[Cell])) {
        let (oy, ox) = self.offset;
        let last_x = ox + self.width - 1;
        self.with_storage(|guard| {
            let s = &mut *guard;
            for y in 0..self.height {
                let sy = oy + y;
                let Some(row) = s.cells.row(sy) else {
                    break;
                };
                let Some(row_end) = u16::try_from(row.len()).ok().and_then(|n| n.checked_sub(1))
                else {
                    break;
                };
                if let Some(spans) = s.touched.spans(sy) {
                    let right = last_x.min(row_end);
                    for span in spans.iter() {
                        let first = span.first.max(ox);
                        let last = span.last.min(right);
                        if let Some((first, last)) = whole_glyphs(row, first, last, ox, right) {
                            f(y, first - ox, &row[usize::from(first)..=usize::from(last)]);
                        }
                    }
                }
                s.touched.untouch(sy, ox, last_x);
            }
        });
    }

    // ─── Reading ─────────────────────────────────────────────────────────

    /// The cell at window `(y, x)`.
    #[must_use]
    pub fn cell_at(&self, y: u16, x: u16) -> Option<Cell> {
        if y >= self.height || x >= self.width {
            return None;
        }
        let at = self.to_storage(Rect::new(x, y, 1, 1));
        self.with_storage(|s| s.cells.get(at.x, at.y).copied())
            .flatten()
    }

    /// The characters of row `y`, continuation cells skipped and marks
    /// included.
    #[must_use]
    pub fn line_text(&self, y: u16) -> Option<String> {
        if y >= self.height {
            return None;
        }
        let (oy, ox) = self.offset;
        self.with_storage(|s| {
            let row = s.cells.row(oy + y)?;
            let start = usize::from(ox).min(row.len());
            let end = (usize::from(ox) + usize::from(self.width)).min(row.len());
            let mut text = String::with_capacity(end - start);
            for cell in &row[start..end] {
                if let Some(c) = cell.character() {
                    text.push(c);
                    if let Some(mark) = char::from_u32(cell.mark).filter(|&m| m != '\0') {
                        text.push(mark);
                    }
                }
            }
            Some(text)
        })
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn window(height: u16, width: u16) -> Window {
        Window::new(height, width, 0, 0).unwrap()
    }

    fn text(win: &Window, y: u16) -> String {
        win.line_text(y).unwrap()
    }

    // ── creation ────────────────────────────────────────────────────────

    #[test]
    fn new_window_is_blank_and_touched() {
        let w = window(3, 5);
        assert_eq!(text(&w, 0), "     ");
        assert!(w.is_touched());
        assert!(!w.is_subwindow());
        assert!(matches!(Window::new(0, 5, 0, 0), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn derive_rejects_regions_outside_parent() {
        let w = window(10, 10);
        assert!(w.derive(5, 5, 6, 0).is_err());
        assert!(w.derive(5, 11, 0, 0).is_err());
        assert!(w.derive(0, 0, 10, 0).is_err());
        let extended = w.derive(0, 0, 4, 3).unwrap();
        assert_eq!((extended.height(), extended.width()), (6, 7));
    }

    #[test]
    fn subwindow_uses_screen_coordinates() {
        let w = Window::new(10, 20, 2, 4).unwrap();
        let sub = w.subwindow(3, 3, 5, 10).unwrap();
        assert_eq!(sub.origin(), (5, 10));
        assert!(w.subwindow(3, 3, 1, 10).is_err());
    }

    // ── add_char ────────────────────────────────────────────────────────

    #[test]
    fn add_str_writes_and_advances() {
        let mut w = window(2, 10);
        assert!(w.add_str("hello"));
        assert_eq!(w.cursor(), (0, 5));
        assert_eq!(text(&w, 0), "hello     ");
    }

    #[test]
    fn wraps_at_right_edge() {
        let mut w = window(2, 4);
        assert!(w.add_str("abcdef"));
        assert_eq!(text(&w, 0), "abcd");
        assert_eq!(text(&w, 1), "ef  ");
        assert_eq!(w.cursor(), (1, 2));
    }

    #[test]
    fn bottom_right_without_scrolling_fails() {
        let mut w = window(2, 3);
        assert!(!w.add_str("abcdefgh"));
        assert_eq!(text(&w, 0), "abc");
        assert_eq!(text(&w, 1), "def");
    }

    #[test]
    fn bottom_right_with_scrolling_scrolls() {
        let mut w = window(2, 3);
        w.set_scrollok(true);
        assert!(w.add_str("abcdefgh"));
        assert_eq!(text(&w, 0), "def");
        assert_eq!(text(&w, 1), "gh ");
    }

    #[test]
    fn newline_clears_rest_of_line() {
        let mut w = window(3, 6);
        w.add_str("xxxxxx");
        w.move_cursor(0, 2);
        assert!(w.add_char('\n'));
        assert_eq!(text(&w, 0), "xx    ");
        assert_eq!(w.cursor(), (1, 0));
    }

    #[test]
    fn tab_advances_to_next_stop() {
        let mut w = window(1, 20);
        w.add_str("ab\tc");
        assert_eq!(w.cursor(), (0, 9));
        w.set_tab_size(4);
        w.add_char('\t');
        assert_eq!(w.cursor(), (0, 12));
    }

    #[test]
    fn control_characters_are_shown_caret_style() {
        let mut w = window(1, 6);
        w.add_char('\x01');
        assert_eq!(text(&w, 0), "^A    ");
    }

    #[test]
    fn carriage_return_and_backspace() {
        let mut w = window(1, 6);
        w.add_str("abc\rX");
        assert_eq!(text(&w, 0), "Xbc   ");
        w.add_char('\x08');
        assert_eq!(w.cursor(), (0, 0));
    }

    // ── wide and combining ──────────────────────────────────────────────

    #[test]
    fn wide_character_gets_continuation() {
        let mut w = window(1, 6);
        w.add_str("a中b");
        assert_eq!(w.cursor(), (0, 4));
        assert!(w.cell_at(0, 2).unwrap().is_continuation());
        assert_eq!(text(&w, 0), "a中b  ");
    }

    #[test]
    fn wide_character_at_last_column_wraps() {
        let mut w = window(2, 3);
        w.add_str("ab中");
        assert_eq!(text(&w, 0), "ab ");
        assert_eq!(text(&w, 1), "中 ");
    }

    #[test]
    fn overwriting_half_of_wide_character_blanks_other_half() {
        let mut w = window(1, 4);
        w.add_str("中");
        w.move_cursor(0, 1);
        w.add_char('x');
        assert_eq!(text(&w, 0), " x  ");
    }

    #[test]
    fn combining_mark_attaches_to_previous_cell() {
        let mut w = window(1, 4);
        w.add_str("e\u{301}x");
        assert_eq!(w.cell_at(0, 0).unwrap().mark, 0x301);
        assert_eq!(w.cursor(), (0, 2));
        assert_eq!(text(&w, 0), "e\u{301}x  ");
    }

    #[test]
    fn add_nstr_counts_graphemes() {
        let mut w = window(1, 6);
        w.add_nstr("e\u{301}abc", 2);
        assert_eq!(text(&w, 0), "e\u{301}a    ");
    }

    // ── style ───────────────────────────────────────────────────────────

    #[test]
    fn style_and_background_apply_to_writes() {
        let mut w = window(1, 4);
        w.set_background(Cell::styled(' ', Attr::empty(), 3));
        w.attr_on(Attr::BOLD);
        w.add_char('a');
        w.set_pair(5);
        w.attr_off(Attr::BOLD);
        w.add_char('b');
        assert_eq!(w.cell_at(0, 0), Some(Cell::styled('a', Attr::BOLD, 3)));
        assert_eq!(w.cell_at(0, 1), Some(Cell::styled('b', Attr::empty(), 5)));
    }

    // ── sub-windows ─────────────────────────────────────────────────────

    #[test]
    fn subwindow_shares_cells_with_parent() {
        let mut parent = window(5, 10);
        let mut sub = parent.derive(2, 4, 1, 3).unwrap();
        sub.add_str("hi");
        assert_eq!(parent.cell_at(1, 3).and_then(Cell::character), Some('h'));
        parent.mv_add_str(2, 4, "Z");
        assert_eq!(sub.cell_at(1, 1).and_then(Cell::character), Some('Z'));
    }

    #[test]
    fn subwindow_clips_to_its_own_bounds() {
        let parent = window(3, 10);
        let mut sub = parent.derive(1, 3, 0, 0).unwrap();
        assert!(!sub.add_str("abcdef"));
        assert_eq!(text(&parent, 0), "abc       ");
    }

    #[test]
    fn orphaned_subwindow_ignores_operations() {
        let parent = window(4, 4);
        let mut sub = parent.derive(2, 2, 1, 1).unwrap();
        drop(parent);
        assert!(sub.is_orphaned());
        assert!(!sub.add_str("x"));
        assert!(!sub.insert_lines(1));
        assert_eq!(sub.cell_at(0, 0), None);
        assert_eq!(sub.line_text(0), None);
        sub.erase();
        sub.touch();
        assert!(!sub.is_touched());
        assert!(sub.derive(1, 1, 0, 0).is_err());
    }

    #[test]
    fn subwindow_cannot_move_or_resize() {
        let parent = window(4, 4);
        let mut sub = parent.derive(2, 2, 0, 0).unwrap();
        assert!(!sub.move_to(1, 1));
        assert!(matches!(sub.resize(3, 3), Err(Error::Unsupported(_))));
    }

    // ── clearing and scrolling ──────────────────────────────────────────

    #[test]
    fn clear_to_bottom_from_cursor() {
        let mut w = window(3, 3);
        w.add_str("abcdefgh");
        w.move_cursor(1, 1);
        w.clear_to_bottom();
        assert_eq!(text(&w, 0), "abc");
        assert_eq!(text(&w, 1), "d  ");
        assert_eq!(text(&w, 2), "   ");
    }

    #[test]
    fn clear_requests_full_repaint() {
        let mut w = window(2, 2);
        w.add_str("ab");
        w.clear();
        assert!(w.clear_ok());
        assert!(w.take_clear_request());
        assert!(!w.clear_ok());
        assert_eq!(text(&w, 0), "  ");
    }

    #[test]
    fn scroll_respects_region() {
        let mut w = window(4, 1);
        for (y, c) in ["a", "b", "c", "d"].iter().enumerate() {
            w.mv_add_str(u16::try_from(y).unwrap(), 0, c);
        }
        assert!(!w.scroll(1));
        w.set_scrollok(true);
        assert!(w.set_scroll_region(1, 2));
        assert!(w.scroll(1));
        let rows: Vec<_> = (0..4).map(|y| text(&w, y)).collect();
        assert_eq!(rows, ["a", "c", " ", "d"]);
    }

    #[test]
    fn insert_and_delete_lines() {
        let mut w = window(3, 1);
        w.mv_add_str(0, 0, "a");
        w.mv_add_str(1, 0, "b");
        w.mv_add_str(2, 0, "c");
        w.move_cursor(1, 0);
        w.insert_lines(1);
        let rows: Vec<_> = (0..3).map(|y| text(&w, y)).collect();
        assert_eq!(rows, ["a", " ", "b"]);
        w.delete_lines(1);
        let rows: Vec<_> = (0..3).map(|y| text(&w, y)).collect();
        assert_eq!(rows, ["a", "b", " "]);
    }

    #[test]
    fn resize_keeps_content() {
        let mut w = window(2, 3);
        w.add_str("abcdef");
        w.resize(3, 4).unwrap();
        assert_eq!(text(&w, 0), "abc ");
        assert_eq!(text(&w, 1), "def ");
        assert_eq!(text(&w, 2), "    ");
    }

    // ── touch ───────────────────────────────────────────────────────────

    #[test]
    fn drain_reports_touched_runs_and_untouches() {
        let mut w = window(3, 8);
        w.untouch();
        assert!(!w.is_touched());
        w.mv_add_str(1, 3, "ab");
        assert!(w.is_line_touched(1));
        assert!(!w.is_line_touched(0));

        let mut runs = Vec::new();
        w.drain_touched(|y, x, cells| {
            let s: String = cells.iter().filter_map(|c| c.character()).collect();
            runs.push((y, x, s));
        });
        assert_eq!(runs, vec![(1, 2, " ab ".to_string())]);
        assert!(!w.is_touched());
    }

    #[test]
    fn drain_never_splits_wide_characters() {
        let mut w = window(1, 6);
        w.mv_add_str(0, 0, "界");
        w.drain_touched(|_, _, _| {});
        w.mv_add_str(0, 2, "a");

        let mut runs = Vec::new();
        w.drain_touched(|y, x, cells| {
            let s: String = cells.iter().filter_map(|c| c.character()).collect();
            runs.push((y, x, cells.len(), s));
        });
        assert_eq!(runs, vec![(0, 0, 4, "界a ".to_string())]);
    }

    #[test]
    fn subwindow_writes_touch_parent() {
        let mut parent = window(4, 8);
        parent.untouch();
        let mut sub = parent.derive(2, 4, 2, 2).unwrap();
        sub.add_char('q');
        assert!(parent.is_line_touched(2));
        sub.drain_touched(|_, _, _| {});
        assert!(!sub.is_line_touched(0));
        // Column 1 lies left of the sub-window and stays touched.
        assert!(parent.is_line_touched(2));
    }

    #[test]
    fn touch_lines_marks_range() {
        let mut w = window(5, 2);
        w.untouch();
        w.touch_lines(1, 2, true);
        let touched: Vec<_> = (0..5).map(|y| w.is_line_touched(y)).collect();
        assert_eq!(touched, [false, true, true, false, false]);
    }
}
