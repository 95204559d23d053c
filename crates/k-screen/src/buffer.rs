// SPDX-License-Identifier: MIT
//
// CellBuffer: a rectangular grid of cells.
//
// Window contents and both screen images (what the terminal shows, and
// what it should show next) are cell buffers. Storage is a flat row-major
// `Vec<Cell>`, so a row is a contiguous slice: comparing two lines is a
// slice comparison and scrolling is `copy_within`.
//
// Every operation clips to the buffer. Out-of-range coordinates return
// `false` or `None` and never disturb other cells.
//
// Double-width characters occupy an owner cell and a continuation cell.
// Anything that overwrites half of such a pair blanks the other half, so
// a buffer never holds an owner without its continuation or the reverse
// (except transiently at the edge of a copied region, which is repaired
// in the same call).

use crate::cell::Cell;
use crate::error::{Error, Result};

// ─── Rect ───────────────────────────────────────────────────────────────────

/// A rectangle in cell coordinates.
///
/// ```
/// use k_screen::buffer::Rect;
///
/// let r = Rect::new(10, 5, 20, 4);
/// assert!(r.contains(10, 5));
/// assert!(r.contains(29, 8));
/// assert!(!r.contains(30, 8));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge, exclusive.
    #[inline]
    #[must_use]
    pub const fn right(self) -> u16 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge, exclusive.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> u16 {
        self.y.saturating_add(self.height)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, x: u16, y: u16) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// The overlap of two rectangles, `None` if they do not overlap.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Self::new(x, y, right - x, bottom - y))
    }
}

// ─── CellBuffer ─────────────────────────────────────────────────────────────

/// A `width × height` grid of cells.
///
/// ```
/// use k_screen::buffer::CellBuffer;
/// use k_screen::cell::Cell;
///
/// let mut buf = CellBuffer::new(80, 24, Cell::BLANK);
/// assert!(buf.set(5, 3, Cell::new('X')));
/// assert_eq!(buf.get(5, 3).and_then(|c| c.character()), Some('X'));
/// assert!(!buf.set(80, 0, Cell::new('X')));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct CellBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl CellBuffer {
    // ─── Construction ────────────────────────────────────────────────────

    /// A buffer with every cell set to `fill`.
    #[must_use]
    pub fn new(width: u16, height: u16, fill: Cell) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; usize::from(width) * usize::from(height)],
        }
    }

    /// Like [`new`](Self::new), but reports allocation failure instead of
    /// aborting.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if the cells cannot be allocated.
    pub fn try_new(width: u16, height: u16, fill: Cell) -> Result<Self> {
        let len = usize::from(width) * usize::from(height);
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory { width, height })?;
        cells.resize(len, fill);
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.in_bounds(x, y).then(|| &self.cells[self.index(x, y)])
    }

    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if !self.in_bounds(x, y) {
            return None;
        }
        let idx = self.index(x, y);
        Some(&mut self.cells[idx])
    }

    /// Bounds-checked raw write. No wide-character repair.
    #[inline]
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        self.get_mut(x, y).map(|c| *c = cell).is_some()
    }

    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y >= self.height {
            return None;
        }
        let start = self.index(0, y);
        Some(&self.cells[start..start + usize::from(self.width)])
    }

    #[inline]
    pub fn row_mut(&mut self, y: u16) -> Option<&mut [Cell]> {
        if y >= self.height {
            return None;
        }
        let start = self.index(0, y);
        let w = usize::from(self.width);
        Some(&mut self.cells[start..start + w])
    }

    // ─── Wide Characters ─────────────────────────────────────────────────

    /// Break any double-width character that `(x, y)` is half of, in
    /// preparation for overwriting `(x, y)`.
    ///
    /// If `(x, y)` is a continuation, its owner becomes a space. If the cell
    /// after `(x, y)` is a continuation, it becomes a space. Both keep their
    /// style.
    pub fn break_wide_at(&mut self, x: u16, y: u16) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        if self.cells[idx].is_continuation() && x > 0 {
            self.cells[idx - 1] = self.cells[idx - 1].blanked();
        }
        if x + 1 < self.width && self.cells[idx + 1].is_continuation() {
            self.cells[idx + 1] = self.cells[idx + 1].blanked();
        }
    }

    /// Prepare columns `x0..x1` of row `y` for overwriting: split pairs that
    /// straddle either edge.
    fn break_edges(&mut self, y: u16, x0: u16, x1: u16) {
        if x1 > x0 {
            self.break_wide_at(x0, y);
            self.break_wide_at(x1 - 1, y);
        }
    }

    /// After columns `x0..x1` of row `y` were overwritten wholesale, blank
    /// a leading continuation with no owner and a trailing owner whose
    /// continuation lies outside the range.
    fn seal_edges(&mut self, y: u16, x0: u16, x1: u16) {
        if x1 <= x0 {
            return;
        }
        let first = self.index(x0, y);
        if self.cells[first].is_continuation() {
            self.cells[first] = self.cells[first].blanked();
        }
        let last = self.index(x1 - 1, y);
        let owner_cut = self.cells[last].width() == 2
            && (x1 >= self.width || !self.cells[last + 1].is_continuation());
        if owner_cut {
            self.cells[last] = self.cells[last].blanked();
        }
    }

    // ─── Bulk Operations ─────────────────────────────────────────────────

    /// Fill a rectangle (clipped to the buffer). Returns the filled area.
    pub fn fill(&mut self, rect: Rect, cell: Cell) -> Option<Rect> {
        let area = rect.intersect(self.bounds())?;
        for y in area.y..area.bottom() {
            self.break_edges(y, area.x, area.right());
            let start = self.index(area.x, y);
            self.cells[start..start + usize::from(area.width)].fill(cell);
        }
        Some(area)
    }

    /// Fill the whole buffer.
    pub fn clear(&mut self, cell: Cell) {
        self.cells.fill(cell);
    }

    /// Copy `src_rect` of `src` so that its top-left lands on
    /// `(dst_x, dst_y)` here. Clipped on both sides; returns the destination
    /// area actually written.
    pub fn copy_rect(
        &mut self,
        src: &Self,
        src_rect: Rect,
        dst_x: u16,
        dst_y: u16,
    ) -> Option<Rect> {
        let from = src_rect.intersect(src.bounds())?;
        // Shift by however much the source was clipped.
        let dst_x = dst_x.checked_add(from.x - src_rect.x)?;
        let dst_y = dst_y.checked_add(from.y - src_rect.y)?;
        let to = Rect::new(dst_x, dst_y, from.width, from.height).intersect(self.bounds())?;

        let width = usize::from(to.width);
        for row in 0..to.height {
            let y = to.y + row;
            self.break_edges(y, to.x, to.right());
            let s = src.index(from.x, from.y + row);
            let d = self.index(to.x, y);
            self.cells[d..d + width].copy_from_slice(&src.cells[s..s + width]);
            self.seal_edges(y, to.x, to.right());
        }
        Some(to)
    }

    /// Overwrite row `y` from column `x` with `cells`, clipped at the right
    /// edge. Wide characters split by either end are repaired. Returns the
    /// written area.
    pub fn put_cells(&mut self, x: u16, y: u16, cells: &[Cell]) -> Option<Rect> {
        if !self.in_bounds(x, y) || cells.is_empty() {
            return None;
        }
        let room = usize::from(self.width - x);
        let len = cells.len().min(room);
        // `len <= room`, which fits in u16.
        #[allow(clippy::cast_possible_truncation)]
        let end = x + len as u16;
        self.break_edges(y, x, end);
        let d = self.index(x, y);
        self.cells[d..d + len].copy_from_slice(&cells[..len]);
        self.seal_edges(y, x, end);
        Some(Rect::new(x, y, end - x, 1))
    }

    /// Scroll the rows inside `rect` by `n` lines: positive moves content
    /// up, negative moves it down. The `|n|` rows uncovered at the trailing
    /// edge are set to `blank`; cells outside `rect` are untouched.
    /// Returns the affected area.
    pub fn scroll(&mut self, rect: Rect, n: i32, blank: Cell) -> Option<Rect> {
        let area = rect.intersect(self.bounds())?;
        if n == 0 {
            return Some(area);
        }
        let shift = n.unsigned_abs();
        if shift >= u32::from(area.height) {
            return self.fill(area, blank);
        }

        for y in area.y..area.bottom() {
            self.break_edges(y, area.x, area.right());
        }

        #[allow(clippy::cast_possible_truncation)]
        let shift = shift as u16;
        let width = usize::from(area.width);
        let kept = area.height - shift;
        if n > 0 {
            for row in 0..kept {
                let y = area.y + row;
                let s = self.index(area.x, y + shift);
                let d = self.index(area.x, y);
                self.cells.copy_within(s..s + width, d);
            }
            self.fill(Rect::new(area.x, area.y + kept, area.width, shift), blank);
        } else {
            for row in (0..kept).rev() {
                let y = area.y + shift + row;
                let s = self.index(area.x, y - shift);
                let d = self.index(area.x, y);
                self.cells.copy_within(s..s + width, d);
            }
            self.fill(Rect::new(area.x, area.y, area.width, shift), blank);
        }
        Some(area)
    }

    /// Change dimensions, keeping the overlapping top-left region and
    /// filling newly exposed cells with `fill`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfMemory`] if the new cells cannot be allocated; the
    /// buffer is left unchanged.
    pub fn resize(&mut self, width: u16, height: u16, fill: Cell) -> Result<()> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        let mut next = Self::try_new(width, height, fill)?;
        let keep = Rect::new(0, 0, self.width.min(width), self.height.min(height));
        next.copy_rect(self, keep, 0, 0);
        *self = next;
        Ok(())
    }
}

impl std::fmt::Debug for CellBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CellBuffer {}x{}", self.width, self.height)?;
        for y in 0..self.height {
            let line: String = self
                .row(y)
                .unwrap_or_default()
                .iter()
                .filter_map(|c| c.character())
                .collect();
            writeln!(f, "  |{line}|")?;
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
