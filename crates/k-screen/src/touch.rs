// SPDX-License-Identifier: MIT
//
// Dirty tracking.
//
// curses remembers, per line, the first and last changed column. That
// single range over-approximates badly when a line is touched at both
// ends, and it cannot say "everything except this part was sent".
// Here each line keeps a set of disjoint column spans, so touching,
// untouching and intersecting are exact.

use std::fmt;

// ─── Span ───────────────────────────────────────────────────────────────────

/// Inclusive column range `first..=last`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub first: u16,
    pub last: u16,
}

impl Span {
    #[inline]
    #[must_use]
    pub const fn new(first: u16, last: u16) -> Self {
        Self { first, last }
    }

    #[inline]
    #[must_use]
    pub const fn len(self) -> usize {
        (self.last - self.first) as usize + 1
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, x: u16) -> bool {
        x >= self.first && x <= self.last
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}

// ─── SpanSet ────────────────────────────────────────────────────────────────

/// Sorted, disjoint, non-adjacent spans.
///
/// ```
/// use k_screen::touch::{Span, SpanSet};
///
/// let mut s = SpanSet::default();
/// s.insert(2, 4);
/// s.insert(5, 7); // adjacent: merges
/// s.remove(3, 3);
/// assert_eq!(s.iter().collect::<Vec<_>>(), vec![Span::new(2, 2), Span::new(4, 7)]);
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SpanSet {
    spans: Vec<Span>,
}

impl SpanSet {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = Span> + '_ {
        self.spans.iter().copied()
    }

    /// Smallest span covering every member.
    #[must_use]
    pub fn bounds(&self) -> Option<Span> {
        Some(Span::new(self.spans.first()?.first, self.spans.last()?.last))
    }

    /// Whether any member overlaps `first..=last`.
    #[must_use]
    pub fn intersects(&self, first: u16, last: u16) -> bool {
        self.spans.iter().any(|s| s.first <= last && s.last >= first)
    }

    /// Add `first..=last`, merging with overlapping and adjacent spans.
    pub fn insert(&mut self, first: u16, last: u16) {
        if first > last {
            return;
        }
        // Spans ending before `first - 1` stay left; starting after
        // `last + 1` stay right; everything between merges.
        let lo = self
            .spans
            .partition_point(|s| u32::from(s.last) + 1 < u32::from(first));
        let hi = self
            .spans
            .partition_point(|s| u32::from(s.first) <= u32::from(last) + 1);
        let mut merged = Span::new(first, last);
        if lo < hi {
            merged.first = merged.first.min(self.spans[lo].first);
            merged.last = merged.last.max(self.spans[hi - 1].last);
        }
        self.spans.splice(lo..hi, [merged]);
    }

    /// Subtract `first..=last`.
    pub fn remove(&mut self, first: u16, last: u16) {
        if first > last {
            return;
        }
        let lo = self.spans.partition_point(|s| s.last < first);
        let hi = self.spans.partition_point(|s| s.first <= last);
        if lo >= hi {
            return;
        }
        let mut keep = Vec::with_capacity(2);
        let head = self.spans[lo];
        if head.first < first {
            keep.push(Span::new(head.first, first - 1));
        }
        let tail = self.spans[hi - 1];
        if tail.last > last {
            keep.push(Span::new(last + 1, tail.last));
        }
        self.spans.splice(lo..hi, keep);
    }
}

impl fmt::Debug for SpanSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(&self.spans).finish()
    }
}

// ─── TouchMap ───────────────────────────────────────────────────────────────

/// Per-row touched spans for a buffer of a given height.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TouchMap {
    rows: Vec<SpanSet>,
}

impl TouchMap {
    #[must_use]
    pub fn new(height: u16) -> Self {
        Self {
            rows: vec![SpanSet::default(); usize::from(height)],
        }
    }

    /// Change the number of rows. New rows start untouched.
    pub fn resize(&mut self, height: u16) {
        self.rows.resize(usize::from(height), SpanSet::default());
    }

    #[must_use]
    pub fn height(&self) -> u16 {
        u16::try_from(self.rows.len()).unwrap_or(u16::MAX)
    }

    /// Mark columns `x0..=x1` of row `y` changed. Out-of-range rows are
    /// ignored.
    pub fn touch(&mut self, y: u16, x0: u16, x1: u16) {
        if let Some(row) = self.rows.get_mut(usize::from(y)) {
            row.insert(x0, x1);
        }
    }

    /// Mark rows `y0..y1` changed across `width` columns.
    pub fn touch_rows(&mut self, y0: u16, y1: u16, width: u16) {
        if width == 0 {
            return;
        }
        for y in y0..y1 {
            self.touch(y, 0, width - 1);
        }
    }

    pub fn untouch(&mut self, y: u16, x0: u16, x1: u16) {
        if let Some(row) = self.rows.get_mut(usize::from(y)) {
            row.remove(x0, x1);
        }
    }

    /// Clear rows `y0..y1` entirely.
    pub fn untouch_rows(&mut self, y0: u16, y1: u16) {
        for y in y0..y1 {
            if let Some(row) = self.rows.get_mut(usize::from(y)) {
                row.clear();
            }
        }
    }

    #[must_use]
    pub fn is_touched(&self, y: u16) -> bool {
        self.rows.get(usize::from(y)).is_some_and(|r| !r.is_empty())
    }

    /// Whether row `y` has a touched column in `x0..=x1`.
    #[must_use]
    pub fn is_touched_in(&self, y: u16, x0: u16, x1: u16) -> bool {
        self.rows.get(usize::from(y)).is_some_and(|r| r.intersects(x0, x1))
    }

    #[must_use]
    pub fn spans(&self, y: u16) -> Option<&SpanSet> {
        self.rows.get(usize::from(y))
    }

    #[must_use]
    pub fn any_touched(&self) -> bool {
        self.rows.iter().any(|r| !r.is_empty())
    }
}

impl fmt::Debug for TouchMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.rows
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| !r.is_empty()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spans(s: &SpanSet) -> Vec<(u16, u16)> {
        s.iter().map(|s| (s.first, s.last)).collect()
    }

    // ── SpanSet ─────────────────────────────────────────────────────────

    #[test]
    fn insert_keeps_disjoint_order() {
        let mut s = SpanSet::default();
        s.insert(10, 12);
        s.insert(0, 1);
        s.insert(5, 6);
        assert_eq!(spans(&s), vec![(0, 1), (5, 6), (10, 12)]);
    }

    #[test]
    fn insert_merges_overlap_and_adjacency() {
        let mut s = SpanSet::default();
        s.insert(0, 1);
        s.insert(5, 6);
        s.insert(10, 12);
        s.insert(2, 9);
        assert_eq!(spans(&s), vec![(0, 12)]);
    }

    #[test]
    fn insert_at_u16_max() {
        let mut s = SpanSet::default();
        s.insert(u16::MAX - 1, u16::MAX);
        s.insert(0, u16::MAX - 2);
        assert_eq!(spans(&s), vec![(0, u16::MAX)]);
    }

    #[test]
    fn remove_splits() {
        let mut s = SpanSet::default();
        s.insert(0, 10);
        s.remove(3, 5);
        assert_eq!(spans(&s), vec![(0, 2), (6, 10)]);
    }

    #[test]
    fn remove_across_several_spans() {
        let mut s = SpanSet::default();
        s.insert(0, 2);
        s.insert(4, 6);
        s.insert(8, 10);
        s.remove(1, 9);
        assert_eq!(spans(&s), vec![(0, 0), (10, 10)]);
    }

    #[test]
    fn remove_everything() {
        let mut s = SpanSet::default();
        s.insert(3, 4);
        s.remove(0, u16::MAX);
        assert!(s.is_empty());
    }

    #[test]
    fn remove_gap_is_noop() {
        let mut s = SpanSet::default();
        s.insert(0, 1);
        s.insert(5, 6);
        s.remove(2, 4);
        assert_eq!(spans(&s), vec![(0, 1), (5, 6)]);
    }

    #[test]
    fn bounds_and_intersects() {
        let mut s = SpanSet::default();
        assert_eq!(s.bounds(), None);
        s.insert(2, 3);
        s.insert(8, 9);
        assert_eq!(s.bounds(), Some(Span::new(2, 9)));
        assert!(s.intersects(3, 5));
        assert!(!s.intersects(4, 7));
    }

    // ── TouchMap ────────────────────────────────────────────────────────

    #[test]
    fn touch_rows_and_untouch() {
        let mut t = TouchMap::new(3);
        assert!(!t.any_touched());
        t.touch_rows(0, 2, 5);
        assert!(t.is_touched(0) && t.is_touched(1) && !t.is_touched(2));
        t.untouch(0, 0, 4);
        assert!(!t.is_touched(0));
        t.untouch_rows(0, 3);
        assert!(!t.any_touched());
    }

    #[test]
    fn out_of_range_rows_ignored() {
        let mut t = TouchMap::new(2);
        t.touch(5, 0, 1);
        assert!(!t.any_touched());
        assert!(!t.is_touched(5));
    }

    #[test]
    fn resize_keeps_existing_rows() {
        let mut t = TouchMap::new(2);
        t.touch(1, 0, 0);
        t.resize(4);
        assert!(t.is_touched(1));
        assert!(!t.is_touched(3));
        t.resize(1);
        assert!(!t.any_touched());
    }
}
