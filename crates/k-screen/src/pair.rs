// SPDX-License-Identifier: MIT
//
// Color-pair table.
//
// Cells name a pair index; the table maps each index to a (foreground,
// background) pair of color numbers. Pair 0 is the default pair and
// always exists. Indices 1.. are claimed explicitly (`init`) or on demand
// (`alloc`).
//
// `alloc` is built for programs that ask for the pair they need every
// time they draw: asking again for an existing combination returns the
// same index, a new combination takes the lowest free index, and a full
// table recycles its least recently used entry. Given the same request
// sequence the outcome is always the same.
//
// Freeing or resetting never rewrites cells. A cell whose pair is no
// longer live is drawn with pair 0 until it is rewritten; if the index
// is claimed again first, the cell shows the new pair's colors.

use std::collections::{BTreeSet, HashMap};

use k_term::color::CellColor;
use tracing::debug;

use crate::error::{Error, Result};
use crate::palette::{DEFAULT_COLOR, Palette};

/// One live table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairEntry {
    pub fg: i16,
    pub bg: i16,
    /// Logical time of the last `alloc`/`init` that returned this entry.
    last_used: u64,
}

#[derive(Debug, Clone)]
pub struct PairTable {
    default: (i16, i16),
    /// Index 0 is unused; pair 0 lives in `default`.
    slots: Vec<Option<PairEntry>>,
    lookup: HashMap<(i16, i16), u16>,
    free: BTreeSet<u16>,
    colors: u16,
    clock: u64,
}

impl PairTable {
    /// A table with `capacity` pairs (counting pair 0) over `colors`
    /// color numbers.
    #[must_use]
    pub fn new(capacity: u16, colors: u16) -> Self {
        let capacity = capacity.max(1);
        Self {
            default: (DEFAULT_COLOR, DEFAULT_COLOR),
            slots: vec![None; usize::from(capacity)],
            lookup: HashMap::new(),
            free: (1..capacity).collect(),
            colors,
            clock: 0,
        }
    }

    /// Number of pair indices, counting pair 0 (COLOR_PAIRS).
    #[must_use]
    pub fn capacity(&self) -> u16 {
        u16::try_from(self.slots.len()).unwrap_or(u16::MAX)
    }

    /// Live entries, not counting pair 0.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.slots.len() - 1 - self.free.len()
    }

    #[must_use]
    pub fn is_live(&self, idx: u16) -> bool {
        idx == 0 || self.entry(idx).is_some()
    }

    fn entry(&self, idx: u16) -> Option<&PairEntry> {
        self.slots.get(usize::from(idx)).and_then(Option::as_ref)
    }

    fn check_color(&self, id: i16) -> Result<()> {
        let known = id == DEFAULT_COLOR || u16::try_from(id).is_ok_and(|i| i < self.colors);
        if known { Ok(()) } else { Err(Error::InvalidColor(id)) }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    // ─── Allocation ──────────────────────────────────────────────────────

    /// The index for `(fg, bg)`, claiming or recycling one if needed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidColor`] for an unknown color number,
    /// [`Error::NoPairsAvailable`] if the table has only pair 0.
    pub fn alloc(&mut self, fg: i16, bg: i16) -> Result<u16> {
        self.check_color(fg)?;
        self.check_color(bg)?;

        if let Some(&idx) = self.lookup.get(&(fg, bg)) {
            let now = self.tick();
            if let Some(Some(entry)) = self.slots.get_mut(usize::from(idx)) {
                entry.last_used = now;
            }
            return Ok(idx);
        }

        let idx = match self.free.pop_first() {
            Some(idx) => idx,
            None => {
                let victim = self.least_recently_used().ok_or(Error::NoPairsAvailable)?;
                debug!(target: "k_screen::pair", pair = victim, fg, bg, "recycling color pair");
                self.unlink(victim);
                victim
            }
        };
        self.link(idx, fg, bg);
        Ok(idx)
    }

    fn least_recently_used(&self) -> Option<u16> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|e| (e.last_used, i)))
            .min()
            .and_then(|(_, i)| u16::try_from(i).ok())
    }

    /// Install `(fg, bg)` at a slot known to be vacant.
    fn link(&mut self, idx: u16, fg: i16, bg: i16) {
        let last_used = self.tick();
        self.slots[usize::from(idx)] = Some(PairEntry { fg, bg, last_used });
        self.free.remove(&idx);
        self.lookup.entry((fg, bg)).or_insert(idx);
    }

    /// Vacate a live slot, keeping `lookup` pointing at a surviving
    /// duplicate if `init` created one.
    fn unlink(&mut self, idx: u16) {
        let Some(entry) = self.slots[usize::from(idx)].take() else {
            return;
        };
        let key = (entry.fg, entry.bg);
        if self.lookup.get(&key) == Some(&idx) {
            self.lookup.remove(&key);
            let twin = self
                .slots
                .iter()
                .position(|s| s.is_some_and(|e| (e.fg, e.bg) == key));
            if let Some(twin) = twin.and_then(|i| u16::try_from(i).ok()) {
                self.lookup.insert(key, twin);
            }
        }
        self.free.insert(idx);
    }

    /// Release `idx`. Returns `false` for pair 0 and for indices that were
    /// not live.
    pub fn free(&mut self, idx: u16) -> bool {
        if idx == 0 || self.entry(idx).is_none() {
            return false;
        }
        self.unlink(idx);
        true
    }

    /// The live index holding `(fg, bg)`, without touching recency.
    #[must_use]
    pub fn find(&self, fg: i16, bg: i16) -> Option<u16> {
        self.lookup.get(&(fg, bg)).copied()
    }

    /// Release every pair except pair 0.
    pub fn reset(&mut self) {
        debug!(target: "k_screen::pair", released = self.in_use(), "resetting color pairs");
        self.slots.fill(None);
        self.lookup.clear();
        self.free = (1..self.capacity()).collect();
    }

    // ─── Explicit Definition ─────────────────────────────────────────────

    /// Define pair `idx` (init_pair). Redefining a live pair replaces it.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPair`] for 0 or an index past the table,
    /// [`Error::InvalidColor`] for an unknown color number.
    pub fn init(&mut self, idx: u16, fg: i16, bg: i16) -> Result<()> {
        if idx == 0 || idx >= self.capacity() {
            return Err(Error::InvalidPair(idx));
        }
        self.check_color(fg)?;
        self.check_color(bg)?;
        self.unlink(idx);
        self.link(idx, fg, bg);
        Ok(())
    }

    /// Colors of pair 0 (assume_default_colors).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidColor`] for an unknown color number.
    pub fn set_default(&mut self, fg: i16, bg: i16) -> Result<()> {
        self.check_color(fg)?;
        self.check_color(bg)?;
        self.default = (fg, bg);
        Ok(())
    }

    /// `(fg, bg)` of a live pair.
    #[must_use]
    pub fn content(&self, idx: u16) -> Option<(i16, i16)> {
        if idx == 0 {
            return Some(self.default);
        }
        self.entry(idx).map(|e| (e.fg, e.bg))
    }

    /// Terminal colors for `idx`; indices that are not live resolve as
    /// pair 0.
    #[must_use]
    pub fn resolve(&self, idx: u16, palette: &Palette) -> (CellColor, CellColor) {
        let (fg, bg) = self.content(idx).unwrap_or(self.default);
        (palette.resolve(fg), palette.resolve(bg))
    }
}
