// SPDX-License-Identifier: MIT
//
// Cell: one character position in a window or screen image.
//
// Unlike the terminal layer's `Glyph`, a cell does not know its colors.
// It names a color pair, and the pair is looked up when the cell is
// finally sent to the terminal. That indirection is what lets
// `reset_color_pairs` or a pair redefinition recolor everything already
// drawn without touching a single cell.

use std::fmt;

use k_term::glyph::Attr;
use unicode_width::UnicodeWidthChar;

/// A stored cell.
///
/// `ch == 0` marks the trailing column of a double-width character. Such
/// continuation cells copy the attributes and pair of their owner.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub ch: u32,
    /// Zero-width combining mark drawn over `ch`, `0` for none.
    pub mark: u32,
    pub attrs: Attr,
    pub pair: u16,
}

const SPACE: u32 = b' ' as u32;

impl Cell {
    /// A space, no attributes, pair 0.
    pub const BLANK: Self = Self {
        ch: SPACE,
        mark: 0,
        attrs: Attr::empty(),
        pair: 0,
    };

    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch: ch as u32,
            ..Self::BLANK
        }
    }

    #[inline]
    #[must_use]
    pub const fn styled(ch: char, attrs: Attr, pair: u16) -> Self {
        Self {
            ch: ch as u32,
            mark: 0,
            attrs,
            pair,
        }
    }

    /// The continuation cell that follows `owner`.
    #[inline]
    #[must_use]
    pub const fn continuation_of(owner: Self) -> Self {
        Self {
            ch: 0,
            mark: 0,
            ..owner
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == 0
    }

    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == 0 {
            return None;
        }
        char::from_u32(self.ch)
    }

    /// Display columns the character occupies: 0 for continuations, 2 for
    /// wide characters, 1 otherwise.
    #[must_use]
    pub fn width(self) -> u16 {
        match self.character() {
            None => 0,
            Some(c) if c.width() == Some(2) => 2,
            Some(_) => 1,
        }
    }

    /// The same style with a space in place of the character.
    #[inline]
    #[must_use]
    pub const fn blanked(self) -> Self {
        Self {
            ch: SPACE,
            mark: 0,
            ..self
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_pair(self, pair: u16) -> Self {
        Self { pair, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_mark(self, mark: char) -> Self {
        Self {
            mark: mark as u32,
            ..self
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.character() {
            None => write!(f, "Cell(cont")?,
            Some(c) => write!(f, "Cell({c:?}")?,
        }
        if self.mark != 0 {
            write!(f, "+{:?}", char::from_u32(self.mark).unwrap_or('?'))?;
        }
        if !self.attrs.is_empty() {
            write!(f, ", {:?}", self.attrs)?;
        }
        if self.pair != 0 {
            write!(f, ", pair {}", self.pair)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_default() {
        assert_eq!(Cell::default(), Cell::BLANK);
        assert_eq!(Cell::BLANK.character(), Some(' '));
    }

    #[test]
    fn widths() {
        assert_eq!(Cell::new('a').width(), 1);
        assert_eq!(Cell::new('中').width(), 2);
        assert_eq!(Cell::continuation_of(Cell::new('中')).width(), 0);
    }

    #[test]
    fn continuation_keeps_style() {
        let owner = Cell::styled('中', Attr::BOLD, 3);
        let cont = Cell::continuation_of(owner);
        assert!(cont.is_continuation());
        assert_eq!(cont.attrs, Attr::BOLD);
        assert_eq!(cont.pair, 3);
    }

    #[test]
    fn blanked_keeps_style() {
        let c = Cell::styled('x', Attr::REVERSE, 2).with_mark('\u{301}').blanked();
        assert_eq!(c, Cell::styled(' ', Attr::REVERSE, 2));
    }

    #[test]
    fn debug_is_compact() {
        assert_eq!(format!("{:?}", Cell::new('a')), "Cell('a')");
        assert_eq!(format!("{:?}", Cell::new('a').with_pair(4)), "Cell('a', pair 4)");
    }
}
