// SPDX-License-Identifier: MIT
//
// Glyph: a fully resolved cell, ready for the terminal.
//
// The curses core stores cells as (character, attributes, color-pair
// index). Pair indices mean nothing to a terminal, so at emission time
// the refresh engine resolves each cell through the color-pair table into
// a Glyph: character, optional combining mark, concrete foreground and
// background colors, and attributes.
//
// Wide characters (CJK, some emoji) occupy two columns. The first glyph
// holds the codepoint; the second is a continuation glyph (ch = 0). The
// writer skips continuation glyphs that directly follow their owner.

use crate::color::CellColor;

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// Everything except [`ALTCHARSET`](Attr::ALTCHARSET) maps to an SGR
    /// parameter. `ALTCHARSET` selects the line-drawing character set: the
    /// writer substitutes box-drawing characters for the VT100 letters.
    ///
    /// ```
    /// use k_term::glyph::Attr;
    ///
    /// let style = Attr::BOLD | Attr::REVERSE;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::UNDERLINE));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u16 {
        /// SGR 1: increased intensity.
        const BOLD          = 1 << 0;
        /// SGR 2: decreased intensity.
        const DIM           = 1 << 1;
        /// SGR 3: italic.
        const ITALIC        = 1 << 2;
        /// SGR 4: underline.
        const UNDERLINE     = 1 << 3;
        /// SGR 5: blink.
        const BLINK         = 1 << 4;
        /// SGR 7: swap foreground and background.
        const REVERSE       = 1 << 5;
        /// SGR 8: invisible text.
        const INVISIBLE     = 1 << 6;
        /// SGR 9: crossed-out text.
        const STRIKETHROUGH = 1 << 7;
        /// Alternate (line-drawing) character set. No SGR code.
        const ALTCHARSET    = 1 << 8;
    }
}

impl Attr {
    /// The attributes that translate to SGR parameters.
    #[inline]
    #[must_use]
    pub const fn sgr(self) -> Self {
        self.difference(Self::ALTCHARSET)
    }
}

// ─── Glyph ───────────────────────────────────────────────────────────────────

/// A single resolved terminal cell.
///
/// # Layout (20 bytes)
///
/// ```text
/// ┌──────────┬──────────┬──────────┬──────────┬───────┐
/// │ ch: u32  │ mark: u32│ fg: Cell │ bg: Cell │ attrs │
/// │          │          │  Color   │  Color   │  u16  │
/// └──────────┴──────────┴──────────┴──────────┴───────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Unicode codepoint to display. `0` marks a continuation glyph.
    pub ch: u32,
    /// Combining mark drawn over `ch`, or `0` for none.
    pub mark: u32,
    /// Foreground (text) color.
    pub fg: CellColor,
    /// Background color.
    pub bg: CellColor,
    /// Text attributes.
    pub attrs: Attr,
}

const CONTINUATION: u32 = 0;
const SPACE: u32 = b' ' as u32;

impl Glyph {
    /// A space with default colors and no attributes.
    pub const EMPTY: Self = Self {
        ch: SPACE,
        mark: 0,
        fg: CellColor::Default,
        bg: CellColor::Default,
        attrs: Attr::empty(),
    };

    /// A glyph with a character and default styling.
    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch: ch as u32,
            ..Self::EMPTY
        }
    }

    /// A glyph with full styling.
    #[inline]
    #[must_use]
    pub const fn styled(ch: char, fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self {
            ch: ch as u32,
            mark: 0,
            fg,
            bg,
            attrs,
        }
    }

    /// The trailing column of a wide character, carrying its owner's style
    /// so an orphaned continuation still fills with the right background.
    #[inline]
    #[must_use]
    pub const fn continuation(fg: CellColor, bg: CellColor, attrs: Attr) -> Self {
        Self {
            ch: CONTINUATION,
            mark: 0,
            fg,
            bg,
            attrs,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }

    /// The codepoint as a `char`; `None` for continuation glyphs and
    /// invalid scalar values.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == CONTINUATION {
            return None;
        }
        char::from_u32(self.ch)
    }

    /// The combining mark, if any.
    #[inline]
    #[must_use]
    pub const fn combining(self) -> Option<char> {
        if self.mark == 0 {
            return None;
        }
        char::from_u32(self.mark)
    }

    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: CellColor) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: CellColor) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_mark(self, mark: char) -> Self {
        Self {
            mark: mark as u32,
            ..self
        }
    }

    /// Whether two glyphs share colors and attributes, ignoring content.
    #[inline]
    #[must_use]
    pub fn same_style(self, other: &Self) -> bool {
        self.fg == other.fg && self.bg == other.bg && self.attrs == other.attrs
    }
}

impl Default for Glyph {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for Glyph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_continuation() {
            return write!(f, "Glyph(continuation)");
        }
        let ch = char::from_u32(self.ch).unwrap_or('?');
        write!(f, "Glyph({ch:?}")?;
        if let Some(mark) = self.combining() {
            write!(f, "+{mark:?}")?;
        }
        if self.fg != CellColor::Default {
            write!(f, ", fg={:?}", self.fg)?;
        }
        if self.bg != CellColor::Default {
            write!(f, ", bg={:?}", self.bg)?;
        }
        if !self.attrs.is_empty() {
            write!(f, ", {:?}", self.attrs)?;
        }
        write!(f, ")")
    }
}

// ─── Line Drawing ────────────────────────────────────────────────────────────

/// Map a VT100 alternate-character-set letter to its Unicode equivalent.
///
/// Characters without a line-drawing meaning are returned unchanged, so
/// `ALTCHARSET` on ordinary text is harmless.
#[must_use]
pub const fn acs_to_unicode(ch: char) -> char {
    match ch {
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'q' => '─',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'a' => '▒',
        '`' => '◆',
        'f' => '°',
        'g' => '±',
        '~' => '·',
        '0' => '█',
        'h' => '░',
        ',' => '◀',
        '+' => '▶',
        '.' => '▼',
        '-' => '▲',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        'o' => '⎺',
        's' => '⎽',
        other => other,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_glyph_is_space() {
        let g = Glyph::default();
        assert_eq!(g.character(), Some(' '));
        assert_eq!(g.fg, CellColor::Default);
        assert!(g.attrs.is_empty());
    }

    #[test]
    fn continuation_has_no_character() {
        let g = Glyph::continuation(CellColor::Default, CellColor::Ansi256(4), Attr::BOLD);
        assert!(g.is_continuation());
        assert!(g.character().is_none());
        assert_eq!(g.bg, CellColor::Ansi256(4));
    }

    #[test]
    fn mark_round_trips_through_builder() {
        let g = Glyph::new('e').with_mark('\u{301}');
        assert_eq!(g.combining(), Some('\u{301}'));
        assert!(format!("{g:?}").contains("'\\u{301}'"));
    }

    #[test]
    fn sgr_drops_altcharset() {
        let a = Attr::BOLD | Attr::ALTCHARSET;
        assert_eq!(a.sgr(), Attr::BOLD);
    }

    #[test]
    fn same_style_ignores_character() {
        let a = Glyph::new('a').with_fg(CellColor::Ansi256(1));
        let b = Glyph::new('b').with_fg(CellColor::Ansi256(1));
        assert!(a.same_style(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn acs_maps_box_corners() {
        assert_eq!(acs_to_unicode('l'), '┌');
        assert_eq!(acs_to_unicode('q'), '─');
        assert_eq!(acs_to_unicode('A'), 'A');
    }

    #[test]
    fn debug_continuation() {
        let g = Glyph::continuation(CellColor::Default, CellColor::Default, Attr::empty());
        assert_eq!(format!("{g:?}"), "Glyph(continuation)");
    }
}
