// SPDX-License-Identifier: MIT
//
// Terminal color encodings.
//
// Curses speaks in numbered colors. Numbers 0..255 are the xterm palette,
// which every modern terminal supports; applications may also redefine a
// number to an arbitrary RGB value (init_color), which we emit as
// TrueColor. The terminal's own foreground/background is kept distinct as
// `Default` so programs can blend in with the user's theme.

use std::fmt;

// ─── CellColor ───────────────────────────────────────────────────────────────

/// Compact color as written to the terminal.
///
/// Small and cheap to compare; the refresh engine resolves every emitted
/// cell to a pair of these.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellColor {
    /// 24-bit `TrueColor`.
    Rgb(u8, u8, u8),

    /// ANSI 256-color palette index.
    Ansi256(u8),

    /// Terminal default color.
    #[default]
    Default,
}

impl CellColor {
    /// Build an RGB color from curses-scale components (0..=1000 each).
    ///
    /// Out-of-range components are clamped.
    ///
    /// ```
    /// use k_term::color::CellColor;
    ///
    /// assert_eq!(CellColor::from_curses_rgb(1000, 0, 500), CellColor::Rgb(255, 0, 128));
    /// assert_eq!(CellColor::from_curses_rgb(-5, 2000, 0), CellColor::Rgb(0, 255, 0));
    /// ```
    #[must_use]
    pub fn from_curses_rgb(r: i16, g: i16, b: i16) -> Self {
        Self::Rgb(scale_down(r), scale_down(g), scale_down(b))
    }

    /// 8-bit RGB components of this color. `None` for [`CellColor::Default`].
    #[must_use]
    pub fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Rgb(r, g, b) => Some((r, g, b)),
            Self::Ansi256(idx) => Some(ansi256_to_rgb(idx)),
            Self::Default => None,
        }
    }

    /// RGB components on the curses 0..=1000 scale.
    #[must_use]
    pub fn to_curses_rgb(self) -> Option<(i16, i16, i16)> {
        self.to_rgb()
            .map(|(r, g, b)| (scale_up(r), scale_up(g), scale_up(b)))
    }

    /// Downgrade to the 256-color palette for terminals without `TrueColor`.
    #[must_use]
    pub fn to_ansi256(self) -> Self {
        match self {
            Self::Rgb(r, g, b) => Self::Ansi256(nearest_ansi256(r, g, b)),
            other => other,
        }
    }

    /// Whether this is the terminal default color.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Debug for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Self::Ansi256(idx) => write!(f, "ansi({idx})"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl fmt::Display for CellColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn scale_down(v: i16) -> u8 {
    let v = i32::from(v.clamp(0, 1000));
    // Rounded: 1000 → 255, 500 → 128.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = ((v * 255 + 500) / 1000) as u8;
    out
}

fn scale_up(v: u8) -> i16 {
    #[allow(clippy::cast_possible_truncation)]
    let out = ((i32::from(v) * 1000 + 127) / 255) as i16;
    out
}

// ─── ANSI Palette ────────────────────────────────────────────────────────────
//
// Colors 0–7 standard, 8–15 bright, 16–231 a 6×6×6 cube, 232–255 grays.

/// The standard ANSI-16 palette as RGB values (xterm defaults).
pub const ANSI16_RGB: [(u8, u8, u8); 16] = [
    (0, 0, 0),       // 0: Black
    (128, 0, 0),     // 1: Red
    (0, 128, 0),     // 2: Green
    (128, 128, 0),   // 3: Yellow
    (0, 0, 128),     // 4: Blue
    (128, 0, 128),   // 5: Magenta
    (0, 128, 128),   // 6: Cyan
    (192, 192, 192), // 7: White
    (128, 128, 128), // 8: Bright Black
    (255, 0, 0),     // 9: Bright Red
    (0, 255, 0),     // 10: Bright Green
    (255, 255, 0),   // 11: Bright Yellow
    (0, 0, 255),     // 12: Bright Blue
    (255, 0, 255),   // 13: Bright Magenta
    (0, 255, 255),   // 14: Bright Cyan
    (255, 255, 255), // 15: Bright White
];

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// Convert an ANSI-256 palette index to RGB values.
#[must_use]
pub const fn ansi256_to_rgb(idx: u8) -> (u8, u8, u8) {
    match idx {
        0..=15 => ANSI16_RGB[idx as usize],
        16..=231 => {
            let idx = idx - 16;
            (
                CUBE_LEVELS[(idx / 36) as usize],
                CUBE_LEVELS[((idx % 36) / 6) as usize],
                CUBE_LEVELS[(idx % 6) as usize],
            )
        }
        232..=255 => {
            let v = 8 + 10 * (idx - 232);
            (v, v, v)
        }
    }
}

/// Find the palette index closest to an RGB value.
///
/// Uses squared distance weighted toward green, which tracks perceived
/// brightness well enough for palette fallback. Ties go to the lower index.
#[must_use]
pub fn nearest_ansi256(r: u8, g: u8, b: u8) -> u8 {
    let mut best_idx: u8 = 0;
    let mut best_dist = u32::MAX;

    for idx in 0u8..=255 {
        let (pr, pg, pb) = ansi256_to_rgb(idx);
        let dr = u32::from(r.abs_diff(pr));
        let dg = u32::from(g.abs_diff(pg));
        let db = u32::from(b.abs_diff(pb));
        let dist = 3 * dr * dr + 4 * dg * dg + 2 * db * db;
        if dist < best_dist {
            best_dist = dist;
            best_idx = idx;
            if dist == 0 {
                break;
            }
        }
    }

    best_idx
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_standard_colors() {
        assert_eq!(ansi256_to_rgb(0), (0, 0, 0));
        assert_eq!(ansi256_to_rgb(9), (255, 0, 0));
        assert_eq!(ansi256_to_rgb(15), (255, 255, 255));
    }

    #[test]
    fn ansi_color_cube() {
        assert_eq!(ansi256_to_rgb(16), (0, 0, 0));
        assert_eq!(ansi256_to_rgb(196), (255, 0, 0));
        assert_eq!(ansi256_to_rgb(231), (255, 255, 255));
        assert_eq!(ansi256_to_rgb(17), (0, 0, 95));
    }

    #[test]
    fn ansi_grayscale() {
        assert_eq!(ansi256_to_rgb(232), (8, 8, 8));
        assert_eq!(ansi256_to_rgb(255), (238, 238, 238));
    }

    #[test]
    fn nearest_exact_match() {
        assert_eq!(nearest_ansi256(0, 0, 0), 0);
        assert_eq!(nearest_ansi256(255, 0, 0), 9);
        assert_eq!(nearest_ansi256(0, 0, 95), 17);
    }

    #[test]
    fn nearest_close_match() {
        let idx = nearest_ansi256(250, 5, 5);
        assert_eq!(ansi256_to_rgb(idx), (255, 0, 0));
    }

    #[test]
    fn curses_scale_round_trip() {
        let c = CellColor::from_curses_rgb(1000, 0, 1000);
        assert_eq!(c, CellColor::Rgb(255, 0, 255));
        assert_eq!(c.to_curses_rgb(), Some((1000, 0, 1000)));
    }

    #[test]
    fn curses_scale_clamps() {
        assert_eq!(
            CellColor::from_curses_rgb(-1, 1001, 0),
            CellColor::Rgb(0, 255, 0)
        );
    }

    #[test]
    fn default_has_no_rgb() {
        assert!(CellColor::Default.to_rgb().is_none());
        assert!(CellColor::Default.is_default());
    }

    #[test]
    fn downgrade_rgb_to_palette() {
        assert_eq!(CellColor::Rgb(255, 0, 0).to_ansi256(), CellColor::Ansi256(9));
        assert_eq!(CellColor::Ansi256(3).to_ansi256(), CellColor::Ansi256(3));
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", CellColor::Rgb(255, 128, 0)), "#ff8000");
        assert_eq!(format!("{:?}", CellColor::Ansi256(42)), "ansi(42)");
        assert_eq!(format!("{}", CellColor::Default), "default");
    }
}
