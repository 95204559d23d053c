// SPDX-License-Identifier: MIT
//
// Palette: what each color number means.
//
// Color numbers below 256 start out as the terminal's own palette
// entries. `init_color` rebinds a number to an exact RGB value, which is
// then sent as TrueColor. Number -1 is the terminal's default color.

use k_term::color::CellColor;

use crate::error::{Error, Result};

/// The terminal default color.
pub const DEFAULT_COLOR: i16 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<CellColor>,
}

impl Palette {
    /// A palette of `count` colors (at most `i16::MAX`).
    #[must_use]
    pub fn new(count: u16) -> Self {
        let count = count.min(i16::MAX.unsigned_abs());
        let colors = (0..count)
            .map(|id| {
                u8::try_from(id).map_or(CellColor::Rgb(0, 0, 0), CellColor::Ansi256)
            })
            .collect();
        Self { colors }
    }

    /// Number of color numbers available (COLORS).
    #[must_use]
    pub fn len(&self) -> u16 {
        u16::try_from(self.colors.len()).unwrap_or(u16::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Whether `id` names a color here, counting the default color.
    #[must_use]
    pub fn contains(&self, id: i16) -> bool {
        id == DEFAULT_COLOR || usize::try_from(id).is_ok_and(|i| i < self.colors.len())
    }

    /// Terminal color for `id`. Unknown ids fall back to the default color.
    #[must_use]
    pub fn resolve(&self, id: i16) -> CellColor {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.colors.get(i))
            .copied()
            .unwrap_or(CellColor::Default)
    }

    /// Rebind `id` to an RGB value given in 0..=1000 components.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidColor`] if `id` is not a color number here.
    pub fn init_color(&mut self, id: i16, r: i16, g: i16, b: i16) -> Result<()> {
        let slot = usize::try_from(id)
            .ok()
            .and_then(|i| self.colors.get_mut(i))
            .ok_or(Error::InvalidColor(id))?;
        *slot = CellColor::from_curses_rgb(r, g, b);
        Ok(())
    }

    /// RGB components of `id` in 0..=1000. `None` for unknown ids and for
    /// the default color.
    #[must_use]
    pub fn color_content(&self, id: i16) -> Option<(i16, i16, i16)> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.colors.get(i))
            .and_then(|c| c.to_curses_rgb())
    }
}
