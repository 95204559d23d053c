// SPDX-License-Identifier: MIT
//
// Mandelbrot math for the demo: the view rectangle, escape counts, and the
// color ramp. Nothing here touches the terminal.
//
// Each character cell shows two pixels stacked vertically (an upper-half
// block with fg = top pixel, bg = bottom pixel), so a cell that is twice as
// tall as it is wide maps to two square pixels.

/// First color index the ramp may redefine. 0 stays black for points
/// inside the set, 1 stays free for the status line.
pub const COLOR0: i16 = 2;

/// Iteration limit after a reset.
pub const DEFAULT_ITERATIONS: u32 = 256;

/// Pseudocolor stops, blue through red to white.
const STOPS: [(u8, u8, u8); 11] = [
    (0, 0, 64),
    (0, 0, 255),
    (0, 128, 255),
    (0, 255, 255),
    (0, 255, 128),
    (0, 255, 0),
    (128, 255, 0),
    (255, 255, 0),
    (255, 128, 0),
    (255, 0, 0),
    (255, 255, 255),
];

// ─── View ────────────────────────────────────────────────────────────────────

/// The visible part of the complex plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// Real coordinate at the middle of the drawing area.
    pub cx: f64,
    /// Imaginary coordinate at the middle of the drawing area.
    pub cy: f64,
    /// Plane units per pixel.
    pub scale: f64,
    pub max_iter: u32,
}

impl View {
    /// The whole set, fitted to `cols` columns.
    #[must_use]
    pub fn fit(cols: u16) -> Self {
        Self {
            cx: -0.5,
            cy: 0.0,
            scale: 4.0 / f64::from(cols.max(1)),
            max_iter: DEFAULT_ITERATIONS,
        }
    }

    /// Plane coordinates of pixel `(px, py)` in a `cols` x `rows` pixel grid.
    #[must_use]
    pub fn point(&self, px: u16, py: u16, cols: u16, rows: u16) -> (f64, f64) {
        let dx = f64::from(px) - f64::from(cols) / 2.0;
        let dy = f64::from(py) - f64::from(rows) / 2.0;
        (self.cx + dx * self.scale, self.cy + dy * self.scale)
    }

    /// Shift by whole pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.cx += dx * self.scale;
        self.cy += dy * self.scale;
    }

    /// Scale by `factor` (below 1 zooms in) keeping pixel `(px, py)` fixed.
    pub fn zoom_at(&mut self, factor: f64, px: u16, py: u16, cols: u16, rows: u16) {
        let (x, y) = self.point(px, py, cols, rows);
        self.scale *= factor;
        let (nx, ny) = self.point(px, py, cols, rows);
        self.cx += x - nx;
        self.cy += y - ny;
    }

    /// Move pixel `(px, py)` to the middle.
    pub fn recenter(&mut self, px: u16, py: u16, cols: u16, rows: u16) {
        let (x, y) = self.point(px, py, cols, rows);
        self.cx = x;
        self.cy = y;
    }

    /// Magnification relative to [`View::fit`].
    #[must_use]
    pub fn zoom(&self, cols: u16) -> f64 {
        Self::fit(cols).scale / self.scale
    }

    /// Escape counts for every pixel, row-major.
    #[must_use]
    pub fn render(&self, cols: u16, rows: u16) -> Vec<u32> {
        let mut out = Vec::with_capacity(usize::from(cols) * usize::from(rows));
        for py in 0..rows {
            for px in 0..cols {
                let (x, y) = self.point(px, py, cols, rows);
                out.push(escape(x, y, self.max_iter));
            }
        }
        out
    }
}

// ─── Iteration ───────────────────────────────────────────────────────────────

/// Iterations before `z = z² + c` leaves the radius-2 disc, or `max_iter`
/// if it never does.
#[must_use]
pub fn escape(cx: f64, cy: f64, max_iter: u32) -> u32 {
    let (mut zr, mut zi) = (0.0_f64, 0.0_f64);
    for i in 0..max_iter {
        let (zr2, zi2) = (zr * zr, zi * zi);
        if zr2 + zi2 > 4.0 {
            return i;
        }
        zi = 2.0 * zr * zi + cy;
        zr = zr2 - zi2 + cx;
    }
    max_iter
}

// ─── Colors ──────────────────────────────────────────────────────────────────

/// How many ramp colors fit: at most `colors - COLOR0`, and few enough that
/// every unordered pair of them (plus black) gets its own color pair.
#[must_use]
pub fn ramp_len(colors: u16, pairs: u16) -> u16 {
    let by_colors = colors.saturating_sub(COLOR0.unsigned_abs());
    // Pair 0 is fixed; the rest must hold every unordered pair of ramp
    // colors and black.
    let budget = u32::from(pairs.saturating_sub(1));
    let mut n: u16 = 0;
    while n < by_colors && (u32::from(n) + 2) * (u32::from(n) + 3) / 2 <= budget {
        n += 1;
    }
    n
}

/// Ramp color `i` of `n` as curses RGB (0..=1000 per channel).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ramp_rgb(i: u16, n: u16) -> (i16, i16, i16) {
    let last = STOPS.len() - 1;
    let t = if n <= 1 {
        0.0
    } else {
        f64::from(i.min(n - 1)) / f64::from(n - 1) * last as f64
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = (t.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let frac = t - lo as f64;
    let mix = |a: u8, b: u8| {
        let v = f64::from(a) + (f64::from(b) - f64::from(a)) * frac;
        #[allow(clippy::cast_possible_truncation)]
        let scaled = (v * 1000.0 / 255.0).round() as i16;
        scaled.clamp(0, 1000)
    };
    let (a, b) = (STOPS[lo], STOPS[hi]);
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Color index for an escape count, rotated by `shift`. Points that never
/// escape are black.
#[must_use]
pub fn color_for(iter: u32, max_iter: u32, n: u16, shift: u32) -> i16 {
    if iter >= max_iter || n == 0 {
        return 0;
    }
    let slot = iter.wrapping_add(shift) % u32::from(n);
    COLOR0 + i16::try_from(slot).unwrap_or(0)
}

/// Glyph and `(fg, bg)` for a cell whose top and bottom pixels are
/// `top` and `bottom`. The pair is always ordered low-high so mirrored
/// cells share one color pair.
#[must_use]
pub const fn half_block(top: i16, bottom: i16) -> (char, i16, i16) {
    if top <= bottom {
        ('\u{2580}', top, bottom)
    } else {
        ('\u{2584}', bottom, top)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
