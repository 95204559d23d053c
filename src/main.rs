// SPDX-License-Identifier: MIT
//
// kurses: a color-pair Mandelbrot explorer built on k-screen.
//
// Every cell is a half block whose two colors come from `alloc_pair`, so a
// deep zoom asks for far more pairs than the terminal has and the pair
// table recycles the least recently used ones. The ramp rotates one step
// per input timeout, which rewrites every cell on every tick and keeps the
// refresh engine busy.
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ status line (REVERSE)        │  ← row 0
//   ├──────────────────────────────┤
//   │ set, two pixels per cell     │  ← LINES - 2 rows
//   ├──────────────────────────────┤
//   │ key help                     │  ← last row
//   └──────────────────────────────┘

mod mandelbrot;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use k_screen::{
    AnsiBackend, Attr, Backend, Cell, Config, Event, Key, MouseAction, MouseEvent, MouseMask,
    Session,
};

use mandelbrot::{COLOR0, View, color_for, half_block, ramp_len, ramp_rgb};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "kurses=info,k_screen=debug";

/// Scale factor for `+`/`-`.
const ZOOM_STEP: f64 = 1.5;

/// Scale factor per wheel notch.
const WHEEL_STEP: f64 = 1.1;

const MIN_ITERATIONS: u32 = 16;
const MAX_ITERATIONS: u32 = 1 << 16;

const HELP: &str = " arrows pan  +/- zoom  * / iterations  Home reset view  r reset pairs  q quit";

// ─── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "kurses", version, about = "Color-pair Mandelbrot explorer")]
struct Cli {
    /// Config file. Defaults to $KURSES_CONFIG, then ./kurses.toml.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Append logs to this file. Filter with RUST_LOG.
    #[arg(long, value_name = "FILE", env = "KURSES_LOG")]
    log: Option<PathBuf>,

    /// Milliseconds between color-cycle steps.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    tick: u16,
}

/// Install a file subscriber. Nothing is logged without a path: stdout is
/// the screen.
fn init_logging(path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))?;
    Ok(Some(guard))
}

// ─── Explorer ────────────────────────────────────────────────────────────────

/// What the main loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Explorer {
    view: View,
    /// Ramp colors defined from `COLOR0` up.
    ramp: u16,
    /// Current ramp rotation.
    shift: u32,
    /// Escape counts for `grid`, row-major.
    iters: Vec<u32>,
    /// Pixel size `iters` was computed for.
    grid: (u16, u16),
    stale: bool,
}

impl Explorer {
    /// Define the ramp colors and fit the view to the screen.
    fn new<B: Backend>(session: &mut Session<B>) -> Result<Self> {
        let ramp = ramp_len(session.colors(), session.color_pairs());
        for i in 0..ramp {
            let (r, g, b) = ramp_rgb(i, ramp);
            let id = COLOR0 + i16::try_from(i).context("ramp index")?;
            session
                .init_color(id, r, g, b)
                .with_context(|| format!("defining color {id}"))?;
        }
        debug!(ramp, pairs = session.color_pairs(), "palette ready");
        Ok(Self {
            view: View::fit(session.cols()),
            ramp,
            shift: 0,
            iters: Vec::new(),
            grid: (0, 0),
            stale: true,
        })
    }

    /// Pixel grid of the drawing area.
    fn grid_of<B: Backend>(session: &Session<B>) -> (u16, u16) {
        (session.cols(), session.lines().saturating_sub(2) * 2)
    }

    fn advance(&mut self) {
        self.shift = self.shift.wrapping_add(1);
    }

    // ── Drawing ──

    fn draw<B: Backend>(&mut self, session: &mut Session<B>) -> Result<()> {
        let grid = Self::grid_of(session);
        if self.stale || self.grid != grid {
            self.iters = self.view.render(grid.0, grid.1);
            self.grid = grid;
            self.stale = false;
        }
        let (cols, rows) = grid;
        let width = usize::from(cols);
        let max_iter = self.view.max_iter;

        for line in 0..rows / 2 {
            session.stdscr_mut().move_cursor(line + 1, 0);
            let top_row = usize::from(line) * 2 * width;
            for px in 0..width {
                let top = color_for(self.iters[top_row + px], max_iter, self.ramp, self.shift);
                let bottom = color_for(
                    self.iters[top_row + width + px],
                    max_iter,
                    self.ramp,
                    self.shift,
                );
                let (ch, fg, bg) = half_block(top, bottom);
                let pair = session.alloc_pair(fg, bg)?;
                session
                    .stdscr_mut()
                    .add_cell(Cell::styled(ch, Attr::empty(), pair));
            }
        }

        self.draw_status(session);
        Ok(())
    }

    fn draw_status<B: Backend>(&self, session: &mut Session<B>) {
        let status = format!(
            " x {:+.10}  y {:+.10}  iter {}  zoom {:.1}x  pairs {}/{}",
            self.view.cx,
            self.view.cy,
            self.view.max_iter,
            self.view.zoom(session.cols()),
            session.pairs_in_use(),
            session.color_pairs().saturating_sub(1),
        );
        let lines = session.lines();
        let width = usize::from(session.cols());
        let win = session.stdscr_mut();

        // Padded rather than cleared: a full-width write leaves the cursor
        // on the next row, or stuck on the last cell of the screen.
        win.set_attrs(Attr::REVERSE);
        win.move_cursor(0, 0);
        win.add_nstr(&format!("{status:<width$}"), width);
        win.set_attrs(Attr::empty());

        if lines > 1 {
            win.move_cursor(lines - 1, 0);
            win.add_nstr(&format!("{HELP:<width$}"), width);
        }
    }

    // ── Input ──

    fn handle<B: Backend>(&mut self, session: &mut Session<B>, event: Event) -> Result<Flow> {
        let (cols, rows) = Self::grid_of(session);
        let (dx, dy) = (f64::from(cols) / 4.0, f64::from(rows) / 4.0);

        match event {
            Event::Char('q' | 'Q' | '\x1b') => return Ok(Flow::Quit),
            Event::Key(Key::Left) => self.view.pan(-dx, 0.0),
            Event::Key(Key::Right) => self.view.pan(dx, 0.0),
            Event::Key(Key::Up) => self.view.pan(0.0, -dy),
            Event::Key(Key::Down) => self.view.pan(0.0, dy),
            Event::Char('+') => {
                self.view
                    .zoom_at(1.0 / ZOOM_STEP, cols / 2, rows / 2, cols, rows);
            }
            Event::Char('-') => self.view.zoom_at(ZOOM_STEP, cols / 2, rows / 2, cols, rows),
            Event::Char('*') => {
                self.view.max_iter = (self.view.max_iter * 2).min(MAX_ITERATIONS);
            }
            Event::Char('/') => {
                self.view.max_iter = (self.view.max_iter / 2).max(MIN_ITERATIONS);
            }
            Event::Key(Key::Home) => self.view = View::fit(cols),
            Event::Char('r') => {
                session.reset_color_pairs();
                return Ok(Flow::Continue);
            }
            Event::Mouse(mouse) => {
                if !self.handle_mouse(mouse, cols, rows) {
                    return Ok(Flow::Continue);
                }
            }
            Event::Resize => {
                session.resize_term(0, 0).context("resizing")?;
                info!(lines = session.lines(), cols = session.cols(), "resized");
            }
            _ => return Ok(Flow::Continue),
        }
        self.stale = true;
        Ok(Flow::Continue)
    }

    /// Wheel zooms around the pointer, a click recenters on it. Returns
    /// whether the view moved.
    fn handle_mouse(&mut self, mouse: MouseEvent, cols: u16, rows: u16) -> bool {
        // Row 0 is the status line; each cell row holds two pixel rows.
        let Some(line) = mouse.y.checked_sub(1) else {
            return false;
        };
        let (px, py) = (mouse.x, line.saturating_mul(2));
        if px >= cols || py >= rows {
            return false;
        }
        match mouse.action {
            MouseAction::WheelUp => self.view.zoom_at(1.0 / WHEEL_STEP, px, py, cols, rows),
            MouseAction::WheelDown => self.view.zoom_at(WHEEL_STEP, px, py, cols, rows),
            MouseAction::Clicked => self.view.recenter(px, py, cols, rows),
            _ => return false,
        }
        true
    }
}

/// Draw, refresh, and read until the user quits.
fn explore<B: Backend>(session: &mut Session<B>, tick_ms: u16) -> Result<()> {
    session.timeout(i32::from(tick_ms));
    session.mouse_mask(MouseMask::CLICKED | MouseMask::WHEEL_UP | MouseMask::WHEEL_DOWN)?;
    // Terminals without cursor control just keep the cursor.
    let _ = session.curs_set(0);

    let mut explorer = Explorer::new(session)?;
    loop {
        explorer.draw(session)?;
        session.refresh().context("refreshing")?;
        match session.getch().context("reading input")? {
            None => explorer.advance(),
            Some(event) => {
                if explorer.handle(session, event)? == Flow::Quit {
                    return Ok(());
                }
            }
        }
    }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn run(cli: &Cli) -> Result<()> {
    let _guard = init_logging(cli.log.as_deref())?;

    let config = match &cli.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::discover().context("loading config")?,
    };

    let mut session = Session::init_or_exit(AnsiBackend::new(), &config);
    info!(
        version = session.version(),
        lines = session.lines(),
        cols = session.cols(),
        colors = session.colors(),
        "started"
    );

    let result = explore(&mut session, cli.tick);
    let ended = session.teardown().context("restoring the terminal");
    result?;
    ended
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("kurses: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
