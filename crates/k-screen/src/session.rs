// SPDX-License-Identifier: MIT
//
// Session: one live curses screen.
//
// A `Session` owns the backend, the screen images, the standard window,
// the color-pair table and the input queue. At most one exists per
// process at a time: `init` claims a process-wide flag and `Drop` releases
// it, so a second `init` while one is live fails with `AlreadyActive`.
//
// `end` hands the display back (endwin) without destroying anything; the
// next refresh takes it over again and repaints everything.

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use k_term::terminal::Size;
use tracing::{debug, warn};

use crate::backend::{Backend, RawEvent};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::input::{Event, InputMode, InputQueue, MouseMask, Normalizer};
use crate::pair::PairTable;
use crate::palette::Palette;
use crate::refresh::{RefreshStats, Screen};
use crate::window::Window;

/// Library name and version.
pub const VERSION: &str = concat!("kurses ", env!("CARGO_PKG_VERSION"));

static LIVE: AtomicBool = AtomicBool::new(false);

/// Cursor visibility as `curs_set` numbers it.
const CURSOR_NORMAL: u8 = 1;

pub struct Session<B: Backend> {
    backend: B,
    screen: Screen,
    stdscr: Window,
    pairs: PairTable,
    palette: Palette,
    queue: InputQueue,
    normalizer: Normalizer,
    mode: InputMode,
    tab_size: u16,
    cursor_visibility: u8,
    ended: bool,
    /// Raw events normalized but not yet queued.
    scratch: Vec<Event>,
    /// Events lost to a full input queue.
    dropped_events: u64,
}

impl<B: Backend> Session<B> {
    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Start a session on `backend` (initscr).
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyActive`] if another session is live.
    /// - [`Error::DisplayOpen`] if the backend cannot open the display.
    /// - [`Error::TooSmall`] if the display is below the configured minimum.
    /// - [`Error::OutOfMemory`] if the screen images cannot be allocated.
    pub fn init(backend: B, config: &Config) -> Result<Self> {
        if LIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyActive);
        }
        let session = Self::start(backend, config);
        if session.is_err() {
            LIVE.store(false, Ordering::Release);
        }
        session
    }

    /// [`init`](Self::init), exiting the process on failure with a message
    /// on stderr and the error's exit code.
    pub fn init_or_exit(backend: B, config: &Config) -> Self {
        match Self::init(backend, config) {
            Ok(session) => session,
            Err(err) => {
                eprintln!("kurses: {err}");
                process::exit(err.exit_code());
            }
        }
    }

    fn start(mut backend: B, config: &Config) -> Result<Self> {
        backend.open().map_err(Error::DisplayOpen)?;
        match Self::assemble(&mut backend, config) {
            Ok(parts) => Ok(parts.into_session(backend, config)),
            Err(err) => {
                if let Err(close_err) = backend.close() {
                    warn!(target: "k_screen::session", %close_err, "closing after failed init");
                }
                Err(err)
            }
        }
    }

    fn assemble(backend: &mut B, config: &Config) -> Result<Parts> {
        let size = backend.size().map_err(Error::DisplayOpen)?;
        let (min_lines, min_cols) = (config.screen.min_lines, config.screen.min_cols);
        if size.rows < min_lines.max(1) || size.cols < min_cols.max(1) {
            return Err(Error::TooSmall {
                lines: size.rows,
                cols: size.cols,
                min_lines,
                min_cols,
            });
        }

        let colors = backend.max_colors();
        let pair_count = config
            .colors
            .max_pairs
            .map_or(backend.max_pairs(), |cap| cap.min(backend.max_pairs()));

        let mut screen = Screen::new(size.rows, size.cols)?;
        if config.screen.preserve {
            screen.cancel_full_repaint();
        }
        let mut stdscr = Window::new(size.rows, size.cols, 0, 0)?;
        stdscr.set_tab_size(config.screen.tab_size);

        let mask = config.input.mask();
        if !mask.is_empty() {
            backend.set_mouse(true)?;
        }

        debug!(
            target: "k_screen::session",
            lines = size.rows,
            cols = size.cols,
            colors,
            pairs = pair_count,
            "session started"
        );
        Ok(Parts {
            screen,
            stdscr,
            pairs: PairTable::new(pair_count, colors),
            palette: Palette::new(colors),
        })
    }

    /// Give the display back (endwin). The session stays usable; the next
    /// refresh reopens the display and repaints it.
    ///
    /// # Errors
    ///
    /// [`Error::Backend`] if the backend fails to restore the display.
    pub fn end(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.backend.close()?;
        self.ended = true;
        debug!(target: "k_screen::session", "session ended");
        Ok(())
    }

    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// End the session and release it, so another may start.
    ///
    /// # Errors
    ///
    /// As [`end`](Self::end). The session is released either way.
    pub fn teardown(mut self) -> Result<()> {
        self.end()
    }

    fn resume(&mut self) -> Result<()> {
        if self.ended {
            self.backend.open()?;
            self.ended = false;
            self.screen.request_full_repaint();
            debug!(target: "k_screen::session", "session resumed");
        }
        Ok(())
    }

    // ─── Windows ─────────────────────────────────────────────────────────

    #[must_use]
    pub const fn stdscr(&self) -> &Window {
        &self.stdscr
    }

    pub const fn stdscr_mut(&mut self) -> &mut Window {
        &mut self.stdscr
    }

    #[must_use]
    pub const fn lines(&self) -> u16 {
        self.screen.lines()
    }

    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.screen.cols()
    }

    /// A new independent window (newwin). A zero dimension extends to the
    /// screen edge.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] if the window would be empty or start off
    /// screen, [`Error::OutOfMemory`] if it cannot be allocated.
    pub fn new_window(&self, height: u16, width: u16, y: u16, x: u16) -> Result<Window> {
        let h = if height == 0 { self.lines().saturating_sub(y) } else { height };
        let w = if width == 0 { self.cols().saturating_sub(x) } else { width };
        if y >= self.lines() || x >= self.cols() {
            return Err(Error::OutOfBounds { y, x, height, width });
        }
        let mut win = Window::new(h, w, y, x)?;
        win.set_tab_size(self.tab_size);
        Ok(win)
    }

    /// A sub-window of `parent` at screen `(y, x)` (subwin).
    ///
    /// # Errors
    ///
    /// See [`Window::subwindow`].
    pub fn sub_window(
        &self,
        parent: &Window,
        height: u16,
        width: u16,
        y: u16,
        x: u16,
    ) -> Result<Window> {
        parent.subwindow(height, width, y, x)
    }

    /// A sub-window of `parent` at `(y, x)` relative to it (derwin).
    ///
    /// # Errors
    ///
    /// See [`Window::derive`].
    pub fn derived_window(
        &self,
        parent: &Window,
        height: u16,
        width: u16,
        y: u16,
        x: u16,
    ) -> Result<Window> {
        parent.derive(height, width, y, x)
    }

    // ─── Colors ──────────────────────────────────────────────────────────

    /// Number of colors (COLORS).
    #[must_use]
    pub fn colors(&self) -> u16 {
        self.palette.len()
    }

    /// Number of color pairs, counting pair 0 (COLOR_PAIRS).
    #[must_use]
    pub fn color_pairs(&self) -> u16 {
        self.pairs.capacity()
    }

    /// Pairs currently allocated, not counting pair 0.
    #[must_use]
    pub fn pairs_in_use(&self) -> usize {
        self.pairs.in_use()
    }

    /// The pair for `(fg, bg)`, allocating or recycling as needed.
    ///
    /// # Errors
    ///
    /// See [`PairTable::alloc`].
    pub fn alloc_pair(&mut self, fg: i16, bg: i16) -> Result<u16> {
        self.pairs.alloc(fg, bg)
    }

    pub fn free_pair(&mut self, pair: u16) -> bool {
        self.pairs.free(pair)
    }

    #[must_use]
    pub fn find_pair(&self, fg: i16, bg: i16) -> Option<u16> {
        self.pairs.find(fg, bg)
    }

    /// Release every pair but pair 0. Cells keep their indices and draw in
    /// pair 0's colors until rewritten.
    pub fn reset_color_pairs(&mut self) {
        self.pairs.reset();
    }

    /// Define a pair (init_pair). Redefining a live pair repaints the
    /// screen so cells already drawn with it change color.
    ///
    /// # Errors
    ///
    /// See [`PairTable::init`].
    pub fn init_pair(&mut self, pair: u16, fg: i16, bg: i16) -> Result<()> {
        let was_live = pair != 0 && self.pairs.is_live(pair);
        self.pairs.init(pair, fg, bg)?;
        if was_live {
            self.screen.request_full_repaint();
        }
        Ok(())
    }

    #[must_use]
    pub fn pair_content(&self, pair: u16) -> Option<(i16, i16)> {
        self.pairs.content(pair)
    }

    /// Redefine a color from 0..=1000 components and repaint.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidColor`] for an unknown color.
    pub fn init_color(&mut self, color: i16, r: i16, g: i16, b: i16) -> Result<()> {
        self.palette.init_color(color, r, g, b)?;
        self.screen.request_full_repaint();
        Ok(())
    }

    #[must_use]
    pub fn color_content(&self, color: i16) -> Option<(i16, i16, i16)> {
        self.palette.color_content(color)
    }

    /// Colors of pair 0 (assume_default_colors), then repaint.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidColor`] for an unknown color.
    pub fn assume_default_colors(&mut self, fg: i16, bg: i16) -> Result<()> {
        self.pairs.set_default(fg, bg)?;
        self.screen.request_full_repaint();
        Ok(())
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Stage and send the standard window (refresh).
    ///
    /// # Errors
    ///
    /// See [`doupdate`](Self::doupdate).
    pub fn refresh(&mut self) -> Result<RefreshStats> {
        self.screen.stage(&mut self.stdscr);
        self.doupdate()
    }

    /// Stage the standard window without sending anything.
    pub fn noutrefresh(&mut self) {
        self.screen.stage(&mut self.stdscr);
    }

    /// Stage and send `win` (wrefresh).
    ///
    /// # Errors
    ///
    /// See [`doupdate`](Self::doupdate).
    pub fn wrefresh(&mut self, win: &mut Window) -> Result<RefreshStats> {
        self.screen.stage(win);
        self.doupdate()
    }

    /// Stage `win` without sending anything (wnoutrefresh).
    pub fn wnoutrefresh(&mut self, win: &mut Window) {
        self.screen.stage(win);
    }

    /// Send everything staged (doupdate). Reopens the display first if the
    /// session was ended.
    ///
    /// # Errors
    ///
    /// [`Error::Backend`] if output fails. Unsent lines stay pending and
    /// the next call retries them.
    pub fn doupdate(&mut self) -> Result<RefreshStats> {
        self.resume()?;
        self.screen
            .update(&mut self.backend, &self.pairs, &self.palette)
    }

    /// Repaint the whole display on the next update.
    pub fn redraw(&mut self) {
        self.screen.request_full_repaint();
    }

    /// Set cursor visibility (0 hidden, 1 normal, 2 very visible) and
    /// return the previous setting.
    ///
    /// # Errors
    ///
    /// [`Error::Backend`] if output fails.
    pub fn curs_set(&mut self, visibility: u8) -> Result<u8> {
        let previous = self.cursor_visibility;
        self.backend.set_cursor_visible(visibility != 0)?;
        self.cursor_visibility = visibility.min(2);
        Ok(previous)
    }

    #[must_use]
    pub const fn screen(&self) -> &Screen {
        &self.screen
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Next input event (getch), waiting as the input mode says. `None`
    /// means no input arrived in time. Refreshes the standard window first
    /// if it has changes.
    ///
    /// # Errors
    ///
    /// [`Error::Backend`] if reading input or the implicit refresh fails.
    pub fn getch(&mut self) -> Result<Option<Event>> {
        if let Some(event) = self.queue.pop() {
            return Ok(Some(event));
        }
        if self.stdscr.is_touched() {
            self.refresh()?;
        }

        let deadline = self.mode.timeout().map(|t| Instant::now() + t);
        loop {
            let wait = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let Some(raw) = self.backend.read_event(wait)? else {
                return Ok(None);
            };
            match raw {
                RawEvent::Resize => return Ok(Some(Event::Resize)),
                RawEvent::Input(event) => {
                    self.normalizer
                        .feed(event, Instant::now(), &mut self.scratch);
                    // Typeahead past the queue capacity is lost.
                    for event in self.scratch.drain(..) {
                        if !self.queue.push(event) {
                            self.dropped_events += 1;
                        }
                    }
                }
            }
            if let Some(event) = self.queue.pop() {
                return Ok(Some(event));
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(None);
            }
        }
    }

    /// Push an event back so the next `getch` returns it (ungetch).
    ///
    /// # Errors
    ///
    /// [`Error::UngetOverflow`] if the unget stack is full.
    pub fn ungetch(&mut self, event: Event) -> Result<()> {
        if self.queue.unget(event) {
            Ok(())
        } else {
            Err(Error::UngetOverflow)
        }
    }

    /// Discard queued and pending typeahead (flushinp).
    ///
    /// # Errors
    ///
    /// [`Error::Backend`] if reading input fails.
    pub fn flush_input(&mut self) -> Result<()> {
        self.queue.clear();
        while let Some(raw) = self.backend.read_event(Some(Duration::ZERO))? {
            if raw == RawEvent::Resize {
                // A resize is not typeahead; keep it for the application.
                if !self.queue.push(Event::Resize) {
                    self.dropped_events += 1;
                }
                break;
            }
        }
        Ok(())
    }

    /// Events discarded because the input queue was full.
    #[must_use]
    pub const fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.mode = mode;
    }

    #[must_use]
    pub const fn input_mode(&self) -> InputMode {
        self.mode
    }

    /// Non-blocking reads on or off (nodelay).
    pub fn nodelay(&mut self, on: bool) {
        self.mode = if on { InputMode::NonBlocking } else { InputMode::Blocking };
    }

    /// Read timeout in milliseconds (timeout): negative blocks, zero does
    /// not wait, positive waits that long, rounded up to tenths of a
    /// second and capped at 25.5 s.
    pub fn timeout(&mut self, ms: i32) {
        self.mode = match ms {
            i32::MIN..=-1 => InputMode::Blocking,
            0 => InputMode::NonBlocking,
            ms => InputMode::Timed(u8::try_from(ms.saturating_add(99) / 100).unwrap_or(u8::MAX)),
        };
    }

    /// Wait up to `tenths` tenths of a second per read (halfdelay).
    pub fn halfdelay(&mut self, tenths: u8) {
        self.mode = InputMode::Timed(tenths.max(1));
    }

    /// Choose reported mouse actions and return the previous mask.
    ///
    /// # Errors
    ///
    /// [`Error::Backend`] if mouse reporting cannot be switched.
    pub fn mouse_mask(&mut self, mask: MouseMask) -> Result<MouseMask> {
        let previous = self.normalizer.mask();
        if previous.is_empty() != mask.is_empty() {
            self.backend.set_mouse(!mask.is_empty())?;
        }
        self.normalizer.set_mask(mask);
        Ok(previous)
    }

    /// Set the click interval in milliseconds and return the previous one.
    pub fn mouse_interval(&mut self, ms: u64) -> u64 {
        let previous = self.normalizer.click_interval();
        self.normalizer.set_click_interval(Duration::from_millis(ms));
        u64::try_from(previous.as_millis()).unwrap_or(u64::MAX)
    }

    // ─── Terminal ────────────────────────────────────────────────────────

    /// Resize the screen and standard window (resize_term). `(0, 0)` asks
    /// the backend for the current display size. The standard window is
    /// touched and staged; other windows are the application's to adjust.
    ///
    /// # Errors
    ///
    /// [`Error::Backend`] if the backend fails, [`Error::OutOfBounds`] for
    /// a zero dimension, [`Error::OutOfMemory`] if allocation fails.
    pub fn resize_term(&mut self, lines: u16, cols: u16) -> Result<()> {
        let size = if lines == 0 && cols == 0 {
            self.backend.size()?
        } else {
            let size = Size { cols, rows: lines };
            self.backend.resize(size)?;
            size
        };
        if size.rows == 0 || size.cols == 0 {
            return Err(Error::OutOfBounds {
                y: 0,
                x: 0,
                height: size.rows,
                width: size.cols,
            });
        }
        // `Screen::resize` is all-or-nothing; stdscr must end up the same size.
        let (old_lines, old_cols) = (self.screen.lines(), self.screen.cols());
        self.screen.resize(size.rows, size.cols)?;
        if let Err(err) = self.stdscr.resize(size.rows, size.cols) {
            if let Err(undo) = self.screen.resize(old_lines, old_cols) {
                warn!(target: "k_screen::session", %undo, "restoring screen size");
            }
            return Err(err);
        }
        self.stdscr.touch();
        self.screen.stage(&mut self.stdscr);
        debug!(target: "k_screen::session", lines = size.rows, cols = size.cols, "terminal resized");
        Ok(())
    }

    /// Whether `(lines, cols)` differs from the current screen size.
    #[must_use]
    pub const fn is_term_resized(&self, lines: u16, cols: u16) -> bool {
        lines != self.screen.lines() || cols != self.screen.cols()
    }

    /// Tab stop distance for the standard window and windows created after
    /// this call (TABSIZE).
    pub fn set_tab_size(&mut self, size: u16) {
        self.tab_size = size.max(1);
        self.stdscr.set_tab_size(self.tab_size);
    }

    #[must_use]
    pub const fn tab_size(&self) -> u16 {
        self.tab_size
    }

    #[must_use]
    pub const fn version(&self) -> &'static str {
        VERSION
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: Backend> Drop for Session<B> {
    fn drop(&mut self) {
        if !self.ended {
            if let Err(err) = self.backend.close() {
                warn!(target: "k_screen::session", %err, "closing backend on drop");
            }
        }
        LIVE.store(false, Ordering::Release);
    }
}

/// Everything `init` builds before the session exists.
struct Parts {
    screen: Screen,
    stdscr: Window,
    pairs: PairTable,
    palette: Palette,
}

impl Parts {
    fn into_session<B: Backend>(self, backend: B, config: &Config) -> Session<B> {
        let input = &config.input;
        Session {
            backend,
            screen: self.screen,
            stdscr: self.stdscr,
            pairs: self.pairs,
            palette: self.palette,
            queue: InputQueue::new(input.queue_capacity, input.unget_limit),
            normalizer: Normalizer::new(input.mask(), input.click_interval()),
            mode: input.mode,
            tab_size: config.screen.tab_size.max(1),
            cursor_visibility: CURSOR_NORMAL,
            ended: false,
            scratch: Vec::new(),
            dropped_events: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::input::Key;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Sessions are process-wide; tests creating one take turns.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(cols: u16, rows: u16) -> Session<MemoryBackend> {
        Session::init(MemoryBackend::new(cols, rows), &Config::default()).unwrap()
    }

    #[test]
    fn second_init_is_rejected() {
        let _guard = serial();
        let first = session(10, 5);
        let second = Session::init(MemoryBackend::new(10, 5), &Config::default());
        assert!(matches!(second, Err(Error::AlreadyActive)));
        drop(first);
        assert!(Session::init(MemoryBackend::new(10, 5), &Config::default()).is_ok());
    }

    #[test]
    fn too_small_display_is_fatal() {
        let _guard = serial();
        let err = Session::init(MemoryBackend::new(1, 1), &Config::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::TooSmall { lines: 1, cols: 1, .. }));
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 4);
        // The failed init released the guard.
        assert!(Session::init(MemoryBackend::new(10, 5), &Config::default()).is_ok());
    }

    #[test]
    fn refresh_draws_stdscr() {
        let _guard = serial();
        let mut s = session(8, 2);
        s.stdscr_mut().mv_add_str(1, 2, "hey");
        s.refresh().unwrap();
        assert_eq!(s.backend().line_text(1), "  hey   ");
    }

    #[test]
    fn end_then_refresh_resumes() {
        let _guard = serial();
        let mut s = session(4, 2);
        s.refresh().unwrap();
        s.end().unwrap();
        assert!(s.is_ended());
        assert!(!s.backend().is_open());
        let stats = s.refresh().unwrap();
        assert!(stats.full_repaint);
        assert!(s.backend().is_open());
        assert!(!s.is_ended());
    }

    #[test]
    fn getch_normalizes_and_ungetch_comes_first() {
        let _guard = serial();
        let mut s = session(4, 2);
        s.backend_mut().push_bytes(b"a\x1b[A");
        s.ungetch(Event::Char('z')).unwrap();
        assert_eq!(s.getch().unwrap(), Some(Event::Char('z')));
        assert_eq!(s.getch().unwrap(), Some(Event::Char('a')));
        assert_eq!(s.getch().unwrap(), Some(Event::Key(Key::Up)));
        assert_eq!(s.getch().unwrap(), None);
    }

    #[test]
    fn timeout_modes() {
        let _guard = serial();
        let mut s = session(4, 2);
        s.timeout(-1);
        assert_eq!(s.input_mode(), InputMode::Blocking);
        s.timeout(0);
        assert_eq!(s.input_mode(), InputMode::NonBlocking);
        s.timeout(250);
        assert_eq!(s.input_mode(), InputMode::Timed(3));
        s.halfdelay(0);
        assert_eq!(s.input_mode(), InputMode::Timed(1));
    }

    #[test]
    fn mouse_mask_switches_backend_reporting() {
        let _guard = serial();
        let mut s = session(4, 2);
        assert!(!s.backend().mouse_enabled());
        let old = s.mouse_mask(MouseMask::CLICKED).unwrap();
        assert!(old.is_empty());
        assert!(s.backend().mouse_enabled());
        assert_eq!(s.mouse_interval(200), 166);
    }

    #[test]
    fn resize_term_follows_backend() {
        let _guard = serial();
        let mut s = session(4, 2);
        s.refresh().unwrap();
        s.backend_mut().set_size(6, 3);
        assert_eq!(s.getch().unwrap(), Some(Event::Resize));
        assert!(s.is_term_resized(3, 6));
        assert!(!s.is_term_resized(2, 4));
        s.resize_term(0, 0).unwrap();
        assert_eq!((s.lines(), s.cols()), (3, 6));
        assert_eq!((s.stdscr().height(), s.stdscr().width()), (3, 6));
        assert!(s.refresh().unwrap().full_repaint);
    }

    #[test]
    fn rejected_resize_keeps_sizes_in_step() {
        let _guard = serial();
        let mut s = session(4, 2);
        s.refresh().unwrap();
        assert!(matches!(
            s.resize_term(0, 5),
            Err(Error::OutOfBounds { height: 0, .. })
        ));
        assert_eq!((s.lines(), s.cols()), (2, 4));
        assert_eq!((s.stdscr().height(), s.stdscr().width()), (2, 4));
    }

    #[test]
    fn full_queue_counts_dropped_events() {
        let _guard = serial();
        let mut config = Config::default();
        config.input.queue_capacity = 0;
        let mut s = Session::init(MemoryBackend::new(4, 2), &config).unwrap();
        s.backend_mut().push_bytes(b"ab");
        assert_eq!(s.getch().unwrap(), None);
        assert_eq!(s.dropped_events(), 2);

        // Pushed-back events bypass the queue.
        s.ungetch(Event::Char('z')).unwrap();
        assert_eq!(s.getch().unwrap(), Some(Event::Char('z')));
    }

    #[test]
    fn max_pairs_config_caps_backend() {
        let _guard = serial();
        let mut config = Config::default();
        config.colors.max_pairs = Some(8);
        let s = Session::init(MemoryBackend::new(4, 2), &config).unwrap();
        assert_eq!(s.color_pairs(), 8);
        assert_eq!(s.colors(), 256);
    }
}
