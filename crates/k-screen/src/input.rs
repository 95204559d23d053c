// SPDX-License-Identifier: MIT
//
// Input normalization: what `getch` hands the application.
//
// The terminal layer reports keys as (code, modifiers) and mouse activity
// as raw press/release/motion reports. Curses programs expect something
// flatter: plain characters for anything that has a byte value (Ctrl+A is
// 0x01, Enter is '\n'), symbolic keys for the rest, and mouse events
// already folded into clicks and double clicks.
//
// `Normalizer` does that folding. `InputQueue` holds the results until the
// application reads them, with a separate stack for `ungetch`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use k_term::input::{self as raw, KeyCode, KeyEventKind, MouseEventKind};
use serde::Deserialize;
use tracing::{trace, warn};

pub use k_term::input::{Modifiers, MouseButton};

// ─── Events ─────────────────────────────────────────────────────────────────

/// One normalized input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A character, including control characters (`'\x01'` for Ctrl+A,
    /// `'\n'` for Enter, `'\x1b'` for Escape).
    Char(char),
    Key(Key),
    Mouse(MouseEvent),
    /// The terminal changed size. Call `resize_term(0, 0)` to follow it.
    Resize,
}

/// Keys with no character value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Backspace,
    /// Shift+Tab.
    BackTab,
    /// Function key, 1-based.
    F(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub x: u16,
    pub y: u16,
    /// `None` for wheel events.
    pub button: Option<MouseButton>,
    pub action: MouseAction,
    pub modifiers: Modifiers,
}

/// What happened with the mouse. Also the vocabulary of the `mouse_mask`
/// config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MouseAction {
    Pressed,
    Released,
    Clicked,
    DoubleClicked,
    WheelUp,
    WheelDown,
}

impl MouseAction {
    /// The mask bit that enables this action.
    #[must_use]
    pub const fn mask(self) -> MouseMask {
        match self {
            Self::Pressed => MouseMask::PRESSED,
            Self::Released => MouseMask::RELEASED,
            Self::Clicked => MouseMask::CLICKED,
            Self::DoubleClicked => MouseMask::DOUBLE_CLICKED,
            Self::WheelUp => MouseMask::WHEEL_UP,
            Self::WheelDown => MouseMask::WHEEL_DOWN,
        }
    }
}

bitflags! {
    /// Mouse actions the application wants reported.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct MouseMask: u8 {
        const PRESSED        = 0b00_0001;
        const RELEASED       = 0b00_0010;
        const CLICKED        = 0b00_0100;
        const DOUBLE_CLICKED = 0b00_1000;
        const WHEEL_UP       = 0b01_0000;
        const WHEEL_DOWN     = 0b10_0000;
    }
}

/// How `getch` waits when no input is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputMode {
    /// Wait indefinitely.
    #[default]
    Blocking,
    /// Return immediately.
    NonBlocking,
    /// Wait up to this many tenths of a second (halfdelay).
    Timed(u8),
}

impl InputMode {
    /// The wait to pass to the backend: `None` blocks.
    #[must_use]
    pub const fn timeout(self) -> Option<Duration> {
        match self {
            Self::Blocking => None,
            Self::NonBlocking => Some(Duration::ZERO),
            Self::Timed(tenths) => Some(Duration::from_millis(tenths as u64 * 100)),
        }
    }
}

// ─── Queue ──────────────────────────────────────────────────────────────────

/// Pending events: a bounded FIFO plus a bounded LIFO of pushed-back
/// events that are always read first.
#[derive(Debug, Clone)]
pub struct InputQueue {
    ring: VecDeque<Event>,
    capacity: usize,
    unget: Vec<Event>,
    unget_limit: usize,
}

impl InputQueue {
    #[must_use]
    pub fn new(capacity: usize, unget_limit: usize) -> Self {
        Self {
            ring: VecDeque::with_capacity(capacity),
            capacity,
            unget: Vec::new(),
            unget_limit,
        }
    }

    /// Append an event. Returns `false` (and drops it) when full.
    pub fn push(&mut self, event: Event) -> bool {
        if self.ring.len() >= self.capacity {
            warn!(target: "k_screen::input", ?event, "input queue full, dropping event");
            return false;
        }
        self.ring.push_back(event);
        true
    }

    /// Push an event back so the next `pop` returns it. Returns `false`
    /// when the unget stack is full.
    pub fn unget(&mut self, event: Event) -> bool {
        if self.unget.len() >= self.unget_limit {
            return false;
        }
        self.unget.push(event);
        true
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.unget.pop().or_else(|| self.ring.pop_front())
    }

    /// Drop everything, pushed-back events included (flushinp).
    pub fn clear(&mut self) {
        self.ring.clear();
        self.unget.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len() + self.unget.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty() && self.unget.is_empty()
    }
}

// ─── Normalizer ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Press {
    button: MouseButton,
    x: u16,
    y: u16,
    at: Instant,
}

/// Turns terminal-layer events into [`Event`]s.
#[derive(Debug, Clone)]
pub struct Normalizer {
    mask: MouseMask,
    click_interval: Duration,
    pressed: Option<Press>,
    /// Last synthesized single click, candidate for a double click.
    clicked: Option<Press>,
}

impl Normalizer {
    #[must_use]
    pub const fn new(mask: MouseMask, click_interval: Duration) -> Self {
        Self {
            mask,
            click_interval,
            pressed: None,
            clicked: None,
        }
    }

    #[must_use]
    pub const fn mask(&self) -> MouseMask {
        self.mask
    }

    pub fn set_mask(&mut self, mask: MouseMask) {
        self.mask = mask;
        self.pressed = None;
        self.clicked = None;
    }

    #[must_use]
    pub const fn click_interval(&self) -> Duration {
        self.click_interval
    }

    pub fn set_click_interval(&mut self, interval: Duration) {
        self.click_interval = interval;
    }

    /// Normalize one raw event observed at `now`, appending zero or more
    /// events to `out`.
    pub fn feed(&mut self, event: raw::Event, now: Instant, out: &mut Vec<Event>) {
        match event {
            raw::Event::Key(key) => {
                if key.kind == KeyEventKind::Release {
                    return;
                }
                if key.modifiers.contains(Modifiers::ALT) {
                    out.push(Event::Char('\x1b'));
                }
                out.push(key_event(key.code, key.modifiers));
            }
            raw::Event::Mouse(mouse) => self.mouse(mouse, now, out),
        }
    }

    fn mouse(&mut self, m: raw::MouseEvent, now: Instant, out: &mut Vec<Event>) {
        let mut report = |button, action: MouseAction| {
            if self.mask.contains(action.mask()) {
                out.push(Event::Mouse(MouseEvent {
                    x: m.x,
                    y: m.y,
                    button,
                    action,
                    modifiers: m.modifiers,
                }));
            }
        };

        match m.kind {
            MouseEventKind::Press(button) => {
                report(Some(button), MouseAction::Pressed);
                self.pressed = Some(Press {
                    button,
                    x: m.x,
                    y: m.y,
                    at: now,
                });
            }
            MouseEventKind::Release(button) => {
                report(Some(button), MouseAction::Released);
                let Some(press) = self.pressed.take() else {
                    return;
                };
                let same_spot = press.button == button && press.x == m.x && press.y == m.y;
                if !same_spot || now.duration_since(press.at) > self.click_interval {
                    return;
                }
                let double = self.clicked.is_some_and(|c| {
                    c.button == button
                        && c.x == m.x
                        && c.y == m.y
                        && now.duration_since(c.at) <= self.click_interval
                });
                if double {
                    self.clicked = None;
                    report(Some(button), MouseAction::DoubleClicked);
                } else {
                    self.clicked = Some(Press { at: now, ..press });
                    report(Some(button), MouseAction::Clicked);
                }
            }
            MouseEventKind::ScrollUp => report(None, MouseAction::WheelUp),
            MouseEventKind::ScrollDown => report(None, MouseAction::WheelDown),
            MouseEventKind::Drag(_) | MouseEventKind::Move => {
                trace!(target: "k_screen::input", x = m.x, y = m.y, "dropping mouse motion");
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(MouseMask::empty(), Duration::from_millis(166))
    }
}

fn key_event(code: KeyCode, modifiers: Modifiers) -> Event {
    match code {
        KeyCode::Char(c) if modifiers.contains(Modifiers::CTRL) => {
            Event::Char(control_char(c).unwrap_or(c))
        }
        KeyCode::Char(c) => Event::Char(c),
        KeyCode::Enter => Event::Char('\n'),
        KeyCode::Tab if modifiers.contains(Modifiers::SHIFT) => Event::Key(Key::BackTab),
        KeyCode::Tab => Event::Char('\t'),
        KeyCode::Escape => Event::Char('\x1b'),
        KeyCode::Backspace => Event::Key(Key::Backspace),
        KeyCode::Delete => Event::Key(Key::Delete),
        KeyCode::Insert => Event::Key(Key::Insert),
        KeyCode::Up => Event::Key(Key::Up),
        KeyCode::Down => Event::Key(Key::Down),
        KeyCode::Left => Event::Key(Key::Left),
        KeyCode::Right => Event::Key(Key::Right),
        KeyCode::Home => Event::Key(Key::Home),
        KeyCode::End => Event::Key(Key::End),
        KeyCode::PageUp => Event::Key(Key::PageUp),
        KeyCode::PageDown => Event::Key(Key::PageDown),
        KeyCode::F(n) => Event::Key(Key::F(n)),
    }
}

/// The control character Ctrl+`c` produces, if any.
fn control_char(c: char) -> Option<char> {
    if c == '?' {
        return Some('\x7f');
    }
    let upper = c.to_ascii_uppercase();
    ('@'..='_')
        .contains(&upper)
        .then(|| char::from(upper as u8 & 0x1F))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k_term::input::KeyEvent;
    use pretty_assertions::assert_eq;

    fn feed_all(n: &mut Normalizer, events: &[(raw::Event, Instant)]) -> Vec<Event> {
        let mut out = Vec::new();
        for &(e, at) in events {
            n.feed(e, at, &mut out);
        }
        out
    }

    fn key(code: KeyCode, modifiers: Modifiers) -> raw::Event {
        raw::Event::Key(KeyEvent::with(code, modifiers))
    }

    fn mouse(kind: MouseEventKind, x: u16, y: u16) -> raw::Event {
        raw::Event::Mouse(raw::MouseEvent {
            kind,
            x,
            y,
            modifiers: Modifiers::empty(),
        })
    }

    fn clicked(action: MouseAction, x: u16, y: u16) -> Event {
        Event::Mouse(MouseEvent {
            x,
            y,
            button: Some(MouseButton::Left),
            action,
            modifiers: Modifiers::empty(),
        })
    }

    // ── keys ────────────────────────────────────────────────────────────

    #[test]
    fn control_keys_become_characters() {
        let mut n = Normalizer::default();
        let now = Instant::now();
        let out = feed_all(
            &mut n,
            &[
                (key(KeyCode::Char('a'), Modifiers::CTRL), now),
                (key(KeyCode::Char('@'), Modifiers::CTRL), now),
                (key(KeyCode::Enter, Modifiers::empty()), now),
                (key(KeyCode::Tab, Modifiers::empty()), now),
                (key(KeyCode::Escape, Modifiers::empty()), now),
            ],
        );
        assert_eq!(
            out,
            vec![
                Event::Char('\x01'),
                Event::Char('\0'),
                Event::Char('\n'),
                Event::Char('\t'),
                Event::Char('\x1b'),
            ]
        );
    }

    #[test]
    fn alt_key_is_escape_prefixed() {
        let mut n = Normalizer::default();
        let out = feed_all(&mut n, &[(key(KeyCode::Char('x'), Modifiers::ALT), Instant::now())]);
        assert_eq!(out, vec![Event::Char('\x1b'), Event::Char('x')]);
    }

    #[test]
    fn named_keys() {
        let mut n = Normalizer::default();
        let now = Instant::now();
        let out = feed_all(
            &mut n,
            &[
                (key(KeyCode::Up, Modifiers::empty()), now),
                (key(KeyCode::F(5), Modifiers::empty()), now),
                (key(KeyCode::Tab, Modifiers::SHIFT), now),
                (key(KeyCode::Backspace, Modifiers::empty()), now),
            ],
        );
        assert_eq!(
            out,
            vec![
                Event::Key(Key::Up),
                Event::Key(Key::F(5)),
                Event::Key(Key::BackTab),
                Event::Key(Key::Backspace),
            ]
        );
    }

    #[test]
    fn key_release_is_dropped() {
        let mut n = Normalizer::default();
        let mut release = KeyEvent::press(KeyCode::Char('a'));
        release.kind = KeyEventKind::Release;
        let out = feed_all(&mut n, &[(raw::Event::Key(release), Instant::now())]);
        assert!(out.is_empty());
    }

    // ── mouse ───────────────────────────────────────────────────────────

    #[test]
    fn empty_mask_reports_nothing() {
        let mut n = Normalizer::default();
        let now = Instant::now();
        let out = feed_all(
            &mut n,
            &[
                (mouse(MouseEventKind::Press(MouseButton::Left), 1, 1), now),
                (mouse(MouseEventKind::Release(MouseButton::Left), 1, 1), now),
                (mouse(MouseEventKind::ScrollUp, 1, 1), now),
            ],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn press_and_release_in_place_is_a_click() {
        let mut n = Normalizer::new(MouseMask::CLICKED, Duration::from_millis(166));
        let t0 = Instant::now();
        let out = feed_all(
            &mut n,
            &[
                (mouse(MouseEventKind::Press(MouseButton::Left), 4, 2), t0),
                (
                    mouse(MouseEventKind::Release(MouseButton::Left), 4, 2),
                    t0 + Duration::from_millis(50),
                ),
            ],
        );
        assert_eq!(out, vec![clicked(MouseAction::Clicked, 4, 2)]);
    }

    #[test]
    fn slow_or_moved_release_is_not_a_click() {
        let mut n = Normalizer::new(MouseMask::CLICKED, Duration::from_millis(100));
        let t0 = Instant::now();
        let out = feed_all(
            &mut n,
            &[
                (mouse(MouseEventKind::Press(MouseButton::Left), 4, 2), t0),
                (
                    mouse(MouseEventKind::Release(MouseButton::Left), 4, 2),
                    t0 + Duration::from_millis(300),
                ),
                (mouse(MouseEventKind::Press(MouseButton::Left), 4, 2), t0),
                (mouse(MouseEventKind::Release(MouseButton::Left), 5, 2), t0),
            ],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn second_click_within_interval_is_double() {
        let mask = MouseMask::CLICKED | MouseMask::DOUBLE_CLICKED;
        let mut n = Normalizer::new(mask, Duration::from_millis(166));
        let t0 = Instant::now();
        let ms = Duration::from_millis;
        let out = feed_all(
            &mut n,
            &[
                (mouse(MouseEventKind::Press(MouseButton::Left), 0, 0), t0),
                (mouse(MouseEventKind::Release(MouseButton::Left), 0, 0), t0 + ms(20)),
                (mouse(MouseEventKind::Press(MouseButton::Left), 0, 0), t0 + ms(60)),
                (mouse(MouseEventKind::Release(MouseButton::Left), 0, 0), t0 + ms(80)),
            ],
        );
        assert_eq!(
            out,
            vec![
                clicked(MouseAction::Clicked, 0, 0),
                clicked(MouseAction::DoubleClicked, 0, 0),
            ]
        );
    }

    #[test]
    fn wheel_and_motion() {
        let mut n = Normalizer::new(MouseMask::WHEEL_DOWN, Duration::from_millis(166));
        let now = Instant::now();
        let out = feed_all(
            &mut n,
            &[
                (mouse(MouseEventKind::ScrollUp, 3, 3), now),
                (mouse(MouseEventKind::ScrollDown, 3, 3), now),
                (mouse(MouseEventKind::Move, 3, 4), now),
            ],
        );
        assert_eq!(
            out,
            vec![Event::Mouse(MouseEvent {
                x: 3,
                y: 3,
                button: None,
                action: MouseAction::WheelDown,
                modifiers: Modifiers::empty(),
            })]
        );
    }

    // ── queue ───────────────────────────────────────────────────────────

    #[test]
    fn queue_reads_unget_stack_first() {
        let mut q = InputQueue::new(4, 2);
        q.push(Event::Char('a'));
        q.push(Event::Char('b'));
        assert!(q.unget(Event::Char('x')));
        assert!(q.unget(Event::Char('y')));
        assert!(!q.unget(Event::Char('z')));
        let order: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(
            order,
            vec![Event::Char('y'), Event::Char('x'), Event::Char('a'), Event::Char('b')]
        );
    }

    #[test]
    fn queue_drops_when_full() {
        let mut q = InputQueue::new(2, 1);
        assert!(q.push(Event::Resize));
        assert!(q.push(Event::Resize));
        assert!(!q.push(Event::Char('c')));
        assert_eq!(q.len(), 2);
        q.clear();
        assert!(q.is_empty());
    }

    #[test]
    fn input_mode_timeouts() {
        assert_eq!(InputMode::Blocking.timeout(), None);
        assert_eq!(InputMode::NonBlocking.timeout(), Some(Duration::ZERO));
        assert_eq!(InputMode::Timed(3).timeout(), Some(Duration::from_millis(300)));
    }
}
