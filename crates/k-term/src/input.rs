// SPDX-License-Identifier: MIT
//
// Terminal input byte parser.
//
// Turns raw stdin bytes into key and mouse events. Covers what a
// curses-style terminal emits with the modes `terminal.rs` enables:
//
// - Control characters and printable ASCII
// - UTF-8 multi-byte characters
// - Alt+key (ESC followed by a key)
// - Legacy CSI cursor, editing and function keys with xterm modifiers
// - SS3 cursor and F1–F4 keys (application keypad mode)
// - SGR mouse reports (press / release / drag / move / wheel)
//
// Escape sequences may be split across reads, so the parser keeps
// unconsumed bytes between calls. A lone ESC is ambiguous until more
// bytes arrive or a timeout passes; the caller resolves it with
// [`Parser::flush`].

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A parsed terminal input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
}

impl KeyEvent {
    /// A press with no modifiers.
    #[must_use]
    pub const fn press(code: KeyCode) -> Self {
        Self::with(code, Modifiers::empty())
    }

    /// A press with the given modifiers.
    #[must_use]
    pub const fn with(code: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            code,
            modifiers,
            kind: KeyEventKind::Press,
        }
    }
}

/// Press / repeat / release.
///
/// Legacy terminals only ever report presses; the other kinds exist for
/// backends that can distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// A Unicode character. Ctrl+letter arrives as the letter with
    /// [`Modifiers::CTRL`].
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F20.
    F(u8),
}

bitflags! {
    /// Keyboard modifier flags, in xterm's `1 + bitmask` parameter order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

/// A mouse report with 0-indexed cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub x: u16,
    pub y: u16,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press(MouseButton),
    Release(MouseButton),
    /// Motion with a button held.
    Drag(MouseButton),
    /// Motion with no button held.
    Move,
    ScrollUp,
    ScrollDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Incremental input parser.
///
/// ```
/// use k_term::input::{Event, KeyCode, KeyEvent, Parser};
///
/// let mut p = Parser::new();
/// assert!(p.advance(b"\x1b[").is_empty());
/// assert_eq!(p.advance(b"A"), vec![Event::Key(KeyEvent::press(KeyCode::Up))]);
/// ```
pub struct Parser {
    pending: Vec<u8>,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(64),
        }
    }

    /// Feed raw bytes and return every event they complete.
    ///
    /// Bytes of an incomplete sequence stay buffered for the next call.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Event> {
        self.pending.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.pending.len() {
            match parse_one(&self.pending[pos..]) {
                Step::Event(event, used) => {
                    events.push(event);
                    pos += used;
                }
                Step::Skip(used) => pos += used,
                Step::Incomplete => break,
            }
        }

        self.pending.drain(..pos);
        events
    }

    /// Whether bytes are waiting for the rest of a sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Resolve buffered bytes after the ESC timeout.
    ///
    /// A lone ESC becomes an Escape key; any other leftover bytes are
    /// reported as the keys they would be on their own.
    pub fn flush(&mut self) -> Vec<Event> {
        let events = self
            .pending
            .iter()
            .filter_map(|&b| match b {
                0x1B => Some(Event::Key(KeyEvent::press(KeyCode::Escape))),
                b @ 0x20..=0x7E => Some(Event::Key(KeyEvent::press(KeyCode::Char(b as char)))),
                b @ 0x00..=0x1F | b @ 0x7F => Some(control_byte(b)),
                _ => None,
            })
            .collect();
        self.pending.clear();
        events
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Parsing ────────────────────────────────────────────────────────────────
//
// Every parse function looks at the front of a slice and reports what it
// found plus how many bytes it used. None of them hold state.

enum Step {
    Event(Event, usize),
    Skip(usize),
    Incomplete,
}

fn parse_one(buf: &[u8]) -> Step {
    match buf[0] {
        0x1B => parse_escape(buf),
        b @ (0x00..=0x1F | 0x7F) => Step::Event(control_byte(b), 1),
        b @ 0x20..=0x7E => Step::Event(key(KeyCode::Char(b as char)), 1),
        0xC0..=0xF7 => parse_utf8(buf),
        _ => Step::Skip(1),
    }
}

/// Meaning of a single control byte.
fn control_byte(b: u8) -> Event {
    match b {
        0x09 => key(KeyCode::Tab),
        0x0A | 0x0D => key(KeyCode::Enter),
        0x08 | 0x7F => key(KeyCode::Backspace),
        0x1B => key(KeyCode::Escape),
        0x00 => Event::Key(KeyEvent::with(KeyCode::Char('@'), Modifiers::CTRL)),
        b @ 0x01..=0x1A => Event::Key(KeyEvent::with(
            KeyCode::Char((b'a' + b - 1) as char),
            Modifiers::CTRL,
        )),
        // 0x1C..=0x1F: Ctrl+\ ] ^ _
        b => Event::Key(KeyEvent::with(
            KeyCode::Char((b + 0x40) as char),
            Modifiers::CTRL,
        )),
    }
}

fn parse_escape(buf: &[u8]) -> Step {
    let Some(&next) = buf.get(1) else {
        return Step::Incomplete;
    };
    match next {
        b'[' => parse_csi(buf),
        b'O' => parse_ss3(buf),
        // Alt+key: ESC then whatever the key alone would be.
        0x00..=0x7F => match parse_one(&buf[1..]) {
            Step::Event(Event::Key(mut k), used) => {
                k.modifiers |= Modifiers::ALT;
                Step::Event(Event::Key(k), used + 1)
            }
            _ => Step::Event(key(KeyCode::Escape), 1),
        },
        _ => Step::Event(key(KeyCode::Escape), 1),
    }
}

fn parse_csi(buf: &[u8]) -> Step {
    if buf.len() < 3 {
        return Step::Incomplete;
    }
    if buf[2] == b'<' {
        return parse_sgr_mouse(buf);
    }

    // Parameter bytes 0x30..=0x3F, intermediates 0x20..=0x2F, final 0x40..=0x7E.
    let Some(end) = buf[2..].iter().position(|b| !(0x20..=0x3F).contains(b)) else {
        return Step::Incomplete;
    };
    let end = end + 2;
    let used = end + 1;
    let final_byte = buf[end];
    if !(0x40..=0x7E).contains(&final_byte) {
        return Step::Skip(used);
    }

    let params = parse_params(&buf[2..end]);
    let first = params.first().copied().unwrap_or(0);
    let modifiers = params.get(1).map_or(Modifiers::empty(), |&p| decode_modifiers(p));

    let code = match final_byte {
        b'~' => match tilde_key(first) {
            Some(code) => code,
            None => return Step::Skip(used),
        },
        b'Z' => {
            return Step::Event(
                Event::Key(KeyEvent::with(KeyCode::Tab, Modifiers::SHIFT)),
                used,
            );
        }
        b => match letter_key(b) {
            Some(code) => code,
            None => return Step::Skip(used),
        },
    };
    Step::Event(Event::Key(KeyEvent::with(code, modifiers)), used)
}

fn parse_ss3(buf: &[u8]) -> Step {
    let Some(&b) = buf.get(2) else {
        return Step::Incomplete;
    };
    letter_key(b).map_or(Step::Skip(3), |code| Step::Event(key(code), 3))
}

/// Keys encoded by a letter final byte (CSI and SS3).
const fn letter_key(b: u8) -> Option<KeyCode> {
    Some(match b {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        _ => return None,
    })
}

/// Keys encoded as `CSI n ~`.
#[allow(clippy::cast_possible_truncation)]
const fn tilde_key(n: u16) -> Option<KeyCode> {
    Some(match n {
        1 | 7 => KeyCode::Home,
        2 => KeyCode::Insert,
        3 => KeyCode::Delete,
        4 | 8 => KeyCode::End,
        5 => KeyCode::PageUp,
        6 => KeyCode::PageDown,
        11..=15 => KeyCode::F((n - 10) as u8),
        17..=21 => KeyCode::F((n - 11) as u8),
        23..=26 => KeyCode::F((n - 12) as u8),
        28 | 29 => KeyCode::F((n - 13) as u8),
        31..=34 => KeyCode::F((n - 14) as u8),
        _ => return None,
    })
}

/// `ESC [ < b ; x ; y M` (press / motion) or `... m` (release).
fn parse_sgr_mouse(buf: &[u8]) -> Step {
    let body = &buf[3..];
    let Some(end) = body.iter().position(|b| !(b.is_ascii_digit() || *b == b';')) else {
        return Step::Incomplete;
    };
    let used = 3 + end + 1;
    let terminator = body[end];
    if terminator != b'M' && terminator != b'm' {
        return Step::Skip(used);
    }

    let params = parse_params(&body[..end]);
    let [cb, col, row] = match params.as_slice() {
        [cb, col, row, ..] => [*cb, *col, *row],
        _ => return Step::Skip(used),
    };

    let mut modifiers = Modifiers::empty();
    if cb & 4 != 0 {
        modifiers |= Modifiers::SHIFT;
    }
    if cb & 8 != 0 {
        modifiers |= Modifiers::ALT;
    }
    if cb & 16 != 0 {
        modifiers |= Modifiers::CTRL;
    }

    let base = cb & 3;
    let kind = if cb & 64 != 0 {
        if base == 0 {
            MouseEventKind::ScrollUp
        } else {
            MouseEventKind::ScrollDown
        }
    } else if cb & 32 != 0 {
        match base {
            0 => MouseEventKind::Drag(MouseButton::Left),
            1 => MouseEventKind::Drag(MouseButton::Middle),
            2 => MouseEventKind::Drag(MouseButton::Right),
            _ => MouseEventKind::Move,
        }
    } else if terminator == b'm' {
        MouseEventKind::Release(button(base))
    } else {
        MouseEventKind::Press(button(base))
    };

    Step::Event(
        Event::Mouse(MouseEvent {
            kind,
            x: col.saturating_sub(1),
            y: row.saturating_sub(1),
            modifiers,
        }),
        used,
    )
}

fn parse_utf8(buf: &[u8]) -> Step {
    let len = match buf[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    };
    if buf.len() < len {
        // Bail early on a bad continuation byte rather than wait forever.
        if buf[1..].iter().any(|b| b & 0xC0 != 0x80) {
            return Step::Skip(1);
        }
        return Step::Incomplete;
    }
    std::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Step::Skip(1), |ch| Step::Event(key(KeyCode::Char(ch)), len))
}

// ─── Helpers ────────────────────────────────────────────────────────────────

const fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::press(code))
}

const fn button(base: u16) -> MouseButton {
    match base {
        0 => MouseButton::Left,
        1 => MouseButton::Middle,
        _ => MouseButton::Right,
    }
}

/// Semicolon-separated decimal parameters; empty fields read as 0.
/// Colon sub-parameters are ignored.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|field| {
            field
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |acc, b| {
                    acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
                })
        })
        .collect()
}

/// xterm modifier parameter: `1 + bitmask`; 0 and 1 mean none.
#[allow(clippy::cast_possible_truncation)]
const fn decode_modifiers(param: u16) -> Modifiers {
    let bits = param.saturating_sub(1);
    Modifiers::from_bits_truncate(bits as u8)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(bytes: &[u8]) -> Vec<Event> {
        Parser::new().advance(bytes)
    }

    fn k(code: KeyCode) -> Event {
        Event::Key(KeyEvent::press(code))
    }

    fn km(code: KeyCode, modifiers: Modifiers) -> Event {
        Event::Key(KeyEvent::with(code, modifiers))
    }

    // ── Plain bytes ─────────────────────────────────────────────────────

    #[test]
    fn ascii_chars() {
        assert_eq!(parse(b"ab"), vec![k(KeyCode::Char('a')), k(KeyCode::Char('b'))]);
    }

    #[test]
    fn control_chars() {
        assert_eq!(parse(b"\x01"), vec![km(KeyCode::Char('a'), Modifiers::CTRL)]);
        assert_eq!(parse(b"\r"), vec![k(KeyCode::Enter)]);
        assert_eq!(parse(b"\t"), vec![k(KeyCode::Tab)]);
        assert_eq!(parse(b"\x7f"), vec![k(KeyCode::Backspace)]);
        assert_eq!(parse(b"\x1c"), vec![km(KeyCode::Char('\\'), Modifiers::CTRL)]);
    }

    #[test]
    fn utf8_multibyte() {
        assert_eq!(parse("é中🔥".as_bytes()), vec![
            k(KeyCode::Char('é')),
            k(KeyCode::Char('中')),
            k(KeyCode::Char('🔥')),
        ]);
    }

    #[test]
    fn utf8_split_across_reads() {
        let mut p = Parser::new();
        let bytes = "中".as_bytes();
        assert!(p.advance(&bytes[..1]).is_empty());
        assert_eq!(p.advance(&bytes[1..]), vec![k(KeyCode::Char('中'))]);
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        assert_eq!(parse(b"\xC3(x"), vec![k(KeyCode::Char('(')), k(KeyCode::Char('x'))]);
    }

    // ── Escape sequences ────────────────────────────────────────────────

    #[test]
    fn lone_escape_waits_for_flush() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b").is_empty());
        assert!(p.has_pending());
        assert_eq!(p.flush(), vec![k(KeyCode::Escape)]);
        assert!(!p.has_pending());
    }

    #[test]
    fn alt_key() {
        assert_eq!(parse(b"\x1bx"), vec![km(KeyCode::Char('x'), Modifiers::ALT)]);
        assert_eq!(
            parse(b"\x1b\x01"),
            vec![km(KeyCode::Char('a'), Modifiers::ALT | Modifiers::CTRL)]
        );
    }

    #[test]
    fn csi_arrows_and_modifiers() {
        assert_eq!(parse(b"\x1b[A"), vec![k(KeyCode::Up)]);
        assert_eq!(parse(b"\x1b[1;5D"), vec![km(KeyCode::Left, Modifiers::CTRL)]);
        assert_eq!(parse(b"\x1b[1;2H"), vec![km(KeyCode::Home, Modifiers::SHIFT)]);
    }

    #[test]
    fn csi_tilde_keys() {
        assert_eq!(parse(b"\x1b[3~"), vec![k(KeyCode::Delete)]);
        assert_eq!(parse(b"\x1b[5~"), vec![k(KeyCode::PageUp)]);
        assert_eq!(parse(b"\x1b[15~"), vec![k(KeyCode::F(5))]);
        assert_eq!(parse(b"\x1b[24~"), vec![k(KeyCode::F(12))]);
        assert_eq!(parse(b"\x1b[11~"), vec![k(KeyCode::F(1))]);
    }

    #[test]
    fn back_tab() {
        assert_eq!(parse(b"\x1b[Z"), vec![km(KeyCode::Tab, Modifiers::SHIFT)]);
    }

    #[test]
    fn ss3_keys() {
        assert_eq!(parse(b"\x1bOP"), vec![k(KeyCode::F(1))]);
        assert_eq!(parse(b"\x1bOB"), vec![k(KeyCode::Down)]);
    }

    #[test]
    fn unknown_csi_is_skipped() {
        assert_eq!(parse(b"\x1b[99~a"), vec![k(KeyCode::Char('a'))]);
    }

    #[test]
    fn csi_split_across_reads() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[1;").is_empty());
        assert_eq!(p.advance(b"5A"), vec![km(KeyCode::Up, Modifiers::CTRL)]);
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    fn mouse(kind: MouseEventKind, x: u16, y: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            x,
            y,
            modifiers: Modifiers::empty(),
        })
    }

    #[test]
    fn sgr_press_release() {
        assert_eq!(parse(b"\x1b[<0;10;5M"), vec![mouse(
            MouseEventKind::Press(MouseButton::Left),
            9,
            4
        )]);
        assert_eq!(parse(b"\x1b[<2;1;1m"), vec![mouse(
            MouseEventKind::Release(MouseButton::Right),
            0,
            0
        )]);
    }

    #[test]
    fn sgr_wheel_and_motion() {
        assert_eq!(parse(b"\x1b[<64;3;3M"), vec![mouse(MouseEventKind::ScrollUp, 2, 2)]);
        assert_eq!(parse(b"\x1b[<65;3;3M"), vec![mouse(MouseEventKind::ScrollDown, 2, 2)]);
        assert_eq!(parse(b"\x1b[<35;3;3M"), vec![mouse(MouseEventKind::Move, 2, 2)]);
        assert_eq!(parse(b"\x1b[<32;3;3M"), vec![mouse(
            MouseEventKind::Drag(MouseButton::Left),
            2,
            2
        )]);
    }

    #[test]
    fn sgr_modifiers() {
        let events = parse(b"\x1b[<16;1;1M");
        let Event::Mouse(m) = events[0] else {
            panic!("expected mouse event");
        };
        assert_eq!(m.modifiers, Modifiers::CTRL);
    }

    #[test]
    fn sgr_incomplete_waits() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[<0;1").is_empty());
        assert_eq!(p.advance(b";1M").len(), 1);
    }
}
