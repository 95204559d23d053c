// SPDX-License-Identifier: MIT
//
// Randomized checks of the invariants the core promises: clipping, scroll
// preservation, pair reuse, quiet refreshes, wide-character atomicity and
// pushback order.

use std::collections::HashMap;
use std::iter;
use std::sync::{Mutex, MutexGuard, PoisonError};

use proptest::prelude::*;
use unicode_width::UnicodeWidthChar;

use k_screen::backend::memory::Op;
use k_screen::input::InputQueue;
use k_screen::pair::PairTable;
use k_screen::{Cell, Config, Event, MemoryBackend, Session, Window};

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

fn session(cols: u16, lines: u16) -> Session<MemoryBackend> {
    Session::init(MemoryBackend::new(cols, lines), &Config::default()).unwrap()
}

proptest! {
    // ── windows ──

    #[test]
    fn writes_never_leave_the_window(
        width in 1u16..=40,
        row in 0u16..3,
        text in "[a-z界 ]{0,120}",
    ) {
        let parent = Window::new(5, 44, 0, 0).unwrap();
        let mut sub = parent.derive(3, width, 1, 2).unwrap();
        sub.mv_add_str(row, 0, &text);

        for y in 0..5 {
            for x in 0..44 {
                let inside = (1..4).contains(&y) && (2..2 + width).contains(&x);
                if !inside {
                    prop_assert_eq!(parent.cell_at(y, x), Some(Cell::BLANK));
                }
            }
        }
    }

    #[test]
    fn scroll_moves_only_the_region(
        height in 2u16..12,
        a in any::<u16>(),
        b in any::<u16>(),
        k in any::<u16>(),
    ) {
        let top = a % height;
        let bottom = top + b % (height - top);
        let k = 1 + k % (bottom - top + 1);

        let mut win = Window::new(height, 6, 0, 0).unwrap();
        for y in 0..height {
            win.mv_add_str(y, 0, &format!("r{y:02}"));
        }
        let before: Vec<String> = (0..height).map(|y| win.line_text(y).unwrap()).collect();

        win.set_scrollok(true);
        prop_assert!(win.set_scroll_region(top, bottom));
        prop_assert!(win.scroll(i32::from(k)));

        for y in 0..height {
            let after = win.line_text(y).unwrap();
            if y < top || y > bottom {
                prop_assert_eq!(&after, &before[usize::from(y)]);
            } else if y + k <= bottom {
                prop_assert_eq!(&after, &before[usize::from(y + k)]);
            } else {
                prop_assert_eq!(after, "      ");
            }
        }
    }

    // ── color pairs ──

    #[test]
    fn same_colors_same_pair(requests in prop::collection::vec((0i16..8, 0i16..8), 1..60)) {
        let mut table = PairTable::new(256, 8);
        let mut seen = HashMap::new();
        for (fg, bg) in requests {
            let idx = table.alloc(fg, bg).unwrap();
            if let Some(prev) = seen.insert((fg, bg), idx) {
                prop_assert_eq!(prev, idx);
            }
        }
        prop_assert!(table.in_use() <= seen.len());

        table.reset();
        for &(fg, bg) in seen.keys() {
            prop_assert_eq!(table.find(fg, bg), None);
        }
    }

    // ── refresh ──

    #[test]
    fn second_refresh_is_silent(
        h in 1u16..6,
        w in 1u16..12,
        y in 0u16..6,
        x in 0u16..12,
        text in "[ -~界]{0,40}",
    ) {
        let _guard = serial();
        let mut s = session(12, 6);
        let mut win = s.new_window(h, w, y, x).unwrap();
        win.add_str(&text);
        s.wrefresh(&mut win).unwrap();

        s.backend_mut().take_ops();
        s.wrefresh(&mut win).unwrap();
        prop_assert!(s.backend().ops().is_empty());
    }

    #[test]
    fn wide_characters_are_sent_whole(
        writes in prop::collection::vec((0u16..3, 0u16..10, "[a界]{1,4}"), 1..8),
    ) {
        let _guard = serial();
        let mut s = session(10, 3);
        for (y, x, text) in writes {
            s.stdscr_mut().mv_add_str(y, x, &text);
            s.refresh().unwrap();

            for op in s.backend_mut().take_ops() {
                let Op::Write { glyphs, .. } = op else { continue };
                prop_assert!(glyphs.first().is_some_and(|g| g.ch != 0));
                for (i, glyph) in glyphs.iter().enumerate() {
                    if glyph.character().and_then(UnicodeWidthChar::width) == Some(2) {
                        prop_assert!(glyphs.get(i + 1).is_some_and(|g| g.ch == 0));
                    }
                }
            }
        }
        for y in 0..3 {
            prop_assert_eq!(s.backend().line_text(y), s.stdscr().line_text(y).unwrap());
        }
    }

    // ── input ──

    #[test]
    fn pushback_is_lifo_ahead_of_queue(
        queued in prop::collection::vec(any::<char>(), 0..10),
        pushed in prop::collection::vec(any::<char>(), 0..10),
    ) {
        let mut queue = InputQueue::new(64, 64);
        for &c in &queued {
            prop_assert!(queue.push(Event::Char(c)));
        }
        for &c in &pushed {
            prop_assert!(queue.unget(Event::Char(c)));
        }
        let out: Vec<Event> = iter::from_fn(|| queue.pop()).collect();
        let expected: Vec<Event> = pushed
            .iter()
            .rev()
            .chain(&queued)
            .map(|&c| Event::Char(c))
            .collect();
        prop_assert_eq!(out, expected);
    }
}
