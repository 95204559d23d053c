// SPDX-License-Identifier: MIT
//
// k-screen: the curses core of kurses.
//
// Applications draw into windows. Windows store cells that name a color
// pair rather than colors. Refreshing copies a window's changed cells
// onto a staged screen image, and an update sends the difference between
// the staged image and what the display shows to a backend, resolving
// pairs to colors on the way out.
//
//   Window ──stage──▶ Screen::staged ──diff──▶ Backend ──▶ display
//                          │                      ▲
//                          └──── PairTable ───────┘
//
// Input travels the other way: the backend reports raw key and mouse
// events, the normalizer folds them into curses-style events, and the
// session queues them for `getch`.

pub mod backend;
pub mod buffer;
pub mod cell;
pub mod config;
pub mod error;
pub mod input;
pub mod pair;
pub mod palette;
pub mod refresh;
pub mod session;
pub mod touch;
pub mod window;

pub use backend::{AnsiBackend, Backend, MemoryBackend, RawEvent};
pub use cell::Cell;
pub use config::Config;
pub use error::{Error, Result};
pub use input::{Event, InputMode, Key, MouseAction, MouseEvent, MouseMask};
pub use k_term::color::CellColor;
pub use k_term::glyph::Attr;
pub use palette::DEFAULT_COLOR;
pub use refresh::RefreshStats;
pub use session::Session;
pub use window::Window;
