// SPDX-License-Identifier: MIT
//
// k-term: terminal layer for kurses.
//
// Everything below the curses core lives here: the resolved glyph that
// is pushed to the terminal, color encodings, ANSI escape generation, a
// stateful writer that skips redundant escapes, the raw input byte
// parser, and raw-mode terminal control.
//
// The curses core (k-screen) never writes bytes itself. It resolves its
// cells into glyphs and hands runs of them to a backend, which uses this
// crate to turn them into the fewest bytes that produce the same screen.

pub mod ansi;
pub mod color;
pub mod glyph;
pub mod input;
pub mod output;
pub mod reader;
pub mod terminal;
