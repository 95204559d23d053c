// SPDX-License-Identifier: MIT
//
// Error type for the curses core.
//
// Every fallible operation returns `Result<T>`. A few failures can only
// happen while a session is being set up; those are "fatal" in curses
// tradition and carry the process exit code `init_or_exit` uses.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A session is already live in this process.
    #[error("a screen session is already active")]
    AlreadyActive,

    /// The backend could not open the display.
    #[error("failed to open the display: {0}")]
    DisplayOpen(#[source] io::Error),

    /// The display is smaller than the configured minimum.
    #[error("terminal is {lines}x{cols}, need at least {min_lines}x{min_cols}")]
    TooSmall {
        lines: u16,
        cols: u16,
        min_lines: u16,
        min_cols: u16,
    },

    /// A cell buffer could not be allocated.
    #[error("cannot allocate a {width}x{height} cell buffer")]
    OutOfMemory { width: u16, height: u16 },

    /// A window region falls outside its parent or the screen.
    #[error("region {height}x{width} at ({y}, {x}) is outside its parent")]
    OutOfBounds { y: u16, x: u16, height: u16, width: u16 },

    #[error("color {0} is out of range")]
    InvalidColor(i16),

    #[error("color pair {0} is out of range")]
    InvalidPair(u16),

    /// The color-pair table has no slots beyond the default pair.
    #[error("no color pairs available")]
    NoPairsAvailable,

    #[error("unget stack is full")]
    UngetOverflow,

    /// The backend failed during output or input.
    #[error("backend I/O failed: {0}")]
    Backend(#[from] io::Error),

    /// A refresh was requested while another one was running.
    #[error("refresh already in progress")]
    RefreshInProgress,

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The backend cannot do what was asked (more colors than it has, ...).
    #[error("not supported by this backend: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error, raised during initialization, ends the program
    /// under the default policy.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DisplayOpen(_) | Self::TooSmall { .. } | Self::OutOfMemory { .. }
        )
    }

    /// Process exit code for fatal initialization errors.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DisplayOpen(_) => 8,
            Self::TooSmall { .. } => 4,
            Self::OutOfMemory { .. } => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_have_distinct_exit_codes() {
        let open = Error::DisplayOpen(io::Error::other("no tty"));
        let small = Error::TooSmall {
            lines: 1,
            cols: 80,
            min_lines: 2,
            min_cols: 2,
        };
        let oom = Error::OutOfMemory {
            width: 10,
            height: 10,
        };
        assert!(open.is_fatal() && small.is_fatal() && oom.is_fatal());
        assert_eq!(open.exit_code(), 8);
        assert_eq!(small.exit_code(), 4);
        assert_eq!(oom.exit_code(), 2);
    }

    #[test]
    fn ordinary_errors_are_not_fatal() {
        assert!(!Error::AlreadyActive.is_fatal());
        assert!(!Error::InvalidPair(3).is_fatal());
        assert_eq!(Error::UngetOverflow.exit_code(), 1);
    }

    #[test]
    fn messages_name_the_problem() {
        let e = Error::TooSmall {
            lines: 1,
            cols: 1,
            min_lines: 2,
            min_cols: 2,
        };
        assert_eq!(e.to_string(), "terminal is 1x1, need at least 2x2");
        assert_eq!(Error::InvalidColor(300).to_string(), "color 300 is out of range");
    }
}
