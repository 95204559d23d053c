// SPDX-License-Identifier: MIT
//
// Session configuration.
//
// Read from TOML. Every key is optional and unknown keys are ignored, so
// an empty file (or no file at all) gives curses' usual behavior:
//
//   [input]
//   mode = "blocking"            # or "non-blocking", or { timed = 5 }
//   queue_capacity = 512
//   unget_limit = 256
//   click_interval_ms = 166
//   mouse_mask = ["clicked", "wheel-up", "wheel-down"]
//
//   [screen]
//   tab_size = 8
//   min_lines = 2
//   min_cols = 2
//   preserve = false             # skip the initial full repaint
//
//   [colors]
//   max_pairs = 256              # cap below what the backend offers

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::input::{InputMode, MouseAction, MouseMask};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "KURSES_CONFIG";

/// File looked for in the working directory when the variable is unset.
pub const CONFIG_FILE: &str = "kurses.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub screen: ScreenConfig,
    pub colors: ColorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub mode: InputMode,
    /// Events buffered between reads before new ones are dropped.
    pub queue_capacity: usize,
    /// Depth of the `ungetch` stack.
    pub unget_limit: usize,
    /// Longest press-to-release gap still reported as a click.
    pub click_interval_ms: u64,
    /// Mouse actions reported at startup. Empty disables the mouse.
    pub mouse_mask: Vec<MouseAction>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mode: InputMode::Blocking,
            queue_capacity: 512,
            unget_limit: 256,
            click_interval_ms: 166,
            mouse_mask: Vec::new(),
        }
    }
}

impl InputConfig {
    #[must_use]
    pub const fn click_interval(&self) -> Duration {
        Duration::from_millis(self.click_interval_ms)
    }

    #[must_use]
    pub fn mask(&self) -> MouseMask {
        self.mouse_mask
            .iter()
            .fold(MouseMask::empty(), |mask, action| mask | action.mask())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub tab_size: u16,
    pub min_lines: u16,
    pub min_cols: u16,
    /// Assume the terminal already shows blanks and skip the first clear.
    pub preserve: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            tab_size: 8,
            min_lines: 2,
            min_cols: 2,
            preserve: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Upper bound on color pairs; the backend's own limit still applies.
    pub max_pairs: Option<u16>,
}

impl Config {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigParse`] if the text is not valid TOML for this shape.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// [`Error::ConfigRead`] if the file cannot be read,
    /// [`Error::ConfigParse`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(target: "k_screen::config", path = %path.display(), "loaded config");
        Ok(config)
    }

    /// `$KURSES_CONFIG`, else `./kurses.toml` if present, else defaults.
    ///
    /// # Errors
    ///
    /// Propagates [`Config::load`] errors for a file that exists (or was
    /// named explicitly) but cannot be used.
    pub fn discover() -> Result<Self> {
        match discover_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

fn discover_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(CONFIG_FILE);
    local.is_file().then_some(local)
}
