//! Config module.
//! Loads `minescan.json` (display, polling interval, debug output).
//! A missing file means defaults; a malformed one is an error.
//! Command-line flags override whatever the file says.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "minescan.json";

/// Directory used when `DEBUG_CAPTURE` is set and no `debug_dir` is configured.
const DEBUG_CAPTURE_DIR: &str = "screenshots";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Index of the display the board is on
    pub display: usize,
    /// Delay between refresh passes (milliseconds)
    pub poll_interval_ms: u64,
    /// Where calibration frames are saved, if anywhere
    pub debug_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: 0,
            poll_interval_ms: 500,
            debug_dir: None,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using default config", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Debug directory, honoring the `DEBUG_CAPTURE` environment variable.
    pub fn debug_dir(&self) -> Option<PathBuf> {
        self.debug_dir.clone().or_else(|| {
            env::var_os("DEBUG_CAPTURE").map(|_| PathBuf::from(DEBUG_CAPTURE_DIR))
        })
    }
}
