// SPDX-License-Identifier: GPL-3.0-only

//! Persistent user configuration
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/qrscan/config.json`. A missing file
//! yields the defaults; a malformed one is logged and ignored.

use crate::backends::camera::types::Facing;
use crate::constants::{APP_NAME, capture, decode};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Capture resolution preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSettings {
    /// Resolution width
    pub width: u32,
    /// Resolution height
    pub height: u32,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            width: capture::DEFAULT_WIDTH,
            height: capture::DEFAULT_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Facing direction used when the scanner starts
    pub preferred_facing: Facing,
    /// Last camera that streamed successfully
    pub last_camera_path: Option<String>,
    /// Ring the terminal bell when a new code is accepted
    pub feedback_enabled: bool,
    /// Command run to share a result; the text is appended as the last argument
    pub share_command: Option<Vec<String>>,
    /// Minimum spacing between decoded frames in milliseconds
    pub scan_interval_ms: u64,
    /// Frames are downscaled to this size before decoding
    pub max_decode_dimension: u32,
    /// How many hardware zoom steps one key press moves
    pub zoom_step_multiplier: u32,
    /// Preferred capture resolution
    pub preferred_format: FormatSettings,
    /// Write logs here instead of stderr while the terminal UI is active
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_facing: Facing::Environment,
            last_camera_path: None,
            feedback_enabled: true,
            share_command: None,
            scan_interval_ms: decode::DEFAULT_SCAN_INTERVAL.as_millis() as u64,
            max_decode_dimension: decode::DEFAULT_MAX_DIMENSION,
            zoom_step_multiplier: 1,
            preferred_format: FormatSettings::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.json"))
    }

    /// Load the config from the default location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Save the config to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("no config directory available".to_string()))?;
        self.save_to(&path)
    }

    /// Save the config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Config(e.to_string()))?;
        }
        let contents =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, contents).map_err(|e| AppError::Config(e.to_string()))?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Decode sampling interval as a duration (never zero)
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }
}
