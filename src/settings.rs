//! Persistent user settings
//!
//! Stored as JSON under the user config directory. Every field has a default,
//! so a missing file or a file written by an older version still loads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::library::TargetSize;
use crate::review::TogglePolicy;

/// Default display size (portrait phone screen)
pub const DEFAULT_TARGET_WIDTH: u32 = 1170;
pub const DEFAULT_TARGET_HEIGHT: u32 = 2532;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read or write settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    /// No `--library` and nothing in the settings file or the OS defaults.
    #[error("No photo folder given. Pass --library <DIR>.")]
    MissingLibrary,

    #[error("Could not determine user data directory")]
    NoDataDir,
}

/// Values the user can set once instead of passing flags every run.
///
/// Paths left unset fall back to the locations in [`crate::config`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Folder to review
    pub library: Option<PathBuf>,
    /// SQLite catalog location
    pub catalog: Option<PathBuf>,
    /// Where deleted photos are moved to
    pub trash_dir: Option<PathBuf>,
    pub toggle_policy: TogglePolicy,
    pub target_width: u32,
    pub target_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library: None,
            catalog: None,
            trash_dir: None,
            toggle_policy: TogglePolicy::default(),
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
        }
    }
}

impl Settings {
    /// `<config_dir>/photo-sweep/settings.json`
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir().or_else(dirs::home_dir)?;
        path.push("photo-sweep");
        path.push("settings.json");
        Some(path)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(json) => {
                let settings = Self::from_json(&json)?;
                tracing::debug!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Write settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, self.to_json()?).map_err(io_err)?;
        tracing::info!("💾 Settings saved to {}", path.display());
        Ok(())
    }

    pub fn target_size(&self) -> TargetSize {
        TargetSize::new(self.target_width, self.target_height)
    }
}
