//! Persistent user settings.
//!
//! A small TOML file under the user's config directory. Every field has a
//! default, so a missing or partial file always loads. `MASKLAB_HOME`
//! relocates both the config and the data directory, which the tests and
//! portable installs rely on.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::editor::DEFAULT_EDITOR_CMD;
use masklab_core::model::{DEFAULT_MIN_VOXELS, DEFAULT_TOLERANCE};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_username")]
    pub username: String,
    /// Pass thresholds used outside any classroom.
    #[serde(default = "default_min_voxels")]
    pub solo_min_voxels: u64,
    #[serde(default = "default_tolerance")]
    pub solo_tolerance: u64,
    #[serde(default = "default_editor_cmd")]
    pub editor_cmd: String,
    /// Shared directory holding the classroom tree, when joined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_code: Option<String>,
    /// Overrides the default per-user data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_string())
}

fn default_min_voxels() -> u64 {
    DEFAULT_MIN_VOXELS
}

fn default_tolerance() -> u64 {
    DEFAULT_TOLERANCE
}

fn default_editor_cmd() -> String {
    DEFAULT_EDITOR_CMD.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: default_username(),
            solo_min_voxels: DEFAULT_MIN_VOXELS,
            solo_tolerance: DEFAULT_TOLERANCE,
            editor_cmd: default_editor_cmd(),
            share_root: None,
            class_code: None,
            data_dir: None,
        }
    }
}

/// Root under which config and default data live. `MASKLAB_HOME` wins;
/// otherwise `~/.config/masklab`.
pub fn config_home() -> PathBuf {
    if let Ok(home) = std::env::var("MASKLAB_HOME") {
        return PathBuf::from(home);
    }
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|_| PathBuf::from("."));
    base.join("masklab")
}

pub fn config_path() -> PathBuf {
    config_home().join(CONFIG_FILE)
}

impl Settings {
    /// Load from the default location; absent file yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings at {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self).context("failed to serialize settings")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }

    /// Where this user's cases and attempt ledgers live.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| config_home().join("data"))
    }
}
