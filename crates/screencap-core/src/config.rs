use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::status_bar::StatusBarMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Directory screenshots are saved to (defaults to the platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Status bar height in points
    #[serde(default = "default_status_bar_height")]
    pub status_bar_height: u32,

    /// How the status bar layer is produced
    #[serde(default)]
    pub status_bar: StatusBarMode,

    /// Wait for pending draws before whole-screen captures
    #[serde(default = "default_wait_for_updates")]
    pub wait_for_updates: bool,
}

fn default_status_bar_height() -> u32 {
    20
}
fn default_wait_for_updates() -> bool {
    true
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            status_bar_height: default_status_bar_height(),
            status_bar: StatusBarMode::default(),
            wait_for_updates: default_wait_for_updates(),
        }
    }
}

impl CaptureConfig {
    /// Default config file path for this platform
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = project_dirs() {
            dirs.config_dir().join("config.json")
        } else {
            PathBuf::from("screencap-config.json")
        }
    }

    /// Load config from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&data).with_context(|| "failed to parse config JSON")?;
        Ok(config)
    }

    /// Save config to a file path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Directory screenshots go to when none is given explicitly
    pub fn resolved_output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        match project_dirs() {
            Some(dirs) => dirs.data_dir().join("screenshots"),
            None => PathBuf::from("screenshots"),
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "screencap", "screencap")
}
