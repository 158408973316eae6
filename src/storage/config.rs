//! Configuration handling for planline
//!
//! Configuration is stored in `.planline.toml` (project, found by walking
//! up from the working directory) and in the platform config directory
//! (global, e.g. `~/.config/planline/config.toml`). Project settings
//! override global ones; both are optional.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Effective configuration after merging global and project files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default plan file for one-shot commands
    pub plan_file: PathBuf,

    /// Normalize task ids to upper case at the CLI boundary
    pub uppercase_ids: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plan_file: PathBuf::from("tasks.txt"),
            uppercase_ids: true,
        }
    }
}

/// A partially-specified config file; unset keys fall through to the
/// previous layer
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    plan_file: Option<PathBuf>,
    uppercase_ids: Option<bool>,
}

impl ConfigOverlay {
    fn apply(self, config: &mut Config) {
        if let Some(plan_file) = self.plan_file {
            config.plan_file = plan_file;
        }
        if let Some(uppercase_ids) = self.uppercase_ids {
            config.uppercase_ids = uppercase_ids;
        }
    }
}

impl Config {
    /// Loads configuration for the given working directory.
    ///
    /// Layering, lowest to highest: built-in defaults, the global config
    /// file, the nearest `.planline.toml` in `cwd` or an ancestor.
    pub fn load(cwd: &Path) -> Result<Self> {
        let mut config = Config::default();

        if let Some(global) = Self::global_path() {
            if global.is_file() {
                Self::read_overlay(&global)?.apply(&mut config);
            }
        }

        if let Some(local) = Self::find_local(cwd) {
            Self::read_overlay(&local)?.apply(&mut config);
        }

        Ok(config)
    }

    /// Path of the global config file, if the platform provides one
    pub fn global_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "planline").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Finds the nearest `.planline.toml` in `start` or an ancestor
    pub fn find_local(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(".planline.toml"))
            .find(|candidate| candidate.is_file())
    }

    fn read_overlay(path: &Path) -> Result<ConfigOverlay> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }
}
