//! Settings file loading
//!
//! Settings live in one YAML file, by default
//! `<config dir>/vaultgraph/config.yaml`. Every field is optional:
//!
//! ```yaml
//! vault:
//!   document_extension: md
//!   mirror_bare_tags: false
//! layout:
//!   tag_link_distance: 100
//!   velocity_damping: 0.9
//! tick_period_ms: 30
//! ```

use crate::layout::{LayoutError, LayoutParams, ParamOverride};
use crate::vault::VaultConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Result type for settings operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub vault: VaultConfig,
    pub layout: LayoutParams,
    /// Layout tick period
    pub tick_period_ms: u64,
    /// Capacity of the file change queue
    pub change_queue_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault: VaultConfig::default(),
            layout: LayoutParams::default(),
            tick_period_ms: 30,
            change_queue_capacity: crate::runtime::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Settings {
    /// `<config dir>/vaultgraph/config.yaml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vaultgraph").join("config.yaml"))
    }

    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        // An empty file deserializes to unit, not to a mapping
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(text)?;
        settings.layout.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&text)?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load from an explicit path, else from the default path if it exists
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Apply command-line layout overrides on top of the file values
    pub fn with_overrides(mut self, overrides: &[ParamOverride]) -> ConfigResult<Self> {
        self.layout.apply(overrides)?;
        Ok(self)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms.max(1))
    }
}
