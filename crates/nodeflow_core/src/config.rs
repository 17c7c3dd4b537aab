// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration, stored as RON.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Errors while loading or saving a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for this schema
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// The file was written by a newer version
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },
}

/// What to do when a second connection targets an input that already has one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FanInPolicy {
    /// Refuse the connection
    #[default]
    Reject,
    /// Keep every connection; the last one propagated wins
    LastWriteWins,
}

/// Scene behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Re-evaluate whenever an attribute in the scene changes
    #[serde(default = "default_true")]
    pub auto_evaluate: bool,
    /// Fan-in handling for connections
    #[serde(default)]
    pub fan_in: FanInPolicy,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            auto_evaluate: true,
            fan_in: FanInPolicy::Reject,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Undo history behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Oldest entries are dropped beyond this many; unbounded when absent
    #[serde(default)]
    pub max_depth: Option<usize>,
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Scene settings
    #[serde(default)]
    pub scene: SceneConfig,
    /// History settings
    #[serde(default)]
    pub history: HistoryConfig,
    /// Default `tracing` filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_version() -> u32 {
    CONFIG_FORMAT_VERSION
}

fn default_log_filter() -> String {
    "nodeflow=info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            scene: SceneConfig::default(),
            history: HistoryConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from RON text
    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(content)?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }

        Ok(config)
    }

    /// Render as pretty RON
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }
}
