//! Configuration management for ClipDeck
//!
//! This module handles loading, validating, and managing configuration
//! for the clip and link stores and their storage backend.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Supported log levels
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Validation error
    #[error("Config validation failed: {0}")]
    Validation(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Clipboard history configuration
    #[serde(default)]
    pub clips: ClipsConfig,

    /// Quick links configuration
    #[serde(default)]
    pub links: LinksConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Which persistence backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per key under `data_dir`
    File,
    /// In-process only, nothing survives a restart
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend used by all stores
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Directory holding the JSON files of the file backend
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Clipboard history configuration
///
/// These are the defaults; settings persisted by the store itself take
/// precedence once they exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipsConfig {
    /// Maximum number of clips kept in history
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Clips unused for this many days are purged on startup (0 disables)
    #[serde(default = "default_auto_delete_after_days")]
    pub auto_delete_after_days: u32,

    /// Whether front ends should notify on capture
    #[serde(default = "default_enable_notifications")]
    pub enable_notifications: bool,
}

/// Quick links configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Maximum number of links kept; default links are never evicted
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

// Default value functions
fn default_backend() -> StorageBackend {
    StorageBackend::File
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.local/share/clipdeck")
}

fn default_max_items() -> usize {
    100
}

fn default_auto_delete_after_days() -> u32 {
    7
}

fn default_enable_notifications() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ClipsConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            auto_delete_after_days: default_auto_delete_after_days(),
            enable_notifications: default_enable_notifications(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            clips: ClipsConfig::default(),
            links: LinksConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Checks in order:
    /// 1. Path from CLIPDECK_CONFIG environment variable
    /// 2. ~/.config/clipdeck/config.toml
    /// 3. Falls back to defaults if none exists
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::find_config_path() {
            Self::load_from_path(&path)
        } else {
            let mut config = Self::default();
            config.expand_paths();
            Ok(config)
        }
    }

    /// Load configuration with optional custom path
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml_str)?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("clipdeck").join("config.toml"))
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CLIPDECK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        Self::default_path().filter(|p| p.exists())
    }

    /// Expand tilde in paths
    fn expand_paths(&mut self) {
        self.storage.data_dir = expand_path(&self.storage.data_dir);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, max_items) in [("clips", self.clips.max_items), ("links", self.links.max_items)] {
            if max_items < 1 {
                return Err(ConfigError::Validation(format!(
                    "{}.max_items must be at least 1",
                    section
                )));
            }
            if max_items > 10_000 {
                return Err(ConfigError::Validation(format!(
                    "{}.max_items must not exceed 10000",
                    section
                )));
            }
        }

        if self.clips.auto_delete_after_days > 3650 {
            return Err(ConfigError::Validation(
                "clips.auto_delete_after_days must not exceed 3650".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "log_level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Write configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Write a commented example configuration to `path`
    pub fn write_example(path: &Path, force: bool) -> Result<(), ConfigError> {
        if !force && path.exists() {
            return Err(ConfigError::Validation(
                "Config file already exists. Use --force to overwrite.".to_string(),
            ));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::generate_example())?;
        Ok(())
    }

    /// Generate example configuration file
    pub fn generate_example() -> String {
        let config = Config::default();

        format!(
            r#"# ClipDeck Configuration File
# Location: ~/.config/clipdeck/config.toml

# Logging level (trace, debug, info, warn, error)
log_level = "{}"

# Storage settings
[storage]
# "file" keeps one JSON file per store, "memory" keeps nothing on exit
backend = "file"
# Directory for the file backend
data_dir = "{}"

# Clipboard history settings
[clips]
# Number of clips to keep
max_items = {}
# Purge clips unused for this many days on startup (0 disables)
auto_delete_after_days = {}
# Notify when a clip is captured
enable_notifications = {}

# Quick links settings
[links]
# Number of links to keep (default links are never evicted)
max_items = {}
"#,
            config.log_level,
            config.storage.data_dir.display(),
            config.clips.max_items,
            config.clips.auto_delete_after_days,
            config.clips.enable_notifications,
            config.links.max_items,
        )
    }
}

/// Expand tilde in path
fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(path_str.as_ref());
    PathBuf::from(expanded.into_owned())
}
