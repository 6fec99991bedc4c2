//! Configuration file support for daylog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/daylog/config.toml`.
//! `DAYLOG_DIR` and `DAYLOG_ARCHIVE_TIMEOUT` override the file.

use crate::archiver::{ArchiveOptions, SevenZip};
use crate::color::ColorOverrides;
use crate::registry::LoggerOptions;
use crate::{env, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding `logging.log_dir`
pub const LOG_DIR_ENV: &str = "DAYLOG_DIR";

/// Environment variable overriding `archive.timeout_secs`
pub const ARCHIVE_TIMEOUT_ENV: &str = "DAYLOG_ARCHIVE_TIMEOUT";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Where and how lines are written
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingConfig {
    /// Directory for the dated files; defaults to `<app_root>/logs[/<ns>]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Application root; defaults to the working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_root: Option<PathBuf>,

    #[serde(default)]
    pub colors: ColorOverrides,
}

/// External compressor settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ArchiveConfig {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_archive_type")]
    pub archive_type: String,

    #[serde(default = "default_method")]
    pub method: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            archive_type: default_archive_type(),
            method: default_method(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// Default value functions
fn default_binary() -> PathBuf {
    ArchiveOptions::default().binary
}

fn default_archive_type() -> String {
    ArchiveOptions::default().archive_type
}

fn default_method() -> Vec<String> {
    ArchiveOptions::default().method
}

fn default_timeout_secs() -> f64 {
    ArchiveOptions::default().timeout.as_secs_f64()
}

impl ArchiveConfig {
    pub fn to_options(&self) -> Result<ArchiveOptions> {
        let timeout = Duration::try_from_secs_f64(self.timeout_secs).map_err(|e| {
            Error::Config(format!(
                "archive.timeout_secs must be a non-negative number, got {}: {}",
                self.timeout_secs, e
            ))
        })?;

        Ok(ArchiveOptions {
            binary: self.binary.clone(),
            archive_type: self.archive_type.clone(),
            method: self.method.clone(),
            timeout,
        })
    }
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".config"))
                .unwrap_or_else(|| PathBuf::from(".config"))
        });
        base.join("daylog").join("config.toml")
    }

    /// Save the configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Apply `DAYLOG_DIR` and `DAYLOG_ARCHIVE_TIMEOUT` if they are set
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(dir) = env::optional_string(LOG_DIR_ENV)? {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = env::optional_float(ARCHIVE_TIMEOUT_ENV)? {
            self.archive.timeout_secs = secs;
        }
        Ok(self)
    }

    /// Application root, falling back to the working directory
    pub fn app_root(&self) -> Result<PathBuf> {
        match &self.logging.app_root {
            Some(root) => Ok(root.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    /// Registry-wide logger defaults described by this configuration
    pub fn logger_options(&self) -> Result<LoggerOptions> {
        let compressor = SevenZip::new(self.archive.to_options()?);
        let mut options = LoggerOptions::default()
            .with_colors(self.logging.colors.clone())
            .with_compressor(Arc::new(compressor));
        options.log_dir = self.logging.log_dir.clone();
        Ok(options)
    }
}
