//! Error types for the daylog_core library.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for daylog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred (directory creation, append, deletion, console)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Environment variable missing or invalid
    #[error("Environment variable {name}: {reason}")]
    Env { name: String, reason: String },

    /// External compression engine failed
    #[error("Compression of {archive:?} failed: {reason}")]
    Compression { archive: PathBuf, reason: String },

    /// External compression engine did not finish in time
    #[error("Compression of {archive:?} timed out after {timeout:?}")]
    Timeout { archive: PathBuf, timeout: Duration },

    /// Generic error
    #[error("{0}")]
    Other(String),
}
