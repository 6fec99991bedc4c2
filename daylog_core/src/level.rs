//! Severity levels.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log line.
///
/// Ordering is informational only; nothing filters on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[serde(alias = "debug")]
    Verbose,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl Level {
    /// All levels, lowest first
    pub const ALL: [Level; 4] = [Level::Verbose, Level::Info, Level::Warning, Level::Error];

    /// Single-letter tag that starts every line
    pub fn tag(self) -> char {
        match self {
            Level::Verbose => 'D',
            Level::Info => 'I',
            Level::Warning => 'W',
            Level::Error => 'E',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Level::Verbose => "verbose",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" | "debug" | "d" => Ok(Level::Verbose),
            "info" | "i" => Ok(Level::Info),
            "warning" | "warn" | "w" => Ok(Level::Warning),
            "error" | "e" => Ok(Level::Error),
            other => Err(Error::Config(format!("Unknown log level: {}", other))),
        }
    }
}
