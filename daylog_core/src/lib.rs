#![forbid(unsafe_code)]

//! Namespaced, leveled logging to the console and to daily files.
//!
//! This crate provides:
//! - A registry handing out one logger per namespace
//! - Colored console output and append-only `<YYYY-MM-DD>.log` files (UTC)
//! - Background compaction of older files into a rolling `archive.7z`
//! - Configuration, environment overrides and diagnostics setup

pub mod error;
pub mod level;
pub mod color;
pub mod format;
pub mod console;
pub mod clock;
pub mod env;
pub mod timing;
pub mod archiver;
pub mod logger;
pub mod registry;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use level::Level;
pub use color::{ColorMap, ColorOverrides, Hsl, LevelColor, NamedColor};
pub use format::{printf, Inspect, DEFAULT_NAMESPACE};
pub use console::{ConsoleSink, MemoryConsole, StdoutConsole};
pub use clock::{Clock, FixedClock, SystemClock};
pub use archiver::{ArchiveOptions, ArchiveReport, Compressor, SevenZip, ARCHIVE_FILE_NAME};
pub use logger::Logger;
pub use registry::{LoggerOptions, Registry};
pub use config::Config;
