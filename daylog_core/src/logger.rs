//! The per-namespace writer.
//!
//! Each call to [`Logger::log`] does, in order:
//! 1. format the line once from a single clock reading
//! 2. emit the colored line to the console
//! 3. append the plain line to `<dir>/<YYYY-MM-DD>.log`
//! 4. list the directory for `.log` files other than today's
//! 5. start a background compaction of those files if none is running
//!
//! Steps 2-4 fail loudly; a failed compaction is reported as an error line
//! and never blocks later calls.

use crate::archiver::{self, ArchiveGuard, ArchivePermit, ArchiveReport, Compressor};
use crate::clock::Clock;
use crate::color::ColorMap;
use crate::console::ConsoleSink;
use crate::format::{self, LogLine, LOG_EXTENSION};
use crate::{Error, Level, Result};
use fs2::FileExt;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

type ArchiveHandle = JoinHandle<Result<ArchiveReport>>;

/// Handle to one namespace's logger; clones share the same instance
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    namespace: String,
    directory: PathBuf,
    colors: ColorMap,
    compressor: Arc<dyn Compressor>,
    console: Arc<dyn ConsoleSink>,
    clock: Arc<dyn Clock>,
    guard: Arc<ArchiveGuard>,
    pending: Mutex<Option<ArchiveHandle>>,
}

/// Fully resolved construction parameters
pub(crate) struct LoggerParts {
    pub directory: PathBuf,
    pub colors: ColorMap,
    pub compressor: Arc<dyn Compressor>,
    pub console: Arc<dyn ConsoleSink>,
    pub clock: Arc<dyn Clock>,
    pub guard: Arc<ArchiveGuard>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("namespace", &self.inner.namespace)
            .field("directory", &self.inner.directory)
            .field("archiving", &self.inner.guard.is_busy())
            .finish()
    }
}

impl Logger {
    pub(crate) fn new(namespace: &str, parts: LoggerParts) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                namespace: namespace.to_string(),
                directory: parts.directory,
                colors: parts.colors,
                compressor: parts.compressor,
                console: parts.console,
                clock: parts.clock,
                guard: parts.guard,
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn directory(&self) -> &Path {
        &self.inner.directory
    }

    pub fn colors(&self) -> &ColorMap {
        &self.inner.colors
    }

    pub fn archive_path(&self) -> PathBuf {
        self.inner.directory.join(archiver::ARCHIVE_FILE_NAME)
    }

    /// True when both handles refer to the same instance
    pub fn ptr_eq(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether a compaction is currently running for this directory
    pub fn is_archiving(&self) -> bool {
        self.inner.guard.is_busy()
    }

    /// Write one line at `level`
    ///
    /// Non-string values can be passed through [`format::Inspect`].
    pub fn log(&self, level: Level, content: impl fmt::Display) -> Result<()> {
        let line = LogLine {
            level,
            timestamp: self.inner.clock.now(),
            namespace: &self.inner.namespace,
            body: format::single_line(&content.to_string()),
        };
        let plain = line.render();
        let today = line.file_name();

        self.inner
            .console
            .emit(&self.inner.colors.get(level).paint(&plain))?;
        self.append(&today, &plain)?;

        if !self.list_archivable(&today)?.is_empty() {
            self.start_archival(&today)?;
        }

        Ok(())
    }

    /// printf-style variant of [`Logger::log`] for string arguments
    pub fn logf<S: AsRef<str>>(&self, level: Level, content: &str, args: &[S]) -> Result<()> {
        self.log(level, format::printf(content, args))
    }

    pub fn verbose(&self, content: impl fmt::Display) -> Result<()> {
        self.log(Level::Verbose, content)
    }

    pub fn info(&self, content: impl fmt::Display) -> Result<()> {
        self.log(Level::Info, content)
    }

    pub fn warn(&self, content: impl fmt::Display) -> Result<()> {
        self.log(Level::Warning, content)
    }

    pub fn error(&self, content: impl fmt::Display) -> Result<()> {
        self.log(Level::Error, content)
    }

    /// `.log` files in the directory other than today's, sorted by name
    pub fn archivable_files(&self) -> Result<Vec<String>> {
        let today = format::log_file_name(self.inner.clock.now().date_naive());
        self.list_archivable(&today)
    }

    /// Block until the compaction started by an earlier `log` call finishes
    ///
    /// Returns `None` when no background compaction was started since the
    /// last call.
    pub fn wait_for_archival(&self) -> Option<Result<ArchiveReport>> {
        let handle = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()?;

        Some(
            handle
                .join()
                .unwrap_or_else(|_| Err(Error::Other("archival thread panicked".into()))),
        )
    }

    /// Compact archivable files on the calling thread
    ///
    /// Returns `Ok(None)` when there is nothing to archive or another
    /// compaction already holds the directory.
    pub fn archive_now(&self) -> Result<Option<ArchiveReport>> {
        let Some(permit) = self.inner.guard.try_acquire() else {
            tracing::debug!(namespace = %self.inner.namespace, "Compaction already running");
            return Ok(None);
        };

        let files = self.archivable_files()?;
        if files.is_empty() {
            return Ok(None);
        }

        self.run_archival(permit, files).map(Some)
    }

    fn append(&self, file_name: &str, line: &str) -> Result<()> {
        fs::create_dir_all(&self.inner.directory)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.inner.directory.join(file_name))?;

        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        // One locked write per line keeps concurrent appenders from interleaving
        file.lock_exclusive()?;
        let written = (&file).write_all(record.as_bytes());
        file.unlock()?;
        written?;

        Ok(())
    }

    fn list_archivable(&self, today: &str) -> Result<Vec<String>> {
        if !self.inner.directory.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.inner.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let is_log = Path::new(&name)
                .extension()
                .map_or(false, |ext| ext == LOG_EXTENSION);
            if is_log && name != today {
                files.push(name);
            }
        }

        files.sort();
        Ok(files)
    }

    fn start_archival(&self, today: &str) -> Result<()> {
        let Some(permit) = self.inner.guard.try_acquire() else {
            return Ok(());
        };

        // Rescan under the permit: a compaction that finished since our first
        // scan may already have removed those files
        let files = self.list_archivable(today)?;
        if files.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            namespace = %self.inner.namespace,
            files = ?files,
            "Starting background compaction"
        );

        let logger = self.clone();
        let handle = thread::Builder::new()
            .name(format!("daylog-archive-{}", self.inner.namespace))
            .spawn(move || logger.run_archival(permit, files))?;

        *self
            .inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);

        Ok(())
    }

    /// Compact `files` while holding `permit`
    ///
    /// The outcome line is written before the permit drops, so that line's
    /// own directory scan cannot start a second compaction.
    fn run_archival(&self, permit: ArchivePermit, files: Vec<String>) -> Result<ArchiveReport> {
        let inputs: Vec<PathBuf> = files
            .iter()
            .map(|name| self.inner.directory.join(name))
            .collect();

        let result = archiver::compact(&*self.inner.compressor, &self.archive_path(), &inputs);

        let reported = match &result {
            Ok(report) => self.info(report.summary()),
            Err(e) => self.error(format_args!("archival of {} failed: {}", files.join(", "), e)),
        };
        if let Err(e) = reported {
            tracing::warn!(
                namespace = %self.inner.namespace,
                "Could not record archival outcome: {}",
                e
            );
        }

        drop(permit);
        result
    }
}

/// Log a formatted line at a fixed level: `info!(logger, "hello {}", name)`
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::Level::Info, format_args!($($arg)+))
    };
}

/// Log a formatted line at [`Level::Verbose`]
#[macro_export]
macro_rules! verbose {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::Level::Verbose, format_args!($($arg)+))
    };
}

/// Log a formatted line at [`Level::Warning`]
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::Level::Warning, format_args!($($arg)+))
    };
}

/// Log a formatted line at [`Level::Error`]
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::Level::Error, format_args!($($arg)+))
    };
}
