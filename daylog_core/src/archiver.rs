//! Compaction of rotated-out daily files into a single rolling archive.
//!
//! Inputs are added to the archive through a [`Compressor`]. Only after the
//! compressor reports success are the inputs deleted; on failure they stay
//! on disk and will be picked up by the next pass.

use crate::{timing, Error, Result};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Name of the cumulative archive inside each log directory
pub const ARCHIVE_FILE_NAME: &str = "archive.7z";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Adds files to an archive, creating it if needed
pub trait Compressor: Send + Sync {
    fn compress(&self, archive: &Path, inputs: &[PathBuf]) -> Result<()>;
}

/// How to invoke the external 7z binary
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveOptions {
    pub binary: PathBuf,
    pub archive_type: String,
    pub method: Vec<String>,
    pub timeout: Duration,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("7z"),
            archive_type: "7z".into(),
            method: vec!["-m0=lzma2".into(), "-mx=9".into()],
            timeout: Duration::from_secs(300),
        }
    }
}

/// Compressor backed by the `7z` command line tool
///
/// Runs `<binary> a -t<type> <method...> -y <archive> <inputs...>`, which
/// updates an existing archive in place.
#[derive(Clone, Debug, Default)]
pub struct SevenZip {
    options: ArchiveOptions,
}

impl SevenZip {
    pub fn new(options: ArchiveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    fn failure(archive: &Path, reason: impl Into<String>) -> Error {
        Error::Compression {
            archive: archive.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl Compressor for SevenZip {
    fn compress(&self, archive: &Path, inputs: &[PathBuf]) -> Result<()> {
        let mut cmd = Command::new(&self.options.binary);
        cmd.arg("a")
            .arg(format!("-t{}", self.options.archive_type))
            .args(&self.options.method)
            .arg("-y")
            .arg(archive)
            .args(inputs)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        tracing::debug!(
            binary = %self.options.binary.display(),
            archive = %archive.display(),
            inputs = inputs.len(),
            "Spawning compressor"
        );

        let mut child = cmd.spawn().map_err(|e| {
            Self::failure(
                archive,
                format!("cannot run {}: {}", self.options.binary.display(), e),
            )
        })?;

        // Drain stderr on the side so a chatty child never blocks on a full pipe
        let stderr = child.stderr.take();
        let reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf);
            }
            buf
        });

        let status = match wait_with_deadline(&mut child, self.options.timeout)? {
            Polled::Exited(status) => status,
            Polled::TimedOut => {
                return Err(Error::Timeout {
                    archive: archive.to_path_buf(),
                    timeout: self.options.timeout,
                })
            }
        };

        if status.success() {
            return Ok(());
        }

        let stderr = reader.join().unwrap_or_default();
        let tail: Vec<&str> = stderr.lines().rev().take(3).collect();
        let tail: Vec<&str> = tail.into_iter().rev().collect();
        Err(Self::failure(
            archive,
            format!("{} exited with {}: {}", self.options.binary.display(), status, tail.join(" / ")),
        ))
    }
}

/// The parts of a running process the deadline loop drives
trait Supervised {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
    fn kill(&mut self) -> io::Result<()>;
    fn wait(&mut self) -> io::Result<ExitStatus>;
}

impl Supervised for Child {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Child::try_wait(self)
    }

    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        Child::wait(self)
    }
}

enum Polled {
    Exited(ExitStatus),
    TimedOut,
}

/// Poll `child` until it exits or `timeout` elapses
///
/// On timeout, and when polling itself fails, the child is killed and reaped
/// before returning.
fn wait_with_deadline(child: &mut impl Supervised, timeout: Duration) -> io::Result<Polled> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Polled::Exited(status)),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(Polled::TimedOut);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                tracing::warn!("Lost track of compressor process: {}", e);
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }
    }
}

/// Single-slot guard: at most one compaction per log directory at a time
#[derive(Debug, Default)]
pub struct ArchiveGuard {
    busy: AtomicBool,
}

impl ArchiveGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot, or `None` if a compaction is already running
    pub fn try_acquire(self: &Arc<Self>) -> Option<ArchivePermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ArchivePermit {
                guard: Arc::clone(self),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of one compaction; releases the slot when dropped
#[derive(Debug)]
pub struct ArchivePermit {
    guard: Arc<ArchiveGuard>,
}

impl Drop for ArchivePermit {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// Outcome of a successful compaction
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveReport {
    pub archive: PathBuf,
    /// File names (not paths) that were archived and deleted
    pub files: Vec<String>,
    pub elapsed: Duration,
}

impl ArchiveReport {
    /// One-line summary used for the follow-up info line
    pub fn summary(&self) -> String {
        let archive = self
            .archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.archive.display().to_string());
        format!(
            "archived {} file(s) into {}: {}",
            self.files.len(),
            archive,
            self.files.join(", ")
        )
    }
}

/// Add `inputs` to `archive`, then delete them
///
/// Inputs are only deleted when the compressor succeeds. Every input is
/// attempted even if one deletion fails; the first failure is returned.
pub fn compact(
    compressor: &dyn Compressor,
    archive: &Path,
    inputs: &[PathBuf],
) -> Result<ArchiveReport> {
    let (compressed, elapsed) = timing::timed(|| compressor.compress(archive, inputs));
    compressed?;

    let mut first_error = None;
    for input in inputs {
        if let Err(e) = std::fs::remove_file(input) {
            tracing::warn!("Failed to remove archived file {:?}: {}", input, e);
            first_error.get_or_insert(e);
        }
    }
    if let Some(e) = first_error {
        return Err(Error::Io(e));
    }

    let files = inputs
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();

    tracing::info!(
        archive = %archive.display(),
        count = inputs.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Compaction finished"
    );

    Ok(ArchiveReport {
        archive: archive.to_path_buf(),
        files,
        elapsed,
    })
}

/// In-process compressor for tests: records calls and writes one archived
/// file name per line into the archive file.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub(crate) struct FakeCompressor {
        pub calls: Mutex<Vec<Vec<String>>>,
        pub fail: bool,
        pub delay: Duration,
        active: AtomicUsize,
        pub max_active: AtomicUsize,
    }

    impl FakeCompressor {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Compressor for FakeCompressor {
        fn compress(&self, archive: &Path, inputs: &[PathBuf]) -> Result<()> {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            thread::sleep(self.delay);

            let names: Vec<String> = inputs
                .iter()
                .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
                .collect();
            self.calls.lock().unwrap().push(names.clone());

            let result = if self.fail {
                Err(Error::Compression {
                    archive: archive.to_path_buf(),
                    reason: "simulated failure".into(),
                })
            } else {
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(archive)?;
                for name in &names {
                    writeln!(file, "{}", name)?;
                }
                Ok(())
            };

            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }
}
