//! Console sinks for colored lines.

use std::io::{self, Write};
use std::sync::Mutex;

/// Destination for the colored copy of each line
pub trait ConsoleSink: Send + Sync {
    /// Emit one line; the sink adds the trailing newline
    fn emit(&self, line: &str) -> io::Result<()>;
}

/// Writes to the process's stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// Keeps emitted lines in memory
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<String>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines as emitted, escape sequences included
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Lines with color codes removed
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines()
            .iter()
            .map(|l| crate::color::strip_ansi(l))
            .collect()
    }
}

impl ConsoleSink for MemoryConsole {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut lines = self
            .lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        lines.push(line.to_string());
        Ok(())
    }
}
