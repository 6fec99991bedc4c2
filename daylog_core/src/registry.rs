//! Namespace to logger registry.
//!
//! The registry is an ordinary value owned by the application's composition
//! root and handed to whatever needs logging. The first `get` for a
//! namespace decides its options; later options for that namespace are
//! ignored.

use crate::archiver::{ArchiveGuard, Compressor, SevenZip};
use crate::clock::{Clock, SystemClock};
use crate::color::{ColorMap, ColorOverrides};
use crate::console::{ConsoleSink, StdoutConsole};
use crate::format::DEFAULT_NAMESPACE;
use crate::logger::{Logger, LoggerParts};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Directory under the application root used when no `log_dir` is given
pub const DEFAULT_LOG_SUBDIR: &str = "logs";

/// Creation options; unset fields fall back to the registry defaults, then
/// to the built-in defaults
#[derive(Clone, Default)]
pub struct LoggerOptions {
    pub colors: Option<ColorOverrides>,
    pub log_dir: Option<PathBuf>,
    pub compressor: Option<Arc<dyn Compressor>>,
    pub console: Option<Arc<dyn ConsoleSink>>,
    pub clock: Option<Arc<dyn Clock>>,
}

impl LoggerOptions {
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_colors(mut self, colors: ColorOverrides) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Fill unset fields from `fallback`
    fn or(self, fallback: &LoggerOptions) -> Self {
        Self {
            colors: self.colors.or_else(|| fallback.colors.clone()),
            log_dir: self.log_dir.or_else(|| fallback.log_dir.clone()),
            compressor: self.compressor.or_else(|| fallback.compressor.clone()),
            console: self.console.or_else(|| fallback.console.clone()),
            clock: self.clock.or_else(|| fallback.clock.clone()),
        }
    }
}

pub struct Registry {
    app_root: PathBuf,
    defaults: LoggerOptions,
    loggers: Mutex<HashMap<String, Logger>>,
    guards: Mutex<HashMap<PathBuf, Arc<ArchiveGuard>>>,
}

impl Registry {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self::with_defaults(app_root, LoggerOptions::default())
    }

    /// Registry whose loggers inherit `defaults` for any option they leave unset
    pub fn with_defaults(app_root: impl Into<PathBuf>, defaults: LoggerOptions) -> Self {
        Self {
            app_root: app_root.into(),
            defaults,
            loggers: Mutex::new(HashMap::new()),
            guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    /// Logger for `namespace`, created on first request
    pub fn get(&self, namespace: &str, options: Option<LoggerOptions>) -> Logger {
        let mut loggers = self
            .loggers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = loggers.get(namespace) {
            if options.is_some() {
                tracing::debug!(namespace, "Logger already exists, ignoring new options");
            }
            return existing.clone();
        }

        let logger = self.build(namespace, options.unwrap_or_default());
        tracing::debug!(
            namespace,
            directory = %logger.directory().display(),
            "Created logger"
        );
        loggers.insert(namespace.to_string(), logger.clone());
        logger
    }

    /// Logger named after the application manifest, or `default` if that
    /// cannot be read
    pub fn get_default(&self) -> Logger {
        let namespace = manifest_name(&self.app_root).unwrap_or_else(|e| {
            tracing::debug!("No application name ({}), using {:?}", e, DEFAULT_NAMESPACE);
            DEFAULT_NAMESPACE.to_string()
        });
        self.get(&namespace, None)
    }

    /// Registered namespaces, sorted
    pub fn namespaces(&self) -> Vec<String> {
        let loggers = self
            .loggers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = loggers.keys().cloned().collect();
        names.sort();
        names
    }

    fn build(&self, namespace: &str, options: LoggerOptions) -> Logger {
        let options = options.or(&self.defaults);

        let directory = options
            .log_dir
            .unwrap_or_else(|| self.default_directory(namespace));
        let colors = options
            .colors
            .as_ref()
            .map(ColorMap::with_overrides)
            .unwrap_or_default();

        Logger::new(
            namespace,
            LoggerParts {
                guard: self.guard_for(&directory),
                directory,
                colors,
                compressor: options
                    .compressor
                    .unwrap_or_else(|| Arc::new(SevenZip::default())),
                console: options.console.unwrap_or_else(|| Arc::new(StdoutConsole)),
                clock: options.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            },
        )
    }

    /// `<app_root>/logs` for the default namespace, `<app_root>/logs/<ns>` otherwise
    fn default_directory(&self, namespace: &str) -> PathBuf {
        let base = self.app_root.join(DEFAULT_LOG_SUBDIR);
        if namespace == DEFAULT_NAMESPACE {
            base
        } else {
            base.join(namespace)
        }
    }

    /// One guard per directory, so namespaces sharing a directory never
    /// compact it concurrently
    fn guard_for(&self, directory: &Path) -> Arc<ArchiveGuard> {
        let mut guards = self
            .guards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guards
            .entry(guard_key(directory))
            .or_insert_with(|| Arc::new(ArchiveGuard::new()))
            .clone()
    }
}

/// Canonical form of `directory`, so every spelling of one directory
/// (relative, `.`-laden, through a symlink) maps to the same guard
///
/// The directory may not exist yet: its deepest existing ancestor is
/// canonicalized and the missing tail is appended unchanged.
fn guard_key(directory: &Path) -> PathBuf {
    let absolute = if directory.is_absolute() {
        directory.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(directory),
            Err(_) => return directory.to_path_buf(),
        }
    };

    for ancestor in absolute.ancestors() {
        let Ok(real) = std::fs::canonicalize(ancestor) else {
            continue;
        };
        let tail = absolute.strip_prefix(ancestor).unwrap_or_else(|_| Path::new(""));
        return tail
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .fold(real, |key, c| key.join(c));
    }

    absolute
}

/// Application name from `Cargo.toml` (`[package].name`) or `package.json`
/// (`name`) in `app_root`
pub fn manifest_name(app_root: &Path) -> Result<String> {
    let cargo = app_root.join("Cargo.toml");
    if cargo.exists() {
        let manifest: toml::Value = toml::from_str(&std::fs::read_to_string(&cargo)?)?;
        return manifest
            .get("package")
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(String::from)
            .ok_or_else(|| Error::Config(format!("{:?} has no [package].name", cargo)));
    }

    let package = app_root.join("package.json");
    if package.exists() {
        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&package)?)?;
        return manifest
            .get("name")
            .and_then(|n| n.as_str())
            .map(String::from)
            .ok_or_else(|| Error::Config(format!("{:?} has no name", package)));
    }

    Err(Error::Config(format!("No manifest found in {:?}", app_root)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{LevelColor, NamedColor};
    use crate::console::MemoryConsole;
    use crate::Level;
    use std::fs;
    use std::thread;

    fn quiet(temp_dir: &tempfile::TempDir) -> Registry {
        Registry::with_defaults(
            temp_dir.path(),
            LoggerOptions::default().with_console(Arc::new(MemoryConsole::new())),
        )
    }

    #[test]
    fn test_same_namespace_same_instance() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = quiet(&temp_dir);

        let first = registry.get("api", None);
        let second = registry.get(
            "api",
            Some(LoggerOptions::default().with_log_dir(temp_dir.path().join("elsewhere"))),
        );

        assert!(first.ptr_eq(&second));
        // First call wins
        assert_eq!(second.directory(), temp_dir.path().join("logs").join("api"));
        assert!(!registry.get("worker", None).ptr_eq(&first));
        assert_eq!(registry.namespaces(), vec!["api", "worker"]);
    }

    #[test]
    fn test_concurrent_get_creates_one_instance() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(quiet(&temp_dir));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.get("shared", None))
            })
            .collect();
        let loggers: Vec<Logger> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(loggers.windows(2).all(|w| w[0].ptr_eq(&w[1])));
    }

    #[test]
    fn test_options_apply_on_creation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = quiet(&temp_dir);
        let colors = ColorOverrides {
            info: Some(LevelColor::Named(NamedColor::Magenta)),
            ..ColorOverrides::default()
        };

        let logger = registry.get(
            "custom",
            Some(
                LoggerOptions::default()
                    .with_log_dir(temp_dir.path().join("custom-logs"))
                    .with_colors(colors),
            ),
        );

        assert_eq!(logger.directory(), temp_dir.path().join("custom-logs"));
        assert_eq!(
            logger.colors().get(Level::Info),
            LevelColor::Named(NamedColor::Magenta)
        );
        assert_eq!(logger.colors().get(Level::Error), ColorMap::default().error);
    }

    #[test]
    fn test_default_from_cargo_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("Cargo.toml"),
            "[package]\nname = \"billing\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        let registry = quiet(&temp_dir);

        let logger = registry.get_default();

        assert_eq!(logger.namespace(), "billing");
        assert!(logger.ptr_eq(&registry.get("billing", None)));
    }

    #[test]
    fn test_default_from_package_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("package.json"), r#"{ "name": "frontend" }"#).unwrap();

        assert_eq!(manifest_name(temp_dir.path()).unwrap(), "frontend");
    }

    #[test]
    fn test_default_falls_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = quiet(&temp_dir);
        assert_eq!(registry.get_default().namespace(), DEFAULT_NAMESPACE);

        // Unreadable manifest also falls back
        let broken = tempfile::tempdir().unwrap();
        fs::write(broken.path().join("Cargo.toml"), "[package\nname=").unwrap();
        let registry = quiet(&broken);
        let logger = registry.get_default();
        assert_eq!(logger.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(logger.directory(), broken.path().join("logs"));
    }

    #[test]
    fn test_shared_directory_shares_guard() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = quiet(&temp_dir);
        let shared = temp_dir.path().join("shared");
        let a = registry.get("a", Some(LoggerOptions::default().with_log_dir(&shared)));
        let b = registry.get("b", Some(LoggerOptions::default().with_log_dir(&shared)));
        let c = registry.get("c", None);

        let guard = registry.guard_for(&shared);
        let _permit = guard.try_acquire().unwrap();

        assert!(a.is_archiving());
        assert!(b.is_archiving());
        assert!(!c.is_archiving());
    }

    #[test]
    fn test_differently_spelled_directory_shares_guard() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = quiet(&temp_dir);
        let existing = temp_dir.path().join("existing");
        fs::create_dir_all(&existing).unwrap();
        let missing = temp_dir.path().join("missing");

        let a = registry.get("a", Some(LoggerOptions::default().with_log_dir(&existing)));
        let b = registry.get(
            "b",
            Some(LoggerOptions::default().with_log_dir(temp_dir.path().join(".").join("existing"))),
        );
        let c = registry.get(
            "c",
            Some(LoggerOptions::default().with_log_dir(existing.join("..").join("existing"))),
        );
        let d = registry.get("d", Some(LoggerOptions::default().with_log_dir(&missing)));
        let e = registry.get(
            "e",
            Some(LoggerOptions::default().with_log_dir(temp_dir.path().join(".").join("missing"))),
        );

        let _existing_permit = registry.guard_for(&existing).try_acquire().unwrap();
        assert!(a.is_archiving() && b.is_archiving() && c.is_archiving());
        assert!(!d.is_archiving());

        let _missing_permit = registry.guard_for(&missing).try_acquire().unwrap();
        assert!(d.is_archiving() && e.is_archiving());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_shares_guard() {
        let temp_dir = tempfile::tempdir().unwrap();
        let registry = quiet(&temp_dir);
        let real = temp_dir.path().join("real");
        fs::create_dir_all(&real).unwrap();
        let link = temp_dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let direct = registry.get("direct", Some(LoggerOptions::default().with_log_dir(&real)));
        let linked = registry.get("linked", Some(LoggerOptions::default().with_log_dir(&link)));

        let _permit = registry.guard_for(&real).try_acquire().unwrap();
        assert!(direct.is_archiving());
        assert!(linked.is_archiving());
    }
}
