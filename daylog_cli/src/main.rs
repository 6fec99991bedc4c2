use chrono::Utc;
use clap::{Parser, Subcommand};
use daylog_core::format::log_file_name;
use daylog_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "daylog")]
#[command(about = "Leveled logging to daily files with rolling archives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the log directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Application root (manifest lookup and default log directory)
    #[arg(long, global = true)]
    app_root: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one line; CONTENT may contain %s, %d, %i, %f, %j, %o directives
    Log {
        /// Severity (verbose, info, warn, error)
        #[arg(short, long, default_value = "info")]
        level: Level,

        /// Namespace (defaults to the application name)
        #[arg(short, long)]
        namespace: Option<String>,

        content: String,

        /// Positional arguments substituted into CONTENT
        args: Vec<String>,
    },

    /// Compact every file older than today into the archive now
    Archive {
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// List daily files and whether they are due for archival
    Files {
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

fn main() -> Result<()> {
    daylog_core::logging::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .with_env_overrides()?;
    if let Some(dir) = cli.log_dir {
        config.logging.log_dir = Some(dir);
    }
    let app_root = match cli.app_root {
        Some(root) => root,
        None => config.app_root()?,
    };

    let registry = Registry::with_defaults(app_root, config.logger_options()?);

    match cli.command {
        Commands::Log {
            level,
            namespace,
            content,
            args,
        } => cmd_log(&logger_for(&registry, namespace), level, &content, &args),
        Commands::Archive { namespace } => cmd_archive(&logger_for(&registry, namespace)),
        Commands::Files { namespace } => cmd_files(&logger_for(&registry, namespace)),
    }
}

fn logger_for(registry: &Registry, namespace: Option<String>) -> Logger {
    match namespace {
        Some(ns) => registry.get(&ns, None),
        None => registry.get_default(),
    }
}

fn cmd_log(logger: &Logger, level: Level, content: &str, args: &[String]) -> Result<()> {
    logger.logf(level, content, args)?;

    // The process must outlive a compaction it started
    if let Some(Err(e)) = logger.wait_for_archival() {
        tracing::warn!("Archival did not complete: {}", e);
    }

    Ok(())
}

fn cmd_archive(logger: &Logger) -> Result<()> {
    match logger.archive_now()? {
        Some(report) => {
            println!(
                "✓ Archived {} file(s) into {}",
                report.files.len(),
                report.archive.display()
            );
        }
        None => println!("Nothing to archive."),
    }
    Ok(())
}

fn cmd_files(logger: &Logger) -> Result<()> {
    let dir = logger.directory();
    println!("Directory: {}", dir.display());

    if !dir.exists() {
        println!("  (no log files yet)");
        return Ok(());
    }

    let today = log_file_name(Utc::now().date_naive());
    let archivable = logger.archivable_files()?;

    if dir.join(&today).exists() {
        println!("  {}  (today)", today);
    }
    for name in &archivable {
        println!("  {}  (archivable)", name);
    }

    let archive = logger.archive_path();
    if archive.exists() {
        println!("  {}  ({} bytes)", ARCHIVE_FILE_NAME, std::fs::metadata(&archive)?.len());
    }

    Ok(())
}
