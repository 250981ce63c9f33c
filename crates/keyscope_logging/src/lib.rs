//! Shared logging setup for keyscope binaries.
//!
//! Each run logs to stderr and to a daily log file under
//! `$KEYSCOPE_HOME/logs` (default `~/.keyscope/logs`).

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Daily files kept in the logs directory; older ones are deleted on rotation.
const MAX_LOG_FILES: usize = 7;

/// Logging configuration shared by keyscope binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror debug output to stderr.
    pub verbose: bool,
    /// Level for keyscope crates when `RUST_LOG` is unset (default `info`).
    pub level: Option<&'a str>,
}

/// Flushes the file writer when dropped. Hold it until the process exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Filter directive for keyscope crates at `level`.
fn default_directive(level: &str) -> String {
    format!("keyscope={level},keyscope_logging={level}")
}

/// Initialize tracing with a daily log file and stderr output.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let log_dir = ensure_logs_dir()?;
    let appender = file_appender(&log_dir, config.app_name)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let level = config.level.unwrap_or(DEFAULT_LOG_LEVEL);
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));
    let console_filter = if config.verbose {
        EnvFilter::new(default_directive("debug"))
    } else {
        file_filter.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LogGuard { _file: guard })
}

/// `<dir>/<app_name>.<date>.log`, rotated daily.
fn file_appender(dir: &Path, app_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(app_name)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// Get the keyscope home directory: ~/.keyscope
pub fn keyscope_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("KEYSCOPE_HOME") {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".keyscope")
}

/// Get the logs directory: ~/.keyscope/logs
pub fn logs_dir() -> PathBuf {
    keyscope_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}
