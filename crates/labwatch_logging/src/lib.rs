//! Shared logging utilities for labwatch binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "labwatch=info,labwatch_db=info,labwatch_backend=info";
const MAX_LOG_FILES: usize = 7;

/// Logging configuration shared by labwatch binaries.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
}

/// Keeps the background file writer alive. Drop it only at process exit,
/// otherwise buffered lines are lost.
#[must_use = "dropping the guard stops the log file writer"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard")
            .field("file_writer", &self._file.is_some())
            .finish()
    }
}

/// Initialize tracing with a daily rolling file writer and stderr output.
///
/// A missing or unwritable log directory degrades to stderr-only logging
/// rather than failing startup.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let file_filter = env_filter();
    let console_filter = if config.verbose {
        EnvFilter::new(verbose_filter(DEFAULT_LOG_FILTER))
    } else {
        env_filter()
    };

    let (file_layer, guard) = match ensure_logs_dir() {
        Ok(dir) => {
            let appender = file_appender(dir, config.app_name)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        Err(err) => {
            eprintln!("Warning: file logging disabled: {err:#}");
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _file: guard })
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Rewrites every `target=level` directive to `debug`.
fn verbose_filter(filter: &str) -> String {
    filter
        .split(',')
        .map(|directive| match directive.split_once('=') {
            Some((target, _)) => format!("{target}=debug"),
            None => "debug".to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn file_appender(dir: PathBuf, app_name: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(sanitize_name(app_name))
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&dir)
        .with_context(|| format!("Failed to open log file in {}", dir.display()))
}

/// Get the labwatch home directory: ~/.labwatch (or `$LABWATCH_HOME`).
pub fn labwatch_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("LABWATCH_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".labwatch"))
        .context("Could not determine home directory")
}

/// Get the logs directory: ~/.labwatch/logs
pub fn logs_dir() -> Result<PathBuf> {
    Ok(labwatch_home()?.join("logs"))
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_filter_raises_every_target() {
        assert_eq!(
            verbose_filter("labwatch=info,labwatch_db=warn"),
            "labwatch=debug,labwatch_db=debug"
        );
        assert_eq!(verbose_filter("info"), "debug");
    }

    #[test]
    fn sanitize_name_replaces_path_characters() {
        assert_eq!(sanitize_name("lab watch/1"), "lab_watch_1");
        assert_eq!(sanitize_name("labwatch-daemon"), "labwatch-daemon");
    }

    #[test]
    fn file_appender_creates_log_in_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let appender = file_appender(dir.path().to_path_buf(), "labwatch");
        assert!(appender.is_ok());
    }
}
