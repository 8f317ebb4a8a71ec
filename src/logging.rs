//! Tracing setup shared by the server and the terminal client.
//!
//! Each launch writes one file, `logs/{prefix}_{timestamp}.log`, under the
//! application directory and keeps the newest [`MAX_LOG_FILES`] per prefix.
//! The filter comes from `DTREES_LOG`, then `RUST_LOG`, then `info`.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs::{AppDirError, AppPaths};

pub const MAX_LOG_FILES: usize = 10;
pub const LOG_FILTER_ENV: &str = "DTREES_LOG";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file time: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// How a binary wants its logs.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    /// Log file prefix. Retention is counted per prefix.
    pub prefix: &'static str,
    /// Mirror records to stderr. The terminal client leaves this off so its
    /// own output stays readable.
    pub console: bool,
}

/// Install the global subscriber and return the log file path.
///
/// A second call in the same process is a no-op returning `None`.
pub fn init(options: LogOptions) -> Result<Option<PathBuf>, LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(None);
    }
    let dir = AppPaths::resolve()?.logs_dir()?;
    let path = dir.join(log_file_name(options.prefix, now_local_or_utc())?);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| LoggingError::OpenFile {
            path: path.clone(),
            source,
        })?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let timer = local_timer();
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer.clone())
        .with_writer(file_writer);
    let console_layer = options.console.then(|| {
        fmt::layer()
            .with_timer(timer)
            .with_writer(std::io::stderr)
    });
    let subscriber = Registry::default()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    let _ = LOG_GUARD.set(guard);

    prune_old_logs(&dir, options.prefix, MAX_LOG_FILES);
    tracing::info!(path = %path.display(), "Logging initialized");
    Ok(Some(path))
}

/// Remove the oldest `{prefix}_*.log` files beyond `keep`. Timestamped names
/// sort chronologically, so name order is age order.
fn prune_old_logs(dir: &Path, prefix: &str, keep: usize) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "Failed to list log directory");
            return;
        }
    };
    let stem = format!("{prefix}_");
    let mut logs = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(&stem) && name.ends_with(".log"))
        .collect::<Vec<_>>();
    logs.sort();
    let excess = logs.len().saturating_sub(keep);
    for name in &logs[..excess] {
        let path = dir.join(name);
        if let Err(err) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %err, "Failed to remove old log file");
        }
    }
}

fn log_file_name(prefix: &str, now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    Ok(format!("{prefix}_{}.log", now.format(NAME_FORMAT)?))
}

fn local_timer() -> fmt::time::OffsetTime<&'static [FormatItem<'static>]> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT)
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
