//! Routes `tracing` output through a [`LogWriter`].

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use time::{macros::format_description, OffsetDateTime, UtcOffset};
use tracing::{subscriber::set_global_default, Level, Subscriber};
use tracing_subscriber::{fmt::time::OffsetTime, FmtSubscriber};

use crate::configuration::WriterConfig;
use crate::log_handle::LogHandle;
use crate::log_writer::LogWriter;

/// Opens a timestamped log file in `dir` and installs a global `tracing` subscriber writing to
/// it through a [`LogWriter`].
///
/// Keep the returned writer alive for as long as events should be recorded; dropping it
/// flushes every queued event to the file.
///
/// # Errors
/// Returns an error if `dir` or the file cannot be created, or if a global subscriber is
/// already set.
pub fn init_logger(
    dir: impl AsRef<Path>,
    max_level: Level,
    config: WriterConfig,
) -> anyhow::Result<LogWriter> {
    if tracing::dispatcher::has_been_set() {
        bail!("a global tracing subscriber is already set");
    }

    let dir = dir.as_ref();
    fs::create_dir_all(dir)
        .with_context(|| format!("could not create log directory {}", dir.display()))?;

    let writer = LogWriter::with_config(dir.join(log_file_name("bot")), config)?;
    let subscriber = file_subscriber(writer.handle(), max_level);

    set_global_default(subscriber).context(
        "Could not set global default tracing subscriber. Consider disabling logs if you are already setting a subscriber.",
    )?;
    Ok(writer)
}

/// Builds a fmt subscriber without ANSI colors whose output goes to `handle`.
///
/// Useful with [`tracing::subscriber::with_default`] when a global subscriber is not wanted.
///
/// Events emitted on a drain thread are not queued (see [`LogHandle`]).
pub fn file_subscriber(
    handle: LogHandle,
    max_level: Level,
) -> impl Subscriber + Send + Sync + 'static {
    // Fails when other threads are already running on some platforms.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        local_offset,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    );

    FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_ansi(false)
        .with_timer(timer)
        .with_writer(handle)
        .finish()
}

/// Local time as `M-D-YYYY_HHMMSS` with `include_date`, `HHMMSS` otherwise.
///
/// Month and day are unpadded. Hour, minute and second are always two digits, so `HHMMSS`
/// has a fixed width and reads back unambiguously (`1-2-2024_010203`, not `1-2-2024_123`).
pub fn current_time_stamp(include_date: bool) -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let format = if include_date {
        format_description!("[month padding:none]-[day padding:none]-[year]_[hour][minute][second]")
    } else {
        format_description!("[hour][minute][second]")
    };
    now.format(format).unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// A log file name made of `prefix` and the current date and time.
pub fn log_file_name(prefix: &str) -> String {
    format!("{prefix}_{}.log", current_time_stamp(true))
}
