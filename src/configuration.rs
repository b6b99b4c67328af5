//! Config for the log writer behaviors
//!
//! This module provides configuration options for controlling how a
//! [`LogWriter`](crate::log_writer::LogWriter) opens its sink, buffers entries and drains them.
//!
//! Configuration can be created programmatically using [`WriterConfigBuilder::new()`] or by
//! reading environment variables using [`WriterConfigBuilder::from_env()`].
//!
//! # Environment Variables
//!
//! All values are optional and case-insensitive. Unset or unparsable values keep the default.
//!
//! - `BOTLOG_MODE`: `append` or `truncate` (default: `truncate`)
//! - `BOTLOG_POLL_MS`: drain thread poll interval in milliseconds (default: `1`)
//! - `BOTLOG_CAPACITY`: maximum queued entries, or `unbounded` (default: `65536`)
//! - `BOTLOG_OVERFLOW`: `drop-oldest`, `drop-newest` or `block` (default: `drop-newest`)
//! - `BOTLOG_BLOCK_MS`: how long `block` waits for room, in milliseconds (default: `10`)
//! - `BOTLOG_DRAIN`: `batch` or `per-entry` (default: `batch`)
//! - `BOTLOG_WRITE_RETRIES`: retries for a failed write before dropping the entry (default: `3`)
//! - `BOTLOG_RETRY_BACKOFF_MS`: first retry delay, doubled on each retry (default: `1`)
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use botlog::configuration::{OverflowPolicy, WriterConfigBuilder};
//!
//! let config = WriterConfigBuilder::new()
//!     .with_capacity(1_024)
//!     .with_overflow(OverflowPolicy::Block(Duration::from_millis(5)))
//!     .with_poll_interval(Duration::from_millis(2))
//!     .build()
//!     .unwrap();
//! assert_eq!(config.capacity(), Some(1_024));
//! ```

use std::{env, str::FromStr, time::Duration};

use anyhow::bail;
use tracing::warn;

/// Default number of entries the pending queue may hold.
pub const DEFAULT_CAPACITY: usize = 65_536;

/// How the sink file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Keep existing content and write after it. Creates the file if missing.
    Append,
    /// Create the file, discarding any existing content.
    #[default]
    Truncate,
}

impl FromStr for OpenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "append" => Ok(OpenMode::Append),
            "truncate" => Ok(OpenMode::Truncate),
            other => Err(format!("unknown open mode '{other}'")),
        }
    }
}

/// What [`append`](crate::log_writer::LogWriter::append) does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Discard the oldest queued entry to make room for the new one.
    DropOldest,
    /// Discard the entry being appended.
    #[default]
    DropNewest,
    /// Wait up to the given duration for the drain thread to make room, then discard the
    /// entry being appended.
    Block(Duration),
}

impl FromStr for OverflowPolicy {
    type Err = String;

    /// `block` uses a 10ms timeout, see [`WriterConfigBuilder::from_env`] for `BOTLOG_BLOCK_MS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop-oldest" | "drop_oldest" => Ok(OverflowPolicy::DropOldest),
            "drop-newest" | "drop_newest" => Ok(OverflowPolicy::DropNewest),
            "block" => Ok(OverflowPolicy::Block(Duration::from_millis(10))),
            other => Err(format!("unknown overflow policy '{other}'")),
        }
    }
}

/// How many entries the drain thread takes per lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainMode {
    /// Detach the whole backlog at once, write it, flush once.
    #[default]
    Batch,
    /// Take one entry per lock acquisition and flush after each entry.
    PerEntry,
}

impl FromStr for DrainMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "batch" => Ok(DrainMode::Batch),
            "per-entry" | "per_entry" => Ok(DrainMode::PerEntry),
            other => Err(format!("unknown drain mode '{other}'")),
        }
    }
}

/// How many entries the queue may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capacity {
    Bounded(usize),
    Unbounded,
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Bounded(DEFAULT_CAPACITY)
    }
}

/// Validated log writer configuration. Built by [`WriterConfigBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    pub(crate) open_mode: OpenMode,
    pub(crate) poll_interval: Duration,
    pub(crate) capacity: Option<usize>,
    pub(crate) overflow: OverflowPolicy,
    pub(crate) drain_mode: DrainMode,
    pub(crate) write_retries: u32,
    pub(crate) retry_backoff: Duration,
}

impl WriterConfig {
    /// Open mode used by [`LogWriter::with_config`](crate::log_writer::LogWriter::with_config).
    pub fn open_mode(&self) -> OpenMode {
        self.open_mode
    }

    /// Maximum time the drain thread waits between two checks of the queue.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Maximum number of queued entries, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Policy applied when the queue is full.
    pub fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Drain style of the background thread.
    pub fn drain_mode(&self) -> DrainMode {
        self.drain_mode
    }

    /// Number of retries for a failed write.
    pub fn write_retries(&self) -> u32 {
        self.write_retries
    }

    /// Delay before the first retry. Doubled after each failed attempt.
    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            open_mode: OpenMode::default(),
            poll_interval: Duration::from_millis(1),
            capacity: Some(DEFAULT_CAPACITY),
            overflow: OverflowPolicy::default(),
            drain_mode: DrainMode::default(),
            write_retries: 3,
            retry_backoff: Duration::from_millis(1),
        }
    }
}

/// A builder for [`WriterConfig`].
///
/// By default the sink is truncated, the drain thread polls every millisecond, the queue holds
/// up to [`DEFAULT_CAPACITY`] entries and drops new entries when full, entries are drained in
/// batches and a failed write is retried three times.
#[derive(Debug, Default, Clone)]
pub struct WriterConfigBuilder {
    open_mode: Option<OpenMode>,
    poll_interval: Option<Duration>,
    capacity: Capacity,
    overflow: Option<OverflowPolicy>,
    drain_mode: Option<DrainMode>,
    write_retries: Option<u32>,
    retry_backoff: Option<Duration>,
}

impl WriterConfigBuilder {
    /// Creates a builder holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder configured from `BOTLOG_*` environment variables.
    ///
    /// See the [module documentation](self) for the list of variables.
    #[must_use]
    pub fn from_env() -> Self {
        fn parse_var<T: FromStr>(var: &str) -> Option<T>
        where
            T::Err: std::fmt::Display,
        {
            let raw = env::var(var).ok()?;
            match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("ignoring {var}={raw:?}: {e}");
                    None
                }
            }
        }

        let capacity = match env::var("BOTLOG_CAPACITY") {
            Ok(raw) if raw.trim().eq_ignore_ascii_case("unbounded") => Capacity::Unbounded,
            Ok(_) => parse_var::<usize>("BOTLOG_CAPACITY")
                .map(Capacity::Bounded)
                .unwrap_or_default(),
            Err(_) => Capacity::default(),
        };

        let overflow = parse_var::<OverflowPolicy>("BOTLOG_OVERFLOW").map(|policy| {
            match (policy, parse_var::<u64>("BOTLOG_BLOCK_MS")) {
                (OverflowPolicy::Block(_), Some(ms)) => {
                    OverflowPolicy::Block(Duration::from_millis(ms))
                }
                (policy, _) => policy,
            }
        });

        WriterConfigBuilder {
            open_mode: parse_var("BOTLOG_MODE"),
            poll_interval: parse_var::<u64>("BOTLOG_POLL_MS").map(Duration::from_millis),
            capacity,
            overflow,
            drain_mode: parse_var("BOTLOG_DRAIN"),
            write_retries: parse_var("BOTLOG_WRITE_RETRIES"),
            retry_backoff: parse_var::<u64>("BOTLOG_RETRY_BACKOFF_MS").map(Duration::from_millis),
        }
    }

    /// Sets how the sink file is opened.
    #[must_use]
    pub fn with_open_mode(self, mode: OpenMode) -> Self {
        Self {
            open_mode: Some(mode),
            ..self
        }
    }

    /// Sets the maximum time the drain thread waits between two checks of the queue.
    #[must_use]
    pub fn with_poll_interval(self, interval: Duration) -> Self {
        Self {
            poll_interval: Some(interval),
            ..self
        }
    }

    /// Sets the maximum number of queued entries.
    #[must_use]
    pub fn with_capacity(self, capacity: usize) -> Self {
        Self {
            capacity: Capacity::Bounded(capacity),
            ..self
        }
    }

    /// Lets the queue grow without limit. `append` then never drops.
    ///
    /// A producer outrunning the sink grows memory until the process runs out.
    #[must_use]
    pub fn unbounded(self) -> Self {
        Self {
            capacity: Capacity::Unbounded,
            ..self
        }
    }

    /// Sets what happens to an entry appended while the queue is full.
    #[must_use]
    pub fn with_overflow(self, policy: OverflowPolicy) -> Self {
        Self {
            overflow: Some(policy),
            ..self
        }
    }

    /// Sets how many entries the drain thread takes per lock acquisition.
    #[must_use]
    pub fn with_drain_mode(self, mode: DrainMode) -> Self {
        Self {
            drain_mode: Some(mode),
            ..self
        }
    }

    /// Sets how many times a failed write is retried before the entry is dropped.
    #[must_use]
    pub fn with_write_retries(self, retries: u32) -> Self {
        Self {
            write_retries: Some(retries),
            ..self
        }
    }

    /// Sets the delay before the first retry of a failed write.
    #[must_use]
    pub fn with_retry_backoff(self, backoff: Duration) -> Self {
        Self {
            retry_backoff: Some(backoff),
            ..self
        }
    }

    /// Consumes the builder and returns the [`WriterConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error when the capacity or the poll interval is zero.
    pub fn build(self) -> anyhow::Result<WriterConfig> {
        let defaults = WriterConfig::default();

        let capacity = match self.capacity {
            Capacity::Bounded(0) => bail!("queue capacity must be at least 1"),
            Capacity::Bounded(n) => Some(n),
            Capacity::Unbounded => None,
        };

        let poll_interval = self.poll_interval.unwrap_or(defaults.poll_interval);
        if poll_interval.is_zero() {
            bail!("poll interval must be non-zero");
        }

        Ok(WriterConfig {
            open_mode: self.open_mode.unwrap_or(defaults.open_mode),
            poll_interval,
            capacity,
            overflow: self.overflow.unwrap_or(defaults.overflow),
            drain_mode: self.drain_mode.unwrap_or(defaults.drain_mode),
            write_retries: self.write_retries.unwrap_or(defaults.write_retries),
            retry_backoff: self.retry_backoff.unwrap_or(defaults.retry_backoff),
        })
    }
}
