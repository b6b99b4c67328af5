//! The asynchronous log writer.
//!
//! A [`LogWriter`] owns one sink and one background drain thread. Producers call
//! [`append`](LogWriter::append) (or [`LogHandle::append`]) from any thread; the call only takes
//! the queue lock and returns, while the drain thread moves entries to the sink in the order
//! they were queued.
//!
//! # Shutdown
//!
//! [`shutdown`](LogWriter::shutdown) (also run on drop) clears the liveness flag, closes the
//! queue, joins the drain thread and then writes whatever the drain thread had not picked up.
//! The sink is owned by the drain thread while it runs and handed back through its join
//! handle, so the final pass never shares it.
//!
//! # Example
//!
//! ```no_run
//! use botlog::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut log = LogWriter::open("bot.log", OpenMode::Truncate)?;
//!     log.append("game started\n");
//!
//!     let handle = log.handle();
//!     std::thread::spawn(move || handle.append("hello from another thread\n"))
//!         .join()
//!         .unwrap();
//!
//!     let stats = log.shutdown();
//!     assert_eq!(stats.written, 2);
//!     Ok(())
//! }
//! ```

use std::cell::Cell;
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, instrument, trace, warn};

use crate::configuration::{DrainMode, OpenMode, WriterConfig, WriterConfigBuilder};
use crate::log_handle::LogHandle;
use crate::pending_queue::{PendingQueue, Push};
use crate::sink::{open_file, Sink};
use crate::stats::{Counters, WriterStats};

/// State shared between the writer, its handles and the drain thread.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) queue: PendingQueue,
    active: AtomicBool,
    pub(crate) counters: Counters,
}

thread_local! {
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as writing to a sink until dropped.
struct DrainScope {
    previous: bool,
}

impl DrainScope {
    fn enter() -> Self {
        DrainScope {
            previous: DRAINING.with(|d| d.replace(true)),
        }
    }
}

impl Drop for DrainScope {
    fn drop(&mut self) {
        DRAINING.with(|d| d.set(self.previous));
    }
}

impl Shared {
    /// Queues a formatted `tracing` event. Events raised on a thread that is writing a sink
    /// are counted as rejected and never queued.
    pub(crate) fn push_event(&self, entry: String) {
        if DRAINING.with(Cell::get) {
            self.counters.rejected();
        } else {
            self.push(entry);
        }
    }

    pub(crate) fn push(&self, entry: String) {
        match self.queue.push_back(entry) {
            Push::Queued => self.counters.appended(),
            Push::DisplacedOldest => {
                self.counters.appended();
                self.counters.dropped();
            }
            Push::Dropped => self.counters.dropped(),
            Push::Rejected => self.counters.rejected(),
        }
    }
}

/// Writes appended entries to a file from a dedicated background thread.
///
/// Entries are written verbatim, without separators: append `"line\n"` to get lines.
pub struct LogWriter {
    shared: Arc<Shared>,
    drain: Option<JoinHandle<Drainer>>,
    path: Option<PathBuf>,
}

impl LogWriter {
    /// Opens `path` with `mode` and the default configuration.
    ///
    /// # Errors
    /// Returns an error (with the [`std::io::Error`] as root cause) if the file cannot be
    /// opened, or if the drain thread cannot be spawned.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> anyhow::Result<LogWriter> {
        let config = WriterConfigBuilder::new().with_open_mode(mode).build()?;
        Self::with_config(path, config)
    }

    /// Opens `path` with the open mode and queue settings of `config`.
    ///
    /// # Errors
    /// Same as [`LogWriter::open`].
    #[instrument(skip_all)]
    pub fn with_config(path: impl AsRef<Path>, config: WriterConfig) -> anyhow::Result<LogWriter> {
        let path = path.as_ref();
        debug!(path = %path.display(), ?config, "opening log sink");
        let file = open_file(path, config.open_mode)?;
        let mut writer = Self::from_sink(file, config)?;
        writer.path = Some(path.to_path_buf());
        Ok(writer)
    }

    /// Drains into an arbitrary writer instead of a file. The open mode of `config` is unused.
    ///
    /// # Errors
    /// Returns an error if the drain thread cannot be spawned.
    pub fn from_sink<W>(sink: W, config: WriterConfig) -> anyhow::Result<LogWriter>
    where
        W: Write + Send + 'static,
    {
        let shared = Arc::new(Shared {
            queue: PendingQueue::new(config.capacity, config.overflow),
            active: AtomicBool::new(true),
            counters: Counters::default(),
        });

        let drainer = Drainer {
            sink: Sink::new(Box::new(sink), &config),
            shared: shared.clone(),
            mode: config.drain_mode,
        };
        let poll_interval = config.poll_interval;
        let drain = thread::Builder::new()
            .name("log-writer".into())
            .spawn(move || drainer.run(poll_interval))
            .context("could not spawn log writer thread")?;

        Ok(LogWriter {
            shared,
            drain: Some(drain),
            path: None,
        })
    }

    /// Queues `entry` for writing and returns immediately.
    ///
    /// Never fails at the call site. Entries refused by the overflow policy, or appended after
    /// [`shutdown`](Self::shutdown), are counted in [`stats`](Self::stats).
    pub fn append(&self, entry: impl Into<String>) {
        self.shared.push(entry.into());
    }

    /// Returns a cloneable producer handle for other threads.
    pub fn handle(&self) -> LogHandle {
        LogHandle::new(self.shared.clone())
    }

    /// Current counters.
    pub fn stats(&self) -> WriterStats {
        self.shared.counters.snapshot()
    }

    /// Number of entries waiting for the drain thread.
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Path of the sink when it was opened by [`open`](Self::open) or
    /// [`with_config`](Self::with_config).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// True until [`shutdown`](Self::shutdown) is called.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Stops the drain thread, writes every entry still queued and closes the sink.
    ///
    /// Calling it again does nothing and returns the same counters.
    pub fn shutdown(&mut self) -> WriterStats {
        let Some(drain) = self.drain.take() else {
            return self.stats();
        };

        self.shared.active.store(false, Ordering::Release);
        self.shared.queue.close();

        match drain.join() {
            Ok(drainer) => drainer.finish(),
            Err(_) => {
                let queued = self.shared.queue.take(DrainMode::Batch).len() as u64;
                let lost = queued + self.shared.counters.take_in_flight();
                self.shared.counters.failed(lost);
                error!(lost, "log writer thread panicked, queued entries lost");
            }
        }

        let stats = self.stats();
        trace!(?stats, "log writer shut down");
        stats
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("path", &self.path)
            .field("active", &self.is_active())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Owner of the sink. Runs on the drain thread, then comes back for the final pass.
struct Drainer {
    sink: Sink,
    shared: Arc<Shared>,
    mode: DrainMode,
}

impl Drainer {
    fn run(mut self, poll_interval: Duration) -> Drainer {
        let _scope = DrainScope::enter();
        trace!("log writer thread started");
        while self.shared.active.load(Ordering::Acquire) {
            self.shared.queue.wait_for_entries(poll_interval);
            self.drain_queued();
        }
        trace!("log writer thread stopping");
        self
    }

    /// Writes what is queued right now, per the drain mode.
    fn drain_queued(&mut self) {
        match self.mode {
            DrainMode::Batch => {
                let batch = self.shared.queue.take(DrainMode::Batch);
                if !batch.is_empty() {
                    self.write_all(batch);
                    self.flush();
                }
            }
            DrainMode::PerEntry => loop {
                let entry = self.shared.queue.take(DrainMode::PerEntry);
                if entry.is_empty() {
                    break;
                }
                self.write_all(entry);
                self.flush();
            },
        }
    }

    /// Final pass after the thread was joined. The queue is closed, so this terminates.
    fn finish(mut self) {
        let _scope = DrainScope::enter();
        self.drain_queued();
    }

    fn write_all(&mut self, entries: VecDeque<String>) {
        self.shared.counters.begin_batch(entries.len() as u64);
        for entry in entries {
            let result = self.sink.write_entry(entry.as_bytes());
            self.shared.counters.settle_one();
            match result {
                Ok(()) => self.shared.counters.written(),
                Err(e) => {
                    self.shared.counters.failed(1);
                    warn!(error = %e, bytes = entry.len(), "dropping log entry after failed write");
                }
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.sink.flush() {
            self.shared.counters.flush_failed();
            warn!(error = %e, "log sink flush failed");
        }
    }
}
