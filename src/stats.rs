//! Counters describing what happened to appended entries.

use std::sync::atomic::{AtomicU64, Ordering};

/// A snapshot of a writer's counters.
///
/// Every entry handed to `append` ends up in exactly one of `written`, `dropped`, `failed`
/// or `rejected` once the writer has shut down. An entry displaced by
/// [`OverflowPolicy::DropOldest`](crate::configuration::OverflowPolicy::DropOldest) was
/// `appended` first and then `dropped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriterStats {
    /// Entries accepted into the queue.
    pub appended: u64,
    /// Entries fully written to the sink.
    pub written: u64,
    /// Entries discarded by the overflow policy.
    pub dropped: u64,
    /// Entries abandoned after every write retry failed.
    pub failed: u64,
    /// Entries appended after shutdown started.
    pub rejected: u64,
    /// Sink flushes that still failed after every retry.
    pub flush_failures: u64,
}

impl WriterStats {
    /// Number of entries that will never reach the sink.
    pub fn lost(&self) -> u64 {
        self.dropped + self.failed + self.rejected
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    appended: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    flush_failures: AtomicU64,
    /// Entries detached from the queue whose write has not finished yet.
    in_flight: AtomicU64,
}

impl Counters {
    pub(crate) fn appended(&self) {
        self.appended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self, n: u64) {
        self.failed.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn flush_failed(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn begin_batch(&self, n: u64) {
        self.in_flight.store(n, Ordering::Relaxed);
    }

    pub(crate) fn settle_one(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Entries a panicked drain thread had detached but never accounted for.
    pub(crate) fn take_in_flight(&self) -> u64 {
        self.in_flight.swap(0, Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self) -> WriterStats {
        WriterStats {
            appended: self.appended.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
        }
    }
}
