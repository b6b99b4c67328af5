use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::configuration::{DrainMode, OverflowPolicy};

/// Result of [`PendingQueue::push_back`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Push {
    Queued,
    /// Queued, and the oldest entry was discarded to make room.
    DisplacedOldest,
    /// Not queued: the queue stayed full.
    Dropped,
    /// Not queued: the queue is closed.
    Rejected,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<String>,
    closed: bool,
}

/// FIFO of entries waiting for the drain thread.
///
/// One mutex guards both ends. It is only held to check, push or detach entries, never
/// while writing to the sink.
#[derive(Debug)]
pub(crate) struct PendingQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
    overflow: OverflowPolicy,
}

impl PendingQueue {
    pub(crate) fn new(capacity: Option<usize>, overflow: OverflowPolicy) -> Self {
        PendingQueue {
            state: Mutex::new(QueueState::default()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            overflow,
        }
    }

    // Every critical section leaves the deque consistent, so a poisoned lock still guards
    // valid entries.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push_back(&self, entry: String) -> Push {
        let mut state = self.lock();
        if state.closed {
            return Push::Rejected;
        }

        let mut outcome = Push::Queued;
        if let Some(capacity) = self.capacity {
            if state.entries.len() >= capacity {
                match self.overflow {
                    OverflowPolicy::DropNewest => return Push::Dropped,
                    OverflowPolicy::DropOldest => {
                        state.entries.pop_front();
                        outcome = Push::DisplacedOldest;
                    }
                    OverflowPolicy::Block(timeout) => {
                        let (guard, _) = self
                            .not_full
                            .wait_timeout_while(state, timeout, |s| {
                                !s.closed && s.entries.len() >= capacity
                            })
                            .unwrap_or_else(PoisonError::into_inner);
                        state = guard;
                        if state.closed {
                            return Push::Rejected;
                        }
                        if state.entries.len() >= capacity {
                            return Push::Dropped;
                        }
                    }
                }
            }
        }

        state.entries.push_back(entry);
        drop(state);
        self.not_empty.notify_one();
        outcome
    }

    /// Detaches the entries to write next: the whole backlog in batch mode, the front entry
    /// otherwise. Returns an empty deque when nothing is queued.
    pub(crate) fn take(&self, mode: DrainMode) -> VecDeque<String> {
        let mut state = self.lock();
        let taken = match mode {
            DrainMode::Batch => std::mem::take(&mut state.entries),
            DrainMode::PerEntry => state.entries.pop_front().into_iter().collect(),
        };
        drop(state);
        if !taken.is_empty() {
            self.not_full.notify_all();
        }
        taken
    }

    /// Waits until an entry is queued, the queue is closed, or `timeout` elapsed.
    pub(crate) fn wait_for_entries(&self, timeout: Duration) {
        let state = self.lock();
        let _ = self
            .not_empty
            .wait_timeout_while(state, timeout, |s| s.entries.is_empty() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Stops accepting entries and wakes every waiter. Queued entries stay queued.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
