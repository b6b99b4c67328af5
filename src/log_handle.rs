//! Producer handles onto a running log writer.

use std::io;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;

use crate::log_writer::Shared;

/// Lightweight, cloneable producer handle onto a [`LogWriter`](crate::log_writer::LogWriter).
///
/// A handle can outlive its writer. Entries appended once the writer has shut down are
/// rejected and counted, never written.
///
/// `LogHandle` also implements [`MakeWriter`], so it can be given to a `tracing-subscriber`
/// fmt layer: each formatted event becomes one entry. Events emitted by a drain thread (such
/// as its warning about a failed write) are counted as rejected and never queued, so a failing
/// sink cannot fill its own queue with reports about itself.
#[derive(Clone)]
pub struct LogHandle {
    shared: Arc<Shared>,
}

impl LogHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        LogHandle { shared }
    }

    /// Queues `entry` for writing and returns immediately. See
    /// [`LogWriter::append`](crate::log_writer::LogWriter::append).
    pub fn append(&self, entry: impl Into<String>) {
        self.shared.push(entry.into());
    }
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("counters", &self.shared.counters.snapshot())
            .finish()
    }
}

/// Buffers the bytes of one formatted event and appends them as a single entry when dropped.
#[derive(Debug)]
pub struct EntryWriter {
    handle: LogHandle,
    buf: Vec<u8>,
}

impl io::Write for EntryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EntryWriter {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            let bytes = std::mem::take(&mut self.buf);
            let entry = String::from_utf8(bytes)
                .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
            self.handle.shared.push_event(entry);
        }
    }
}

impl<'a> MakeWriter<'a> for LogHandle {
    type Writer = EntryWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EntryWriter {
            handle: self.clone(),
            buf: Vec::new(),
        }
    }
}
