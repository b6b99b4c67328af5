use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::debug;

use crate::configuration::{OpenMode, WriterConfig};

/// Consecutive `Interrupted` errors retried immediately before they count as failed attempts.
const INTERRUPT_RETRIES: u32 = 16;

/// Opens `path` for writing according to `mode`. Both modes create a missing file.
pub(crate) fn open_file(path: &Path, mode: OpenMode) -> anyhow::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        OpenMode::Append => options.append(true),
        OpenMode::Truncate => options.write(true).truncate(true),
    };
    options
        .open(path)
        .with_context(|| format!("could not open log file {}", path.display()))
}

/// The writer's output, with the retry policy applied to every write and flush.
pub(crate) struct Sink {
    out: Box<dyn Write + Send>,
    retries: u32,
    backoff: Duration,
}

impl Sink {
    pub(crate) fn new(out: Box<dyn Write + Send>, config: &WriterConfig) -> Self {
        Sink {
            out,
            retries: config.write_retries,
            backoff: config.retry_backoff,
        }
    }

    /// Writes all of `bytes`. A retry resumes after the bytes already written.
    pub(crate) fn write_entry(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut written = 0;
        while written < bytes.len() {
            let rest = &bytes[written..];
            written += self.with_retry(|out| match out.write(rest)? {
                0 => Err(io::ErrorKind::WriteZero.into()),
                n => Ok(n),
            })?;
        }
        Ok(())
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.with_retry(|out| out.flush())
    }

    fn with_retry<T>(
        &mut self,
        mut op: impl FnMut(&mut (dyn Write + Send)) -> io::Result<T>,
    ) -> io::Result<T> {
        let mut attempt = 0;
        let mut interrupts = 0;
        let mut delay = self.backoff;
        loop {
            match op(self.out.as_mut()) {
                Ok(value) => return Ok(value),
                Err(e)
                    if e.kind() == io::ErrorKind::Interrupted && interrupts < INTERRUPT_RETRIES =>
                {
                    interrupts += 1;
                }
                Err(e) if attempt >= self.retries => return Err(e),
                Err(e) => {
                    attempt += 1;
                    debug!(attempt, error = %e, "log sink write failed, retrying");
                    thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
            }
        }
    }
}
