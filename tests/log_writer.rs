use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use botlog::prelude::*;
use tempfile::TempDir;

fn scratch(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    (dir, path)
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn writes_entries_in_call_order() {
    let (_dir, path) = scratch("order.log");
    let mut log = LogWriter::open(&path, OpenMode::Truncate).unwrap();
    for i in 0..500 {
        log.append(format!("entry {i}\n"));
    }
    let stats = log.shutdown();

    let expected: Vec<_> = (0..500).map(|i| format!("entry {i}")).collect();
    assert_eq!(read_lines(&path), expected);
    assert_eq!(stats.appended, 500);
    assert_eq!(stats.written, 500);
    assert_eq!(stats.lost(), 0);
}

#[test]
fn shutdown_racing_the_drain_thread_loses_nothing() {
    for round in 0..20 {
        let (_dir, path) = scratch("race.log");
        let config = WriterConfigBuilder::new()
            .with_poll_interval(Duration::from_millis(if round % 2 == 0 { 1 } else { 500 }))
            .build()
            .unwrap();
        let mut log = LogWriter::with_config(&path, config).unwrap();
        for i in 0..1_000 {
            log.append(format!("{i}\n"));
        }
        log.shutdown();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1_000, "round {round}");
        assert_eq!(lines.last().map(String::as_str), Some("999"));
    }
}

#[test]
fn dropping_the_writer_flushes() {
    let (_dir, path) = scratch("drop.log");
    {
        let log = LogWriter::open(&path, OpenMode::Truncate).unwrap();
        log.append("one\n");
        log.append("two\n");
    }
    assert_eq!(read_lines(&path), ["one", "two"]);
}

#[test]
fn second_shutdown_is_a_no_op() {
    let (_dir, path) = scratch("twice.log");
    let mut log = LogWriter::open(&path, OpenMode::Truncate).unwrap();
    log.append("only once\n");

    let first = log.shutdown();
    let second = log.shutdown();
    drop(log);

    assert_eq!(first, second);
    assert_eq!(read_lines(&path), ["only once"]);
}

#[test]
fn concurrent_producers_each_keep_program_order() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 1_000;

    let (_dir, path) = scratch("concurrent.log");
    let mut log = LogWriter::open(&path, OpenMode::Truncate).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let producers: Vec<_> = (0..THREADS)
        .map(|t| {
            let handle = log.handle();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    handle.append(format!("producer-{t} seq-{i} payload-{}\n", t * i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    let stats = log.shutdown();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), THREADS * PER_THREAD);
    assert_eq!(stats.written, (THREADS * PER_THREAD) as u64);

    let mut next: HashMap<usize, usize> = HashMap::new();
    for line in &lines {
        let mut parts = line.split(' ');
        let t: usize = parts.next().unwrap()["producer-".len()..].parse().unwrap();
        let i: usize = parts.next().unwrap()["seq-".len()..].parse().unwrap();
        assert_eq!(line, &format!("producer-{t} seq-{i} payload-{}", t * i));

        let expected = next.entry(t).or_insert(0);
        assert_eq!(i, *expected, "producer {t} out of order");
        *expected += 1;
    }
    assert!(next.values().all(|&n| n == PER_THREAD));
}

#[test]
fn empty_writer_leaves_empty_file() {
    let (_dir, path) = scratch("empty.log");
    let mut log = LogWriter::open(&path, OpenMode::Truncate).unwrap();
    let stats = log.shutdown();

    assert_eq!(stats, WriterStats::default());
    assert_eq!(fs::read(&path).unwrap(), b"");
}

#[test]
fn idle_writer_picks_up_entry_quickly() {
    let (_dir, path) = scratch("latency.log");
    let log = LogWriter::open(&path, OpenMode::Truncate).unwrap();
    thread::sleep(Duration::from_millis(20));

    log.append("ping\n");
    let deadline = Instant::now() + Duration::from_secs(2);
    while fs::read_to_string(&path).unwrap() != "ping\n" {
        assert!(Instant::now() < deadline, "entry not written in time");
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(log.pending(), 0);
}

#[test]
fn open_failure_is_reported_at_construction() {
    let (_dir, path) = scratch("no/such/dir/bot.log");
    let err = LogWriter::open(&path, OpenMode::Append).unwrap_err();

    assert!(err.downcast_ref::<io::Error>().is_some());
    assert!(format!("{err:#}").contains("bot.log"));
}

#[test]
fn append_mode_keeps_previous_run() {
    let (_dir, path) = scratch("runs.log");
    fs::write(&path, "previous run\n").unwrap();

    let log = LogWriter::open(&path, OpenMode::Append).unwrap();
    log.append("this run\n");
    drop(log);
    assert_eq!(read_lines(&path), ["previous run", "this run"]);

    let log = LogWriter::open(&path, OpenMode::Truncate).unwrap();
    log.append("fresh\n");
    drop(log);
    assert_eq!(read_lines(&path), ["fresh"]);
}

/// A sink whose writes block until released, so the queue can be filled deterministically.
#[derive(Clone)]
struct GatedSink {
    out: Arc<Mutex<Vec<u8>>>,
    gate: Arc<(Mutex<bool>, std::sync::Condvar)>,
}

impl GatedSink {
    fn new() -> Self {
        GatedSink {
            out: Arc::default(),
            gate: Arc::new((Mutex::new(false), std::sync::Condvar::new())),
        }
    }

    fn open(&self) {
        *self.gate.0.lock().unwrap() = true;
        self.gate.1.notify_all();
    }

    fn contents(&self) -> String {
        String::from_utf8(self.out.lock().unwrap().clone()).unwrap()
    }
}

impl Write for GatedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (lock, cvar) = &*self.gate;
        let _open = cvar.wait_while(lock.lock().unwrap(), |open| !*open).unwrap();
        self.out.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Appends one entry, waits until the drain thread holds it inside the gated sink, then
/// appends `rest` and releases the gate.
fn fill_behind_stuck_entry(config: WriterConfig, rest: &[&str]) -> (String, WriterStats) {
    let sink = GatedSink::new();
    let mut log = LogWriter::from_sink(sink.clone(), config).unwrap();

    log.append("stuck\n");
    let deadline = Instant::now() + Duration::from_secs(2);
    while log.pending() != 0 {
        assert!(Instant::now() < deadline);
        thread::sleep(Duration::from_millis(1));
    }
    for entry in rest {
        log.append(*entry);
    }
    sink.open();
    let stats = log.shutdown();
    (sink.contents(), stats)
}

#[test]
fn drop_newest_discards_overflowing_entries() {
    let config = WriterConfigBuilder::new()
        .with_capacity(2)
        .with_overflow(OverflowPolicy::DropNewest)
        .build()
        .unwrap();
    let (content, stats) = fill_behind_stuck_entry(config, &["a\n", "b\n", "c\n", "d\n"]);

    assert_eq!(content, "stuck\na\nb\n");
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.written, 3);
}

#[test]
fn drop_oldest_keeps_latest_entries() {
    let config = WriterConfigBuilder::new()
        .with_capacity(2)
        .with_overflow(OverflowPolicy::DropOldest)
        .build()
        .unwrap();
    let (content, stats) = fill_behind_stuck_entry(config, &["a\n", "b\n", "c\n", "d\n"]);

    assert_eq!(content, "stuck\nc\nd\n");
    assert_eq!(stats.appended, 5);
    assert_eq!(stats.dropped, 2);
    assert_eq!(stats.written, 3);
}

#[test]
fn block_policy_gives_up_after_timeout() {
    let config = WriterConfigBuilder::new()
        .with_capacity(1)
        .with_overflow(OverflowPolicy::Block(Duration::from_millis(10)))
        .build()
        .unwrap();
    let (content, stats) = fill_behind_stuck_entry(config, &["a\n", "b\n"]);

    assert_eq!(content, "stuck\na\n");
    assert_eq!(stats.dropped, 1);
}

#[test]
fn unbounded_queue_never_drops() {
    let config = WriterConfigBuilder::new().unbounded().build().unwrap();
    let rest: Vec<String> = (0..10_000).map(|i| format!("{i}\n")).collect();
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    let (content, stats) = fill_behind_stuck_entry(config, &rest);

    assert_eq!(content.lines().count(), 10_001);
    assert_eq!(stats.dropped, 0);
}

/// Fails the first `failures` write calls, then behaves.
struct FlakySink {
    out: Arc<Mutex<Vec<u8>>>,
    failures: Arc<AtomicUsize>,
}

impl Write for FlakySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(io::Error::new(io::ErrorKind::Other, "transient"));
        }
        self.out.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn quick_retries(retries: u32) -> WriterConfig {
    WriterConfigBuilder::new()
        .with_write_retries(retries)
        .with_retry_backoff(Duration::from_micros(50))
        .build()
        .unwrap()
}

#[test]
fn transient_write_failure_is_retried() {
    let out = Arc::new(Mutex::new(Vec::new()));
    let sink = FlakySink {
        out: out.clone(),
        failures: Arc::new(AtomicUsize::new(2)),
    };
    let mut log = LogWriter::from_sink(sink, quick_retries(3)).unwrap();
    log.append("survives\n");
    log.append("after\n");
    let stats = log.shutdown();

    assert_eq!(&*out.lock().unwrap(), b"survives\nafter\n");
    assert_eq!(stats.written, 2);
    assert_eq!(stats.failed, 0);
}

#[test]
fn persistent_write_failure_is_counted_and_skipped() {
    let out = Arc::new(Mutex::new(Vec::new()));
    // Exactly enough failures to exhaust the first entry: 1 attempt + 2 retries.
    let sink = FlakySink {
        out: out.clone(),
        failures: Arc::new(AtomicUsize::new(3)),
    };
    let mut log = LogWriter::from_sink(sink, quick_retries(2)).unwrap();
    log.append("lost\n");
    log.append("kept\n");
    let stats = log.shutdown();

    assert_eq!(&*out.lock().unwrap(), b"kept\n");
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.written, 1);
    assert_eq!(stats.lost(), 1);
}

#[test]
fn broken_sink_does_not_stall_shutdown() {
    struct Broken;
    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "permission revoked"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "permission revoked"))
        }
    }

    let mut log = LogWriter::from_sink(Broken, quick_retries(1)).unwrap();
    for i in 0..50 {
        log.append(format!("{i}\n"));
    }
    let stats = log.shutdown();

    assert_eq!(stats.failed, 50);
    assert_eq!(stats.written, 0);
    assert!(stats.flush_failures >= 1);
}

#[test]
fn per_entry_drain_matches_batch_output() {
    let mut outputs = Vec::new();
    for mode in [DrainMode::Batch, DrainMode::PerEntry] {
        let (_dir, path) = scratch("mode.log");
        let config = WriterConfigBuilder::new()
            .with_drain_mode(mode)
            .build()
            .unwrap();
        let mut log = LogWriter::with_config(&path, config).unwrap();
        for i in 0..200 {
            log.append(format!("{i:03}\n"));
        }
        log.shutdown();
        outputs.push(fs::read_to_string(&path).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[0].lines().count(), 200);
}

#[test]
fn entries_are_written_verbatim() {
    let (_dir, path) = scratch("verbatim.log");
    let mut log = LogWriter::open(&path, OpenMode::Truncate).unwrap();
    log.append("no newline, ");
    log.append("ünïcødé ✓");
    log.append(String::new());
    log.append("\n");
    log.shutdown();

    assert_eq!(fs::read_to_string(&path).unwrap(), "no newline, ünïcødé ✓\n");
}
