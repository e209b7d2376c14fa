use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone};
use crossbeam::channel::{bounded, Receiver};
use quill_core::format::JsonFormatter;
use quill_core::writer::{
    BatchWriter, MemoryBatchSink, MemoryWriter, Writer, WriterError,
};
use quill_core::{Logger, ManualClock, Severity};

fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

fn memory_logger(dir: &Path, level: Severity, capacity: usize) -> (Logger, MemoryWriter) {
    let writer = MemoryWriter::new();
    let logger = Logger::builder()
        .level(level)
        .queue_capacity(capacity)
        .error_log(dir.join("errors.log"))
        .writer(writer.clone())
        .build()
        .unwrap();
    (logger, writer)
}

/// Checks `YYYY/MM/DD HH:MM:SS.mmm file:line Severity message`.
fn assert_text_line(line: &str) -> (&str, &str) {
    assert!(line.len() > 24, "short line: {line:?}");
    NaiveDateTime::parse_from_str(&line[..23], "%Y/%m/%d %H:%M:%S%.3f")
        .unwrap_or_else(|e| panic!("bad timestamp in {line:?}: {e}"));

    let mut rest = line[24..].splitn(3, ' ');
    let location = rest.next().unwrap();
    let severity = rest.next().unwrap();
    let message = rest.next().unwrap();

    let (file, line_no) = location.rsplit_once(':').unwrap();
    assert_eq!(file, "pipeline.rs");
    line_no.parse::<u32>().unwrap();
    assert!(severity.parse::<Severity>().is_ok(), "bad severity in {line:?}");
    (severity, message)
}

#[test]
fn gated_debug_and_accepted_info_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let writer = MemoryWriter::new();
    let logger = Logger::builder()
        .level(Severity::Info)
        .queue_capacity(3)
        .error_log(dir.path().join("errors.log"))
        .formatter(JsonFormatter)
        .writer(writer.clone())
        .build()
        .unwrap();

    logger.debug("x");
    logger.info("y");
    wait_until("one record", || writer.len() == 1);
    logger.sync();
    logger.close();

    let records = writer.records();
    assert_eq!(records.len(), 1);
    let value: serde_json::Value = serde_json::from_slice(&records[0]).unwrap();
    assert_eq!(value["msg"], "y");
    assert_eq!(value["level"], "Info");
    assert_eq!(value["file"], "pipeline.rs");
}

#[test]
fn concurrent_producers_lose_and_corrupt_nothing() {
    const PER_THREAD: usize = 10_000;

    let dir = tempfile::tempdir().unwrap();
    let (logger, writer) = memory_logger(dir.path(), Severity::Info, 4);

    let producers: Vec<_> = (0..2)
        .map(|t| {
            let logger = logger.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info(format_args!("producer-{t} seq-{i}"));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    wait_until("all records", || writer.len() == 2 * PER_THREAD);
    logger.sync();
    logger.close();

    let lines = writer.lines();
    assert_eq!(lines.len(), 2 * PER_THREAD);

    let mut next = [0usize; 2];
    for line in &lines {
        let (severity, message) = assert_text_line(line);
        assert_eq!(severity, "Info");

        let (producer, seq) = message.split_once(' ').unwrap();
        let t: usize = producer.trim_start_matches("producer-").parse().unwrap();
        let i: usize = seq.trim_start_matches("seq-").parse().unwrap();
        assert_eq!(i, next[t], "producer {t} out of order");
        next[t] += 1;
    }
    assert_eq!(next, [PER_THREAD, PER_THREAD]);
    assert_eq!(
        logger.metrics().unwrap().records_written.get(),
        (2 * PER_THREAD) as u64
    );
}

#[test]
fn file_writer_rotates_across_hour_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("logs");
    let start: DateTime<Local> = Local.with_ymd_and_hms(2024, 1, 15, 10, 59, 59).unwrap();
    let clock = ManualClock::new(start);

    let logger = Logger::builder()
        .level(Severity::Trace)
        .queue_capacity(8)
        .root(&root)
        .error_log(dir.path().join("errors.log"))
        .clock(clock.clone())
        .build()
        .unwrap();
    assert!(root.is_dir(), "root is created at construction");

    logger.info("before");
    clock.advance(TimeDelta::seconds(1));
    logger.info("after");

    let before = root.join("202401/2024-01-15_10.txt");
    let after = root.join("202401/2024-01-15_11.txt");
    wait_until("second file", || {
        fs::read_to_string(&after).is_ok_and(|s| s.ends_with('\n'))
    });
    logger.close();

    let before = fs::read_to_string(before).unwrap();
    let after = fs::read_to_string(after).unwrap();
    assert!(before.starts_with("2024/01/15 10:59:59.000 pipeline.rs:"));
    assert!(before.ends_with(" Info before\n"));
    assert!(after.starts_with("2024/01/15 11:00:00.000 pipeline.rs:"));
    assert!(after.ends_with(" Info after\n"));
}

struct RejectingWriter;

impl Writer for RejectingWriter {
    fn ensure_ready(&mut self, _timestamp: &DateTime<Local>) -> Result<(), WriterError> {
        Ok(())
    }

    fn write(&mut self, _buf: &[u8]) -> Result<(), WriterError> {
        Err(WriterError::Sink("collector refused record".into()))
    }

    fn sync(&mut self) -> Result<(), WriterError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        Ok(())
    }
}

#[test]
fn failing_writer_reports_to_error_log_without_stalling() {
    let dir = tempfile::tempdir().unwrap();
    let error_log = dir.path().join("side/errors.log");
    let logger = Logger::builder()
        .queue_capacity(1)
        .error_log(&error_log)
        .writer(RejectingWriter)
        .build()
        .unwrap();

    for i in 0..5 {
        logger.error(format_args!("attempt {i}"));
    }
    wait_until("five error lines", || {
        fs::read_to_string(&error_log).is_ok_and(|s| s.lines().count() == 5)
    });
    logger.close();

    let content = fs::read_to_string(&error_log).unwrap();
    assert!(content
        .lines()
        .all(|l| l.ends_with("write: Batch sink error: collector refused record")));

    let metrics = logger.metrics().unwrap();
    assert_eq!(metrics.write_errors.get(), 5);
    assert_eq!(metrics.records_written.get(), 0);
}

/// Holds every write until the test releases it.
struct GatedWriter {
    gate: Receiver<()>,
    writes: Arc<AtomicUsize>,
}

impl Writer for GatedWriter {
    fn ensure_ready(&mut self, _timestamp: &DateTime<Local>) -> Result<(), WriterError> {
        Ok(())
    }

    fn write(&mut self, _buf: &[u8]) -> Result<(), WriterError> {
        // Returns once the sender side is dropped.
        let _ = self.gate.recv();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), WriterError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        Ok(())
    }
}

#[test]
fn full_queue_blocks_producer_until_close() {
    let dir = tempfile::tempdir().unwrap();
    let (release, gate) = bounded::<()>(0);
    let writes = Arc::new(AtomicUsize::new(0));
    let logger = Logger::builder()
        .queue_capacity(1)
        .error_log(dir.path().join("errors.log"))
        .writer(GatedWriter {
            gate,
            writes: Arc::clone(&writes),
        })
        .build()
        .unwrap();

    let sent = Arc::new(AtomicUsize::new(0));
    let producer = {
        let logger = logger.clone();
        let sent = Arc::clone(&sent);
        thread::spawn(move || {
            for i in 0..5 {
                logger.info(i);
                sent.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    // One record is held by the writer and one fills the queue.
    wait_until("two sends", || sent.load(Ordering::SeqCst) == 2);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(sent.load(Ordering::SeqCst), 2, "producer did not block");

    let closer = {
        let logger = logger.clone();
        thread::spawn(move || logger.close())
    };
    wait_until("closed flag", || logger.is_closed());
    drop(release);

    producer.join().unwrap();
    closer.join().unwrap();
    assert_eq!(sent.load(Ordering::SeqCst), 5);

    let metrics = logger.metrics().unwrap();
    assert!(metrics.records_dropped.get() > 0);
    assert_eq!(metrics.records_written.get(), writes.load(Ordering::SeqCst) as u64);
    assert!(writes.load(Ordering::SeqCst) >= 1);
}

#[test]
fn batch_writer_flushes_full_batches_and_remainder_on_exit() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(Local::now());
    let sink = MemoryBatchSink::new();
    let writer = BatchWriter::with_clock(sink.clone(), "app", 3, Arc::new(clock.clone()));

    let logger = Logger::builder()
        .queue_capacity(16)
        .error_log(dir.path().join("errors.log"))
        .clock(clock)
        .writer(writer)
        .build()
        .unwrap();

    for i in 0..7 {
        logger.info(i);
    }
    // Dropping the last handle lets the dispatcher finish the queue and close.
    drop(logger);
    wait_until("sink closed", || sink.is_closed());

    assert!(sink.is_connected());
    assert_eq!(sink.batch_sizes(), vec![3, 3, 1]);
    let last = &sink.batches()[2].1[0];
    assert!(last.ends_with(b" Info 6\n"));
}

#[test]
fn metrics_are_exposed_in_text_format() {
    let dir = tempfile::tempdir().unwrap();
    let (logger, writer) = memory_logger(dir.path(), Severity::Info, 2);

    logger.warn("one");
    logger.warn("two");
    wait_until("two records", || writer.len() == 2);
    logger.close();
    logger.info("dropped");

    let text = logger.metrics().unwrap().gather_metrics().unwrap();
    assert!(text.contains("quill_records_written_total 2"));
    assert!(text.contains("quill_records_dropped_total 1"));
}
