//! Logger handles and their construction.
//!
//! A [`Logger`] is a cheap, cloneable handle onto one pipeline: a threshold,
//! a bounded queue and the dispatcher thread draining it. Producers pay for a
//! relaxed atomic load when a record is gated out; accepted records are
//! stamped, captured with their call site and moved into the queue. A full
//! queue blocks the producer until the dispatcher catches up.

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::panic::Location;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam::channel::{bounded, Sender};
use parking_lot::Mutex;
use quill_config::{default_queue_capacity, LoggerConfig, WriterKind};
use quill_telemetry::MetricsRecorder;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::dispatcher::{Dispatcher, Inbox};
use crate::error::LoggerError;
use crate::error_sink::ErrorSink;
use crate::format::{self, Formatter, TextFormatter};
use crate::level::{can_emit, AtomicSeverity, Severity};
use crate::record::Record;
use crate::writer::{BatchWriter, RotatingFileWriter, TcpBatchSink, Writer};

pub const DEFAULT_THREAD_NAME: &str = "quill-dispatcher";

#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    level: AtomicSeverity,
    records: Sender<Record>,
    flush: Sender<()>,
    shutdown: Sender<()>,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
    drop_warned: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: Option<ThreadId>,
    metrics: Option<MetricsRecorder>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// A logger that accepts calls and discards every record.
    ///
    /// Used where a real pipeline could not be built; it never blocks.
    pub fn disabled() -> Self {
        // Receivers are dropped right away, so every send fails immediately.
        let (records, _) = bounded(0);
        let (flush, _) = bounded(1);
        let (shutdown, _) = bounded(1);
        Self {
            inner: Arc::new(Inner {
                level: AtomicSeverity::new(Severity::Fatal),
                records,
                flush,
                shutdown,
                clock: Arc::new(SystemClock),
                closed: AtomicBool::new(true),
                // Nothing to report about a logger that never ran.
                drop_warned: AtomicBool::new(true),
                worker: Mutex::new(None),
                worker_id: None,
                metrics: None,
            }),
        }
    }

    #[track_caller]
    pub fn trace(&self, msg: impl fmt::Display) {
        self.log(Severity::Trace, msg);
    }

    #[track_caller]
    pub fn debug(&self, msg: impl fmt::Display) {
        self.log(Severity::Debug, msg);
    }

    #[track_caller]
    pub fn info(&self, msg: impl fmt::Display) {
        self.log(Severity::Info, msg);
    }

    #[track_caller]
    pub fn warn(&self, msg: impl fmt::Display) {
        self.log(Severity::Warn, msg);
    }

    #[track_caller]
    pub fn error(&self, msg: impl fmt::Display) {
        self.log(Severity::Error, msg);
    }

    /// Logs at `Fatal`. The process keeps running.
    #[track_caller]
    pub fn fatal(&self, msg: impl fmt::Display) {
        self.log(Severity::Fatal, msg);
    }

    /// Log `msg` attributed to the caller's source location.
    #[track_caller]
    pub fn log(&self, severity: Severity, msg: impl fmt::Display) {
        if !self.enabled(severity) {
            return;
        }
        let location = Location::caller();
        self.dispatch(
            severity,
            Cow::Borrowed(location.file()),
            location.line(),
            msg.to_string(),
        );
    }

    /// Log with an explicit source location. Backs the logging macros.
    pub fn log_at(
        &self,
        severity: Severity,
        file: &'static str,
        line: u32,
        args: fmt::Arguments<'_>,
    ) {
        if !self.enabled(severity) {
            return;
        }
        self.dispatch(severity, Cow::Borrowed(file), line, fmt::format(args));
    }

    pub(crate) fn dispatch(
        &self,
        severity: Severity,
        file: Cow<'static, str>,
        line: u32,
        message: String,
    ) {
        if self.inner.closed.load(Ordering::Acquire) {
            self.dropped();
            return;
        }
        let record = Record::new(self.inner.clock.now(), severity, file, line, message);
        // Fails only once the dispatcher has gone away.
        if self.inner.records.send(record).is_err() {
            self.dropped();
        }
    }

    fn dropped(&self) {
        if let Some(metrics) = &self.inner.metrics {
            metrics.records_dropped.inc();
        }
        if !self.inner.drop_warned.swap(true, Ordering::Relaxed) {
            warn!("logger is closed, dropping records");
        }
    }

    #[inline]
    pub fn enabled(&self, severity: Severity) -> bool {
        can_emit(self.inner.level.load(), severity)
    }

    pub fn level(&self) -> Severity {
        self.inner.level.load()
    }

    pub fn set_level(&self, level: Severity) {
        self.inner.level.store(level);
    }

    /// Ask the dispatcher to sync its writer. Does not wait.
    ///
    /// Requests made while one is still pending are merged into it.
    pub fn sync(&self) {
        let _ = self.inner.flush.try_send(());
    }

    /// Stop the dispatcher and wait for it to close its writer.
    ///
    /// Records still queued are discarded and counted as dropped. Every
    /// caller, on any clone, returns only once the writer is closed. Later
    /// log calls are dropped.
    ///
    /// A producer that passed the closed check just before this call may
    /// still enqueue one record after the dispatcher has counted the queue.
    /// That record is lost without being counted.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            let _ = self.inner.shutdown.try_send(());
        }
        // Closing from a writer or formatter running on the dispatcher itself.
        if self.inner.worker_id == Some(thread::current().id()) {
            return;
        }

        // Held across the join so concurrent callers wait for the same exit.
        let mut worker = self.inner.worker.lock();
        let Some(handle) = worker.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("dispatcher thread panicked");
        }
        debug!("logger closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Counters of this logger. `None` for [`Logger::disabled`].
    pub fn metrics(&self) -> Option<&MetricsRecorder> {
        self.inner.metrics.as_ref()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

enum WriterChoice {
    File,
    Batch {
        address: String,
        topic: String,
        batch_size: usize,
    },
    Custom(Box<dyn Writer>),
}

/// Explicit construction of a [`Logger`].
///
/// Defaults: threshold `Info`, one queue slot per CPU, hourly files under
/// `logs`, pipeline errors in `logs/quill-errors.log`, text rendering.
pub struct LoggerBuilder {
    level: Severity,
    queue_capacity: usize,
    root: PathBuf,
    error_log: PathBuf,
    writer: WriterChoice,
    formatter: Option<Box<dyn Formatter>>,
    clock: Arc<dyn Clock>,
    thread_name: String,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            level: Severity::Info,
            queue_capacity: default_queue_capacity(),
            root: PathBuf::from("logs"),
            error_log: PathBuf::from("logs").join("quill-errors.log"),
            writer: WriterChoice::File,
            formatter: None,
            clock: Arc::new(SystemClock),
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Validate `config` and translate it into a builder.
    pub fn from_config(config: &LoggerConfig) -> Result<Self, LoggerError> {
        config.ensure_valid()?;
        let level = config.level.parse::<Severity>()?;

        let writer = match config.writer {
            WriterKind::File => WriterChoice::File,
            WriterKind::Batch => WriterChoice::Batch {
                address: config.batch.address.clone(),
                topic: config.batch.topic.clone(),
                batch_size: config.batch.batch_size,
            },
        };

        Ok(Self {
            level,
            queue_capacity: config.queue_capacity,
            root: config.root.clone(),
            error_log: config.error_log.clone(),
            writer,
            formatter: Some(format::from_kind(config.formatter)),
            ..Self::new()
        })
    }

    pub fn level(mut self, level: Severity) -> Self {
        self.level = level;
        self
    }

    /// `0` turns every log call into a rendezvous with the dispatcher.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn error_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log = path.into();
        self
    }

    /// Replace the rotating file writer.
    pub fn writer(mut self, writer: impl Writer) -> Self {
        self.writer = WriterChoice::Custom(Box::new(writer));
        self
    }

    pub fn formatter(mut self, formatter: impl Formatter) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Start the dispatcher thread.
    ///
    /// The file writer's root directory is created here so an unusable
    /// destination fails construction; the first file opens with the first
    /// record.
    pub fn build(self) -> Result<Logger, LoggerError> {
        let metrics = MetricsRecorder::new()?;

        let writer: Box<dyn Writer> = match self.writer {
            WriterChoice::File => {
                fs::create_dir_all(&self.root).map_err(|source| LoggerError::Destination {
                    path: self.root.clone(),
                    source,
                })?;
                Box::new(RotatingFileWriter::new(self.root))
            }
            WriterChoice::Batch {
                address,
                topic,
                batch_size,
            } => Box::new(BatchWriter::with_clock(
                TcpBatchSink::new(address),
                topic,
                batch_size,
                Arc::clone(&self.clock),
            )),
            WriterChoice::Custom(writer) => writer,
        };
        let formatter = self
            .formatter
            .unwrap_or_else(|| Box::new(TextFormatter));

        let (records_tx, records) = bounded(self.queue_capacity);
        let (flush_tx, flush) = bounded(1);
        let (shutdown_tx, shutdown) = bounded(1);

        let dispatcher = Dispatcher::new(
            writer,
            formatter,
            ErrorSink::new(self.error_log),
            metrics.clone(),
        );
        let worker = dispatcher
            .spawn(
                self.thread_name,
                Inbox {
                    records,
                    flush,
                    shutdown,
                },
            )
            .map_err(LoggerError::Spawn)?;

        Ok(Logger {
            inner: Arc::new(Inner {
                level: AtomicSeverity::new(self.level),
                records: records_tx,
                flush: flush_tx,
                shutdown: shutdown_tx,
                clock: self.clock,
                closed: AtomicBool::new(false),
                drop_warned: AtomicBool::new(false),
                worker_id: Some(worker.thread().id()),
                worker: Mutex::new(Some(worker)),
                metrics: Some(metrics),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::MemoryWriter;
    use std::time::{Duration, Instant};
    use tracing_test::traced_test;

    fn memory_logger(level: Severity, capacity: usize) -> (Logger, MemoryWriter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let writer = MemoryWriter::new();
        let logger = Logger::builder()
            .level(level)
            .queue_capacity(capacity)
            .error_log(dir.path().join("errors.log"))
            .writer(writer.clone())
            .build()
            .unwrap();
        (logger, writer, dir)
    }

    fn wait_for(writer: &MemoryWriter, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while writer.len() < count {
            assert!(Instant::now() < deadline, "timed out waiting for {count} records");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn gated_records_never_reach_writer() {
        let (logger, writer, _dir) = memory_logger(Severity::Info, 3);
        logger.debug("x");
        logger.info("y");
        wait_for(&writer, 1);
        logger.close();

        let lines = writer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with(" Info y"), "{}", lines[0]);
    }

    #[test]
    fn records_carry_call_site() {
        let (logger, writer, _dir) = memory_logger(Severity::Trace, 4);
        let line = line!() + 1;
        logger.warn("here");
        wait_for(&writer, 1);
        logger.close();

        assert!(writer.lines()[0].ends_with(&format!(" logger.rs:{line} Warn here")));
    }

    #[test]
    fn threshold_changes_apply_to_later_calls() {
        let (logger, writer, _dir) = memory_logger(Severity::Error, 4);
        assert!(!logger.enabled(Severity::Warn));

        logger.warn("hidden");
        logger.set_level(Severity::Warn);
        assert_eq!(logger.level(), Severity::Warn);
        logger.warn("shown");
        wait_for(&writer, 1);
        logger.close();

        assert_eq!(writer.len(), 1);
        assert!(writer.lines()[0].ends_with("Warn shown"));
    }

    #[test]
    fn rendezvous_queue_delivers_in_order() {
        let (logger, writer, _dir) = memory_logger(Severity::Trace, 0);
        for i in 0..50 {
            logger.info(i);
        }
        wait_for(&writer, 50);
        logger.close();

        for (i, line) in writer.lines().iter().enumerate() {
            assert!(line.ends_with(&format!(" Info {i}")));
        }
    }

    #[test]
    fn sync_reaches_writer() {
        let (logger, writer, _dir) = memory_logger(Severity::Info, 4);
        logger.sync();
        let deadline = Instant::now() + Duration::from_secs(10);
        while writer.sync_count() == 0 {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        logger.close();
        assert!(logger.metrics().unwrap().syncs.get() >= 1);
    }

    #[test]
    #[traced_test]
    fn calls_after_close_are_dropped() {
        let (logger, writer, _dir) = memory_logger(Severity::Info, 4);
        let clone = logger.clone();
        logger.close();
        clone.close();
        assert!(clone.is_closed());
        assert!(writer.is_closed());

        clone.info("late");
        clone.error("later");
        clone.sync();

        assert_eq!(writer.len(), 0);
        assert_eq!(logger.metrics().unwrap().records_dropped.get(), 2);
        assert!(logs_contain("dropping records"));
    }

    struct SlowClosingWriter {
        closed: Arc<AtomicBool>,
    }

    impl Writer for SlowClosingWriter {
        fn ensure_ready(
            &mut self,
            _timestamp: &chrono::DateTime<chrono::Local>,
        ) -> Result<(), crate::writer::WriterError> {
            Ok(())
        }

        fn write(&mut self, _buf: &[u8]) -> Result<(), crate::writer::WriterError> {
            Ok(())
        }

        fn sync(&mut self) -> Result<(), crate::writer::WriterError> {
            Ok(())
        }

        fn close(&mut self) -> Result<(), crate::writer::WriterError> {
            thread::sleep(Duration::from_millis(300));
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn concurrent_close_waits_for_writer() {
        let dir = tempfile::tempdir().unwrap();
        let closed = Arc::new(AtomicBool::new(false));
        let logger = Logger::builder()
            .error_log(dir.path().join("errors.log"))
            .writer(SlowClosingWriter {
                closed: Arc::clone(&closed),
            })
            .build()
            .unwrap();

        let first = {
            let logger = logger.clone();
            thread::spawn(move || logger.close())
        };
        while !logger.is_closed() {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(50));

        logger.close();
        assert!(closed.load(Ordering::SeqCst), "second close returned early");
        first.join().unwrap();
    }

    #[test]
    fn disabled_logger_never_blocks() {
        let logger = Logger::disabled();
        logger.fatal("nowhere");
        logger.set_level(Severity::Trace);
        logger.trace("still nowhere");
        logger.sync();
        logger.close();
        assert!(logger.metrics().is_none());
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let config = LoggerConfig {
            level: "loud".into(),
            ..LoggerConfig::default()
        };
        assert!(matches!(
            LoggerBuilder::from_config(&config),
            Err(LoggerError::Config(_))
        ));
    }

    #[test]
    fn unusable_root_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, b"").unwrap();

        let err = Logger::builder()
            .root(blocker.join("logs"))
            .error_log(dir.path().join("errors.log"))
            .build()
            .unwrap_err();
        assert!(matches!(err, LoggerError::Destination { .. }));
    }
}
