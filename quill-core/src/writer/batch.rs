//! Batched delivery to a message broker.
//!
//! Rendered records accumulate in memory and leave in one `send` once the
//! batch is full or the previous flush is more than [`FLUSH_INTERVAL_MS`]
//! old. The age check only runs on `write`, so a quiet logger keeps its tail
//! until the next record or `close`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::debug;

use super::{Writer, WriterError};
use crate::clock::{Clock, SystemClock};

/// Age after which the next write flushes regardless of batch fill.
pub const FLUSH_INTERVAL_MS: i64 = 1000;

/// Transport that moves whole batches to a broker topic.
pub trait BatchSink: Send + 'static {
    /// Establish the connection. Called once before the first send.
    fn connect(&mut self) -> Result<(), WriterError> {
        Ok(())
    }

    fn send(&mut self, topic: &str, payloads: &[Bytes]) -> Result<(), WriterError>;

    fn close(&mut self) -> Result<(), WriterError>;
}

pub struct BatchWriter<S> {
    sink: S,
    topic: String,
    batch_size: usize,
    pending: Vec<Bytes>,
    last_flush: DateTime<Local>,
    clock: Arc<dyn Clock>,
    connected: bool,
}

impl<S: BatchSink> BatchWriter<S> {
    /// A `batch_size` of zero is treated as one.
    pub fn new(sink: S, topic: impl Into<String>, batch_size: usize) -> Self {
        Self::with_clock(sink, topic, batch_size, Arc::new(SystemClock))
    }

    pub fn with_clock(
        sink: S,
        topic: impl Into<String>,
        batch_size: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            topic: topic.into(),
            batch_size,
            pending: Vec::with_capacity(batch_size),
            last_flush: clock.now(),
            clock,
            connected: false,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Send everything pending as one batch.
    ///
    /// The batch is discarded whether or not the send succeeds; a failed
    /// batch is reported, never retried.
    fn flush(&mut self) -> Result<(), WriterError> {
        self.last_flush = self.clock.now();
        if self.pending.is_empty() {
            return Ok(());
        }

        let result = self.sink.send(&self.topic, &self.pending);
        debug!(
            topic = %self.topic,
            records = self.pending.len(),
            ok = result.is_ok(),
            "flushed batch"
        );
        self.pending.clear();
        result
    }
}

impl<S: BatchSink> Writer for BatchWriter<S> {
    fn ensure_ready(&mut self, _timestamp: &DateTime<Local>) -> Result<(), WriterError> {
        if !self.connected {
            self.sink.connect()?;
            self.connected = true;
        }
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), WriterError> {
        self.pending.push(Bytes::copy_from_slice(buf));

        let elapsed = self.clock.now() - self.last_flush;
        if self.pending.len() >= self.batch_size || elapsed.num_milliseconds() > FLUSH_INTERVAL_MS
        {
            self.flush()?;
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), WriterError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        let flushed = self.flush();
        let closed = self.sink.close();
        self.connected = false;
        flushed.and(closed)
    }
}

/// Sink that records every batch it receives. Clones share the capture.
#[derive(Debug, Clone, Default)]
pub struct MemoryBatchSink {
    batches: Arc<Mutex<Vec<(String, Vec<Bytes>)>>>,
    connected: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl MemoryBatchSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(topic, payloads)` in send order.
    pub fn batches(&self) -> Vec<(String, Vec<Bytes>)> {
        self.batches.lock().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(|(_, b)| b.len()).collect()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl BatchSink for MemoryBatchSink {
    fn connect(&mut self) -> Result<(), WriterError> {
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    fn send(&mut self, topic: &str, payloads: &[Bytes]) -> Result<(), WriterError> {
        self.batches
            .lock()
            .push((topic.to_owned(), payloads.to_vec()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
