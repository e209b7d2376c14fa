//! Writer contract and the small in-process writers.
//!
//! A writer is owned by exactly one dispatcher thread for its whole life, so
//! implementations keep plain mutable state and no locks of their own.

mod batch;
mod file;
mod tcp;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use thiserror::Error;

pub use batch::{BatchSink, BatchWriter, MemoryBatchSink, FLUSH_INTERVAL_MS};
pub use file::RotatingFileWriter;
pub use tcp::{read_frame, Frame, TcpBatchSink};

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to create log directory at {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },

    #[error("Failed to open log file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("No destination is open")]
    NotReady,

    #[error("Batch sink error: {0}")]
    Sink(String),
}

pub trait Writer: Send + 'static {
    /// Bring the destination into the right state for a record stamped
    /// `timestamp`. Rotating writers switch files here.
    fn ensure_ready(&mut self, timestamp: &DateTime<Local>) -> Result<(), WriterError>;

    /// Deliver one rendered record. `buf` is reused by the caller afterwards.
    fn write(&mut self, buf: &[u8]) -> Result<(), WriterError>;

    /// Push already-written bytes down to the underlying resource.
    fn sync(&mut self) -> Result<(), WriterError>;

    /// Release the underlying resource.
    fn close(&mut self) -> Result<(), WriterError>;
}

/// Accepts everything and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardWriter;

impl Writer for DiscardWriter {
    fn ensure_ready(&mut self, _timestamp: &DateTime<Local>) -> Result<(), WriterError> {
        Ok(())
    }

    fn write(&mut self, _buf: &[u8]) -> Result<(), WriterError> {
        Ok(())
    }

    fn sync(&mut self) -> Result<(), WriterError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        Ok(())
    }
}

/// Keeps every written record in memory.
///
/// Clones observe the same storage, so a test can hand one clone to a logger
/// and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    records: Arc<Mutex<Vec<Vec<u8>>>>,
    syncs: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered records in write order.
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.records.lock().clone()
    }

    /// Records decoded as UTF-8 lines, trailing newline removed.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| String::from_utf8_lossy(r).trim_end_matches('\n').to_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sync_count(&self) -> usize {
        self.syncs.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Writer for MemoryWriter {
    fn ensure_ready(&mut self, _timestamp: &DateTime<Local>) -> Result<(), WriterError> {
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), WriterError> {
        self.records.lock().push(buf.to_vec());
        Ok(())
    }

    fn sync(&mut self) -> Result<(), WriterError> {
        self.syncs.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_writer_clones_share_storage() {
        let observer = MemoryWriter::new();
        let mut writer = observer.clone();

        writer.write(b"one\n").unwrap();
        writer.write(b"two\n").unwrap();
        writer.sync().unwrap();
        writer.close().unwrap();

        assert_eq!(observer.lines(), vec!["one", "two"]);
        assert_eq!(observer.sync_count(), 1);
        assert!(observer.is_closed());
    }
}
