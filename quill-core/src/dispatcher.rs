//! The single consumer behind every logger.
//!
//! One named OS thread owns the writer, the formatter and a reusable render
//! buffer for the whole life of a logger. It waits on three channels at once:
//!
//! - records, bounded FIFO fed by every producer
//! - flush requests, capacity one so repeated requests coalesce
//! - shutdown requests
//!
//! When several are ready the pick is random. Shutdown discards what is still
//! queued, counting it as dropped, then closes the writer. If every logger
//! handle is dropped instead, the records already queued are written first.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{select, Receiver};
use quill_telemetry::MetricsRecorder;
use tracing::{debug, info};

use crate::error_sink::ErrorSink;
use crate::format::Formatter;
use crate::record::Record;
use crate::writer::Writer;

pub(crate) struct Inbox {
    pub records: Receiver<Record>,
    pub flush: Receiver<()>,
    pub shutdown: Receiver<()>,
}

pub(crate) struct Dispatcher {
    writer: Box<dyn Writer>,
    formatter: Box<dyn Formatter>,
    buf: Vec<u8>,
    errors: ErrorSink,
    metrics: MetricsRecorder,
}

impl Dispatcher {
    pub fn new(
        writer: Box<dyn Writer>,
        formatter: Box<dyn Formatter>,
        errors: ErrorSink,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            writer,
            formatter,
            buf: Vec::with_capacity(256),
            errors,
            metrics,
        }
    }

    pub fn spawn(self, name: String, inbox: Inbox) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(name)
            .spawn(move || self.run(inbox))
    }

    fn run(mut self, inbox: Inbox) {
        info!("dispatcher started");
        loop {
            select! {
                recv(inbox.records) -> msg => match msg {
                    Ok(record) => self.handle(record),
                    Err(_) => break,
                },
                recv(inbox.flush) -> msg => match msg {
                    Ok(()) => self.sync(),
                    Err(_) => {
                        self.drain(&inbox.records);
                        break;
                    }
                },
                recv(inbox.shutdown) -> msg => {
                    match msg {
                        Ok(()) => self.discard(&inbox.records),
                        Err(_) => self.drain(&inbox.records),
                    }
                    break;
                },
            }
        }
        self.close();
        info!("dispatcher stopped");
    }

    fn handle(&mut self, record: Record) {
        self.buf.clear();
        if let Err(e) = self.formatter.format(&record, &mut self.buf) {
            self.fail("format", &e);
            return;
        }
        if let Err(e) = self.writer.ensure_ready(&record.timestamp) {
            self.fail("ensure_ready", &e);
            return;
        }
        match self.writer.write(&self.buf) {
            Ok(()) => self.metrics.records_written.inc(),
            Err(e) => self.fail("write", &e),
        }
    }

    fn sync(&mut self) {
        match self.writer.sync() {
            Ok(()) => {
                self.metrics.syncs.inc();
                debug!("writer synced");
            }
            Err(e) => self.fail("sync", &e),
        }
    }

    // Senders are gone, so nothing new can arrive behind what is buffered.
    fn drain(&mut self, records: &Receiver<Record>) {
        while let Ok(record) = records.try_recv() {
            self.handle(record);
        }
    }

    fn discard(&mut self, records: &Receiver<Record>) {
        let mut discarded = 0u64;
        while records.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            self.metrics.records_dropped.inc_by(discarded);
            debug!(discarded, "queued records discarded at shutdown");
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.writer.close() {
            self.fail("close", &e);
        }
    }

    fn fail(&mut self, context: &str, error: &dyn std::error::Error) {
        self.metrics.write_errors.inc();
        self.errors.record(context, error);
    }
}
