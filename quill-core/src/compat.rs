//! Bridge from the `log` crate facade.
//!
//! Libraries that log through `log::info!` and friends end up in a quill
//! [`Logger`] once [`LogBridge::install`] has run. `log` has no `Fatal`;
//! everything else maps one to one.

use std::borrow::Cow;

use log::{LevelFilter, Log, Metadata, Record as LogRecord, SetLoggerError};

use crate::level::Severity;
use crate::logger::Logger;

pub struct LogBridge {
    logger: Logger,
}

impl LogBridge {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Route the `log` facade into `logger` for the rest of the process.
    ///
    /// The facade forwards every level; `logger`'s own threshold decides.
    pub fn install(logger: Logger) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(Self::new(logger)))?;
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }
}

fn severity(level: log::Level) -> Severity {
    match level {
        log::Level::Error => Severity::Error,
        log::Level::Warn => Severity::Warn,
        log::Level::Info => Severity::Info,
        log::Level::Debug => Severity::Debug,
        log::Level::Trace => Severity::Trace,
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.logger.enabled(severity(metadata.level()))
    }

    fn log(&self, record: &LogRecord<'_>) {
        let severity = severity(record.level());
        if !self.logger.enabled(severity) {
            return;
        }

        let file = match (record.file_static(), record.file()) {
            (Some(file), _) => Cow::Borrowed(file),
            (None, Some(file)) => Cow::Owned(file.to_owned()),
            (None, None) => Cow::Borrowed(""),
        };
        let message = match record.args().as_str() {
            Some(text) => text.to_owned(),
            None => record.args().to_string(),
        };
        self.logger
            .dispatch(severity, file, record.line().unwrap_or(0), message);
    }

    fn flush(&self) {
        self.logger.sync();
    }
}
