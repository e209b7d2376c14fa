//! # quill-core
//!
//! Asynchronous, level-filtered application logging.
//!
//! Call sites hand records to a bounded queue; a single dispatcher thread per
//! logger renders them and writes them out, so formatting and I/O stay off the
//! caller's thread.
//!
//! ### Pipeline:
//! - `level`: six fixed severities and the threshold gate
//! - `logger`: cloneable handles, builder, sync and shutdown
//! - `dispatcher`: the single consumer owning writer and formatter
//! - `format`: text and JSON renderings
//! - `writer`: hourly rotating files, batched network delivery
//! - `global`: the process-wide default logger and its macros
//!
//! ### Guarantees:
//! - Records from one producer are written in call order
//! - A failing writer never reaches the producer; failures go to an error log
//! - Gated calls allocate nothing and never touch the queue

pub mod clock;
pub mod compat;
mod dispatcher;
pub mod error;
pub mod error_sink;
pub mod format;
pub mod global;
pub mod level;
pub mod logger;
mod macros;
pub mod record;
pub mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LoggerError;
pub use level::Severity;
pub use logger::{Logger, LoggerBuilder};
pub use record::Record;
