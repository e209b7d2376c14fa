//! Record renderings.
//!
//! A formatter appends one rendered record to a caller-owned buffer. The
//! dispatcher clears that buffer before each call and keeps its capacity, so
//! steady-state formatting does not allocate.

mod json;
mod text;

use std::io;

use quill_config::FormatterKind;
use thiserror::Error;

use crate::record::Record;

pub use json::JsonFormatter;
pub use text::TextFormatter;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error while rendering: {0}")]
    Io(#[from] io::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait Formatter: Send + 'static {
    /// Append `record` to `buf`, newline-terminated.
    fn format(&self, record: &Record, buf: &mut Vec<u8>) -> Result<(), FormatError>;
}

/// Instantiate the built-in formatter named in configuration.
pub fn from_kind(kind: FormatterKind) -> Box<dyn Formatter> {
    match kind {
        FormatterKind::Text => Box::new(TextFormatter),
        FormatterKind::Json => Box::new(JsonFormatter),
    }
}
