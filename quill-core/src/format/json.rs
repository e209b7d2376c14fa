use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

use super::{FormatError, Formatter};
use crate::level::Severity;
use crate::record::Record;

/// One JSON object per line with keys `ts`, `file`, `line`, `level`, `msg`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonLine<'a> {
    #[serde(serialize_with = "rfc3339_millis")]
    ts: &'a DateTime<Local>,
    file: &'a str,
    line: u32,
    level: Severity,
    msg: &'a str,
}

// Streams into the output without an intermediate String.
fn rfc3339_millis<S: Serializer>(ts: &&DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &Record, buf: &mut Vec<u8>) -> Result<(), FormatError> {
        let line = JsonLine {
            ts: &record.timestamp,
            file: &record.file,
            line: record.line,
            level: record.severity,
            msg: &record.message,
        };
        serde_json::to_writer(&mut *buf, &line)?;
        buf.push(b'\n');
        Ok(())
    }
}
