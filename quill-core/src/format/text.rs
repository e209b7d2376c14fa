use std::io::Write;

use chrono::{DateTime, Datelike, Local, Timelike};

use super::{FormatError, Formatter};
use crate::record::Record;

/// `YYYY/MM/DD HH:MM:SS.mmm file:line Severity message`
///
/// Every timestamp field is zero padded, so the prefix sorts lexically in
/// time order.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, record: &Record, buf: &mut Vec<u8>) -> Result<(), FormatError> {
        write_timestamp(buf, &record.timestamp)?;
        write!(buf, " {}:{} {} ", record.file, record.line, record.severity)?;
        buf.extend_from_slice(record.message.as_bytes());
        buf.push(b'\n');
        Ok(())
    }
}

fn write_timestamp(buf: &mut Vec<u8>, ts: &DateTime<Local>) -> std::io::Result<()> {
    // A leap second reports 1000+ ms.
    let millis = ts.timestamp_subsec_millis().min(999);
    write!(
        buf,
        "{:04}/{:02}/{:02} {:02}:{:02}:{:02}.{:03}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second(),
        millis
    )
}
