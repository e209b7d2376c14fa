//! Log record model.

use std::borrow::Cow;

use chrono::{DateTime, Local};

use crate::level::Severity;

/// Snapshot of one accepted log call.
///
/// Built on the producer thread once the level gate passes, then moved into
/// the queue; the dispatcher only ever reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    /// Source file name with directories stripped.
    pub file: Cow<'static, str>,
    pub line: u32,
    pub message: String,
}

impl Record {
    /// Placeholder file for call sites without location information.
    pub const UNKNOWN_FILE: &'static str = "???";

    pub fn new(
        timestamp: DateTime<Local>,
        severity: Severity,
        file: Cow<'static, str>,
        line: u32,
        message: String,
    ) -> Self {
        let file = match file {
            Cow::Borrowed("") => Cow::Borrowed(Self::UNKNOWN_FILE),
            Cow::Borrowed(path) => Cow::Borrowed(short_file(path)),
            Cow::Owned(path) if path.is_empty() => Cow::Borrowed(Self::UNKNOWN_FILE),
            Cow::Owned(path) => Cow::Owned(short_file(&path).to_owned()),
        };
        Self {
            timestamp,
            severity,
            file,
            line,
            message,
        }
    }

    /// Record whose origin is unknown (`???:0`).
    pub fn unlocated(timestamp: DateTime<Local>, severity: Severity, message: String) -> Self {
        Self::new(
            timestamp,
            severity,
            Cow::Borrowed(Self::UNKNOWN_FILE),
            0,
            message,
        )
    }
}

/// Strip every directory component from a source path.
pub fn short_file(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_unix_and_windows_directories() {
        assert_eq!(short_file("src/writer/file.rs"), "file.rs");
        assert_eq!(short_file("C:\\work\\app\\main.rs"), "main.rs");
        assert_eq!(short_file("main.rs"), "main.rs");
    }

    #[test]
    fn empty_location_becomes_placeholder() {
        let record = Record::new(Local::now(), Severity::Info, Cow::Borrowed(""), 0, "m".into());
        assert_eq!(record.file, Record::UNKNOWN_FILE);

        let record = Record::unlocated(Local::now(), Severity::Warn, "m".into());
        assert_eq!(record.file, "???");
        assert_eq!(record.line, 0);
    }

    #[test]
    fn owned_paths_are_shortened_too() {
        let record = Record::new(
            Local::now(),
            Severity::Debug,
            Cow::Owned("crates/app/src/lib.rs".to_owned()),
            7,
            String::new(),
        );
        assert_eq!(record.file, "lib.rs");
    }
}
