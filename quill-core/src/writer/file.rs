//! Hourly rotating file writer.
//!
//! Records land in `root/YYYYMM/YYYY-MM-DD_HH.txt`, one file per local
//! calendar hour. The file for an hour is opened lazily by the first record
//! stamped in that hour.

use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Timelike};
use tracing::debug;

use super::{Writer, WriterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HourBucket {
    date: NaiveDate,
    hour: u32,
}

impl HourBucket {
    fn of(timestamp: &DateTime<Local>) -> Self {
        Self {
            date: timestamp.date_naive(),
            hour: timestamp.hour(),
        }
    }
}

#[derive(Debug)]
pub struct RotatingFileWriter {
    root: PathBuf,
    file: Option<File>,
    bucket: Option<HourBucket>,
}

impl RotatingFileWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file: None,
            bucket: None,
        }
    }

    /// Destination of records stamped `timestamp` under `root`.
    pub fn path_for(root: &Path, timestamp: &DateTime<Local>) -> PathBuf {
        root.join(timestamp.format("%Y%m").to_string())
            .join(format!("{}.txt", timestamp.format("%Y-%m-%d_%H")))
    }

    fn open(&self, timestamp: &DateTime<Local>) -> Result<File, WriterError> {
        let path = Self::path_for(&self.root, timestamp);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| WriterError::CreateDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| WriterError::Open { path, source })
    }
}

impl Writer for RotatingFileWriter {
    fn ensure_ready(&mut self, timestamp: &DateTime<Local>) -> Result<(), WriterError> {
        let bucket = HourBucket::of(timestamp);
        if self.file.is_some() && self.bucket == Some(bucket) {
            return Ok(());
        }

        // The previous hour's handle is released before the next one opens.
        if self.file.take().is_some() {
            debug!(root = %self.root.display(), "rotating log file");
        }
        self.bucket = None;

        let file = self.open(timestamp)?;
        self.file = Some(file);
        self.bucket = Some(bucket);
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), WriterError> {
        let file = self.file.as_mut().ok_or(WriterError::NotReady)?;
        file.write_all(buf)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), WriterError> {
        if let Some(file) = self.file.as_mut() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        self.bucket = None;
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }
}
