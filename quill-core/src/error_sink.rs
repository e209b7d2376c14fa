//! Side channel for failures inside the logging pipeline.
//!
//! Errors raised while formatting or writing a record cannot be returned to
//! the caller that logged it, so the dispatcher hands them here. Each one is
//! appended as a timestamped line to a fixed local file and echoed as a
//! `tracing` warning.

use std::error::Error;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::warn;

#[derive(Debug)]
pub struct ErrorSink {
    path: PathBuf,
    file: Option<File>,
}

impl ErrorSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Report one pipeline failure. Never fails itself.
    pub fn record(&mut self, context: &str, error: &dyn Error) {
        warn!(context, error = %error, "log pipeline error");

        let line = format!(
            "{} {context}: {error}\n",
            Local::now().format("%Y/%m/%d %H:%M:%S%.3f")
        );
        let Some(file) = self.file() else {
            return;
        };
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "error log write failed");
            self.file = None;
        }
    }

    // Retried on every error until the file opens.
    fn file(&mut self) -> Option<&mut File> {
        if self.file.is_none() {
            match open_append(&self.path) {
                Ok(file) => self.file = Some(file),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "error log unavailable");
                    return None;
                }
            }
        }
        self.file.as_mut()
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
