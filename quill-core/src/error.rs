use std::path::PathBuf;

use quill_config::ConfigError;
use quill_telemetry::MetricsError;
use thiserror::Error;

use crate::level::ParseSeverityError;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid level: {0}")]
    Level(#[from] ParseSeverityError),

    #[error("Log destination {path} is unusable: {source}")]
    Destination {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to start dispatcher thread: {0}")]
    Spawn(std::io::Error),

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Default logger is already initialized")]
    AlreadyInitialized,
}
