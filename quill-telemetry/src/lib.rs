//! # Quill Telemetry
//!
//! Observability of the logging pipeline itself: diagnostics emitted through
//! `tracing` and prometheus counters kept by each logger instance.

pub mod diagnostics;
pub mod metrics;

pub use metrics::{MetricsError, MetricsRecorder};
