//! Prometheus counters for one logger instance.
//!
//! Every logger owns a private registry so several instances can coexist in
//! one process without name clashes. Counters are atomic and may be bumped
//! from producer threads and the dispatcher thread alike.

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

pub use prometheus::Error as MetricsError;

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Records that reached the writer successfully.
    pub records_written: IntCounter,
    /// Format, rotation and write failures sunk by the dispatcher.
    pub write_errors: IntCounter,
    /// Explicit sync requests executed by the dispatcher.
    pub syncs: IntCounter,
    /// Records refused because the logger was already closed, plus records
    /// still queued when an explicit shutdown stopped the dispatcher.
    pub records_dropped: IntCounter,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let records_written = IntCounter::new(
            "quill_records_written_total",
            "Records delivered to the writer",
        )?;
        let write_errors = IntCounter::new(
            "quill_write_errors_total",
            "Pipeline errors redirected to the error log",
        )?;
        let syncs = IntCounter::new("quill_syncs_total", "Explicit writer syncs")?;
        let records_dropped = IntCounter::new(
            "quill_records_dropped_total",
            "Records dropped after shutdown",
        )?;

        registry.register(Box::new(records_written.clone()))?;
        registry.register(Box::new(write_errors.clone()))?;
        registry.register(Box::new(syncs.clone()))?;
        registry.register(Box::new(records_dropped.clone()))?;

        Ok(Self {
            registry,
            records_written,
            write_errors,
            syncs,
            records_dropped,
        })
    }

    /// Render all counters in the prometheus text exposition format.
    pub fn gather_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.records_written.inc_by(3);
        metrics.write_errors.inc();

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("quill_records_written_total 3"));
        assert!(text.contains("quill_write_errors_total 1"));
        assert!(text.contains("quill_records_dropped_total 0"));
    }

    #[test]
    fn instances_do_not_share_registries() {
        let a = MetricsRecorder::new().unwrap();
        let b = MetricsRecorder::new().unwrap();
        a.syncs.inc();
        assert_eq!(a.syncs.get(), 1);
        assert_eq!(b.syncs.get(), 0);
    }
}
