//! Severity levels and the threshold gate.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The six fixed severities, lowest first.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
        Severity::Fatal,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "Trace",
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warn => "Warn",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }

    // Values above Fatal cannot be stored, saturate anyway.
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Severity::Trace,
            1 => Severity::Debug,
            2 => Severity::Info,
            3 => Severity::Warn,
            4 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown severity '{0}'")]
pub struct ParseSeverityError(String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseSeverityError(s.to_owned()))
    }
}

/// True iff a record at `severity` passes a logger gated at `threshold`.
#[inline]
pub fn can_emit(threshold: Severity, severity: Severity) -> bool {
    severity >= threshold
}

/// Threshold cell shared between producers and setters.
///
/// Relaxed ordering is enough: a caller racing with `store` may observe the
/// previous threshold for its in-flight call, and nothing else is published
/// through this cell.
#[derive(Debug)]
pub struct AtomicSeverity(AtomicU8);

impl AtomicSeverity {
    pub const fn new(severity: Severity) -> Self {
        Self(AtomicU8::new(severity as u8))
    }

    #[inline]
    pub fn load(&self) -> Severity {
        Severity::from_u8(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, severity: Severity) {
        self.0.store(severity as u8, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_severity() -> impl Strategy<Value = Severity> {
        (0u8..6).prop_map(Severity::from_u8)
    }

    proptest! {
        #[test]
        fn gate_follows_total_order(threshold in any_severity(), severity in any_severity()) {
            prop_assert_eq!(can_emit(threshold, severity), severity as u8 >= threshold as u8);
        }

        #[test]
        fn atomic_cell_returns_last_store(first in any_severity(), second in any_severity()) {
            let cell = AtomicSeverity::new(first);
            prop_assert_eq!(cell.load(), first);
            cell.store(second);
            prop_assert_eq!(cell.load(), second);
        }
    }

    #[test]
    fn order_is_trace_to_fatal() {
        assert!(Severity::ALL.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("info".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!("WARN".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!("Fatal".parse::<Severity>(), Ok(Severity::Fatal));
        assert!("notice".parse::<Severity>().is_err());
    }

    #[test]
    fn serializes_as_name() {
        assert_eq!(serde_json::to_string(&Severity::Error).unwrap(), "\"Error\"");
    }
}
