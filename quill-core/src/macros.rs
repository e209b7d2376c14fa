//! Formatting macros.
//!
//! `info!("listening on {}", addr)` logs through the process-wide default
//! logger; `info!(logger: handle, "...")` targets a specific instance. Format
//! arguments are only evaluated when the severity passes the threshold.

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($logger:expr, $severity:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let severity = $severity;
        if logger.enabled(severity) {
            logger.log_at(severity, file!(), line!(), format_args!($($arg)+));
        }
    }};
}

#[macro_export]
macro_rules! trace {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::__log!($logger, $crate::Severity::Trace, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::global::logger(), $crate::Severity::Trace, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::__log!($logger, $crate::Severity::Debug, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::global::logger(), $crate::Severity::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::__log!($logger, $crate::Severity::Info, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::global::logger(), $crate::Severity::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::__log!($logger, $crate::Severity::Warn, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::global::logger(), $crate::Severity::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::__log!($logger, $crate::Severity::Error, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::global::logger(), $crate::Severity::Error, $($arg)+)
    };
}

/// Logs at `Fatal`. Does not terminate the process.
#[macro_export]
macro_rules! fatal {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::__log!($logger, $crate::Severity::Fatal, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::global::logger(), $crate::Severity::Fatal, $($arg)+)
    };
}
