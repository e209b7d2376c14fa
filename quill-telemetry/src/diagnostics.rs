//! Diagnostics subscriber for the logger's own `tracing` events.
//!
//! Library code only emits events; binaries decide whether to install this
//! subscriber. Filtering follows the `QUILL_DIAG` environment variable using
//! `EnvFilter` directive syntax and defaults to `warn`.

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the diagnostics filter.
pub const DIAG_ENV: &str = "QUILL_DIAG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Build the filter from `QUILL_DIAG`, falling back to `warn`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(DIAG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install a stderr fmt subscriber. Does nothing if a global subscriber is already set.
pub fn init() {
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        init();
        init();
        tracing::warn!("diagnostics installed");
    }
}
