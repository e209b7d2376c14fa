//! Custom validation functions for configuration.

use std::path::Path;

use validator::ValidationError;

/// Names accepted for the severity threshold, lowest first.
pub const LEVEL_NAMES: [&str; 6] = ["trace", "debug", "info", "warn", "error", "fatal"];

/// Validate that the level names one of the six severities.
pub fn validate_level(level: &str) -> Result<(), ValidationError> {
    if LEVEL_NAMES.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_level"))
    }
}

/// Validate that a path is present.
pub fn validate_path(path: &Path) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        Err(ValidationError::new("empty_path"))
    } else {
        Ok(())
    }
}

/// Validate a `host:port` style address without resolving it.
pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(ValidationError::new("invalid_address")),
    }
}
