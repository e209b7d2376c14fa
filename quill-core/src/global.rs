//! Process-wide default logger.
//!
//! The default is built at most once. [`init`] or [`init_with`] install it
//! explicitly; otherwise the first call that needs it builds one from
//! [`LoggerConfig::default`]. If that build fails the default is a
//! [`Logger::disabled`] handle and the failure is reported through `tracing`.

use std::fmt;

use once_cell::sync::OnceCell;
use quill_config::LoggerConfig;
use tracing::error;

use crate::error::LoggerError;
use crate::level::Severity;
use crate::logger::{Logger, LoggerBuilder};

static DEFAULT: OnceCell<Logger> = OnceCell::new();

/// Install the default logger from `config`.
pub fn init(config: &LoggerConfig) -> Result<(), LoggerError> {
    init_with(LoggerBuilder::from_config(config)?)
}

/// Install the default logger from a prepared builder.
///
/// Fails with [`LoggerError::AlreadyInitialized`] once a default exists,
/// whether it was installed explicitly or built on first use.
pub fn init_with(builder: LoggerBuilder) -> Result<(), LoggerError> {
    let mut created = false;
    DEFAULT.get_or_try_init(|| {
        created = true;
        builder.build()
    })?;
    if created {
        Ok(())
    } else {
        Err(LoggerError::AlreadyInitialized)
    }
}

/// The default logger, built on first use.
pub fn logger() -> &'static Logger {
    DEFAULT.get_or_init(|| {
        LoggerBuilder::from_config(&LoggerConfig::default())
            .and_then(LoggerBuilder::build)
            .unwrap_or_else(|e| {
                error!(error = %e, "default logger unavailable, records will be discarded");
                Logger::disabled()
            })
    })
}

pub fn set_level(level: Severity) {
    logger().set_level(level);
}

pub fn level() -> Severity {
    logger().level()
}

#[track_caller]
pub fn trace(msg: impl fmt::Display) {
    logger().trace(msg);
}

#[track_caller]
pub fn debug(msg: impl fmt::Display) {
    logger().debug(msg);
}

#[track_caller]
pub fn info(msg: impl fmt::Display) {
    logger().info(msg);
}

#[track_caller]
pub fn warn(msg: impl fmt::Display) {
    logger().warn(msg);
}

#[track_caller]
pub fn error(msg: impl fmt::Display) {
    logger().error(msg);
}

#[track_caller]
pub fn fatal(msg: impl fmt::Display) {
    logger().fatal(msg);
}

pub fn sync() {
    logger().sync();
}

/// Close the default logger. Later calls through it are dropped.
pub fn shutdown() {
    if let Some(logger) = DEFAULT.get() {
        logger.close();
    }
}
