//! Failures while assembling a [`LoggerConfig`](crate::LoggerConfig).

use std::fmt::Write;
use std::path::PathBuf;

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested logger config file does not exist. The
    /// implicit `config/quill.yaml` is skipped instead.
    #[error("logger config file {0} does not exist")]
    FileNotFound(PathBuf),

    /// Values that parsed but cannot drive a logger: an unknown level name,
    /// an empty root or error log path, a bad batch address, topic or size.
    #[error("invalid logger config:\n{}", describe(.0))]
    Validation(#[source] ValidationErrors),

    /// The YAML file or a `QUILL_*` variable could not be merged into the
    /// config shape.
    #[error("cannot read logger config: {0}")]
    Parsing(#[source] Box<figment::Error>),
}

/// One `path: message` line per failure, nested sections as `batch.topic`,
/// sorted so the output is stable.
fn describe(errors: &ValidationErrors) -> String {
    let mut lines = Vec::new();
    collect(errors, "", &mut lines);
    lines.sort();

    let mut out = String::new();
    for line in lines {
        let _ = writeln!(out, "  {line}");
    }
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, lines: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let reason = failure
                        .message
                        .as_deref()
                        .unwrap_or(&failure.code);
                    lines.push(format!("{path}: {reason}"));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, &path, lines),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{path}[{index}]"), lines);
                }
            }
        }
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Parsing(Box::new(error))
    }
}
