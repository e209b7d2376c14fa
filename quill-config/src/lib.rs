//! # Quill Configuration System
//!
//! Declarative configuration for a quill logger instance.
//!
//! ## Features
//! - **Single struct**: every knob of a logger lives in [`LoggerConfig`]
//! - **Validation**: runtime validation of capacities, paths and batch sizes
//! - **Layered loading**: defaults, YAML file, then `QUILL_*` environment variables

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod validation;
mod writer;

pub use error::ConfigError;
pub use writer::{BatchConfig, FormatterKind, WriterKind};

/// Default location of the base configuration file.
pub const CONFIG_FILE: &str = "config/quill.yaml";

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "QUILL_";

/// Configuration of one logger instance.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct LoggerConfig {
    /// Minimum severity that is emitted (`trace`, `debug`, `info`, `warn`, `error`, `fatal`).
    #[serde(default = "default_level")]
    #[validate(custom(function = validation::validate_level))]
    pub level: String,

    /// Capacity of the hand-off queue. `0` makes every log call a rendezvous
    /// with the dispatcher thread.
    #[serde(default = "default_queue_capacity")]
    #[validate(range(max = 1_048_576))]
    pub queue_capacity: usize,

    /// Root directory of the rotating file writer.
    #[serde(default = "default_root")]
    #[validate(custom(function = validation::validate_path))]
    pub root: PathBuf,

    /// File that receives pipeline errors (failed writes, failed rotations).
    #[serde(default = "default_error_log")]
    #[validate(custom(function = validation::validate_path))]
    pub error_log: PathBuf,

    /// Record rendering.
    #[serde(default)]
    pub formatter: FormatterKind,

    /// Output writer.
    #[serde(default)]
    pub writer: WriterKind,

    /// Parameters of the batched network writer, used when `writer` is `batch`.
    #[serde(default)]
    #[validate(nested)]
    pub batch: BatchConfig,
}

fn default_level() -> String {
    "info".into()
}

/// One queue slot per CPU.
pub fn default_queue_capacity() -> usize {
    num_cpus::get()
}

fn default_root() -> PathBuf {
    PathBuf::from("logs")
}

fn default_error_log() -> PathBuf {
    PathBuf::from("logs").join("quill-errors.log")
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            queue_capacity: default_queue_capacity(),
            root: default_root(),
            error_log: default_error_log(),
            formatter: FormatterKind::default(),
            writer: WriterKind::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/quill.yaml`, skipped when missing
    /// 3. `QUILL_*` environment variables (`__` separates nested keys)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(LoggerConfig::default()));

        if Path::new(CONFIG_FILE).exists() {
            figment = figment.merge(Yaml::file(CONFIG_FILE));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific YAML file, with environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let figment = Figment::from(Serialized::defaults(LoggerConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Run validation and convert failures into [`ConfigError`].
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        self.validate().map_err(ConfigError::from)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.ensure_valid()?;
                Ok(config)
            })
    }
}
