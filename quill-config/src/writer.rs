//! Output selection: which writer and formatter a logger uses.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Built-in record renderings.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    /// Fixed-column text lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Built-in writers.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriterKind {
    /// Hourly rotating files under `root`.
    #[default]
    File,
    /// Size/time batched delivery to a network sink.
    Batch,
}

/// Batched network writer parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct BatchConfig {
    /// Collector address (`host:port`).
    #[serde(default = "default_address")]
    #[validate(custom(function = validation::validate_address))]
    pub address: String,

    /// Destination identifier attached to every batch.
    #[serde(default = "default_topic")]
    #[validate(length(min = 1, max = 255))]
    pub topic: String,

    /// Number of records that forces a flush.
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 65_536))]
    pub batch_size: usize,
}

fn default_address() -> String {
    "localhost:9092".into()
}

fn default_topic() -> String {
    "quill".into()
}

fn default_batch_size() -> usize {
    8
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            topic: default_topic(),
            batch_size: default_batch_size(),
        }
    }
}
