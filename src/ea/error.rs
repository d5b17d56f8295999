//! Error types for the evolutionary loop.

use std::io;
use std::path::PathBuf;

/// Failure reported by an evaluator for a single individual.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct EvaluationFailure(pub String);

impl EvaluationFailure {
    /// Builds a failure from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("mu must be at least 1")]
    MuTooSmall,
    #[error("ngen must be at least 1")]
    NoGenerations,
    #[error("{name} probability must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("timeout percentile must lie in [0, 100], got {0}")]
    InvalidPercentile(f64),
    #[error("archive size must be at least 1")]
    ArchiveTooSmall,
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

/// Checkpoint persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// The record is missing required fields or fails structural validation.
    #[error("checkpoint {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The durable store rejected the write.
    #[error("failed to write checkpoint {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The checkpoint could not be read.
    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The state could not be encoded.
    #[error("failed to encode checkpoint: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors surfaced by the evolutionary loop.
#[derive(Debug, thiserror::Error)]
pub enum EaError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// An evaluation failed; the generation was aborted and no fitness was
    /// written.
    #[error("evaluation of individual {index} failed: {source}")]
    Evaluation {
        index: usize,
        #[source]
        source: EvaluationFailure,
    },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("resume requested but no checkpoint path is configured")]
    NoCheckpointPath,

    #[error("initial population is empty")]
    EmptyPopulation,
}
