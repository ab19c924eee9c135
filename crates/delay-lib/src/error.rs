//! Error types for the directory, predictor and orchestrator

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the airport directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("airport data not loaded")]
    NotLoaded,

    #[error("failed to read airport data from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed airport data: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed airport data at row {row}: {reason}")]
    Malformed { row: usize, reason: String },

    #[error("airport data is missing required column {0}")]
    MissingColumn(&'static str),
}

/// Errors raised by the delay predictor
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("model not loaded")]
    NotLoaded,

    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model bundle: {0}")]
    Bundle(#[from] serde_json::Error),

    #[error("invalid model bundle: {0}")]
    InvalidBundle(String),

    #[error("model artifact is corrupt: {0}")]
    Corrupt(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Errors raised by the prediction service lifecycle
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("airport directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("model error: {0}")]
    Predictor(#[from] PredictorError),

    #[error("service state lock poisoned")]
    LockPoisoned,
}
