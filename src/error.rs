//! Error types for the boostflow pipeline

use thiserror::Error;

/// Result type alias for boostflow operations
pub type Result<T> = std::result::Result<T, BoostflowError>;

/// Main error type for the boostflow pipeline
///
/// The first four variants are the terminal failure modes of a training run;
/// the remaining variants cover data access and serialization plumbing. No
/// error is retried inside the pipeline.
#[derive(Error, Debug)]
pub enum BoostflowError {
    #[error("Invalid dataset: {0}")]
    InvalidDatasetError(String),

    #[error("Empty dataset: {0}")]
    EmptyDatasetError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),
}

impl From<polars::error::PolarsError> for BoostflowError {
    fn from(err: polars::error::PolarsError) -> Self {
        BoostflowError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for BoostflowError {
    fn from(err: serde_json::Error) -> Self {
        BoostflowError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for BoostflowError {
    fn from(err: ndarray::ShapeError) -> Self {
        BoostflowError::DataError(err.to_string())
    }
}
