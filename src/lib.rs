//! boostflow - gradient-boosted tabular classification pipeline
//!
//! A supervised training/evaluation pipeline for tabular data:
//!
//! - [`preprocessing`] - label encoding and deterministic train/validation
//!   splitting
//! - [`training`] - boosted-tree training with validation-driven early
//!   stopping
//! - [`evaluation`] - accuracy and AUC-family metrics, binary and multi-class
//! - [`pipeline`] - orchestration and artifact persistence
//! - [`serving`] - scoring service over persisted run artifacts
//! - [`data`] - tabular file loading and matrix extraction
//! - [`cli`] - command-line interface

pub mod error;

pub mod data;
pub mod evaluation;
pub mod pipeline;
pub mod preprocessing;
pub mod serving;
pub mod training;

pub mod cli;

pub use error::{BoostflowError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{BoostflowError, Result};

    pub use crate::preprocessing::{split, LabelEncoding, Partition, SplitOutput};

    pub use crate::training::{ModelOutput, Objective, TrainedModel, Trainer, TrainerConfig};

    pub use crate::evaluation::{evaluate, MetricsReport};

    pub use crate::pipeline::{ArtifactSink, DirectorySink, Pipeline, RunArtifacts, TrainingRun};

    pub use crate::serving::{ScoreRequest, ScoreResponse, ScoringService};
}
