//! End-to-end training pipeline orchestration
//!
//! Sequences split → train → evaluate and hands the three run artifacts to a
//! persistence collaborator. Stages run strictly in order; the first failure
//! halts the run and nothing is persisted.

use crate::data;
use crate::error::Result;
use crate::evaluation::{self, MetricsReport};
use crate::preprocessing::{self, LabelEncoding};
use crate::training::{TrainedModel, Trainer, TrainerConfig};
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The artifacts of a completed run: the serialized model, the metrics
/// document, and the label encoding as an ordered list of original labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifacts {
    /// JSON-serialized [`TrainedModel`].
    pub model_blob: Vec<u8>,
    pub metrics: MetricsReport,
    /// Original label values; index equals integer code.
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Persistence collaborator. Receives the artifacts of a successful run in a
/// single call; the pipeline never persists partial results.
pub trait ArtifactSink {
    fn persist(&mut self, artifacts: &RunArtifacts) -> Result<()>;
}

/// What a run hands back to the caller.
#[derive(Debug)]
pub struct TrainingRun {
    pub model: TrainedModel,
    pub metrics: MetricsReport,
    pub encoding: LabelEncoding,
}

/// Sequences the pipeline stages for one training run.
pub struct Pipeline {
    config: TrainerConfig,
}

impl Pipeline {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Load `dataset_path` and run split → train → evaluate, persisting the
    /// artifacts through `sink` once all three exist.
    pub fn run(
        &self,
        dataset_path: &Path,
        label_column: &str,
        sink: &mut dyn ArtifactSink,
    ) -> Result<TrainingRun> {
        let df = data::load_dataframe(dataset_path)?;
        self.run_frame(&df, label_column, sink)
    }

    /// Same as [`Pipeline::run`] but on an already-loaded frame.
    pub fn run_frame(
        &self,
        df: &DataFrame,
        label_column: &str,
        sink: &mut dyn ArtifactSink,
    ) -> Result<TrainingRun> {
        info!(rows = df.height(), cols = df.width(), "starting training run");

        let split = preprocessing::split(df, label_column)?;
        info!(
            train_rows = split.train.len(),
            valid_rows = split.valid.len(),
            classes = split.encoding.num_classes(),
            "split dataset"
        );

        let trainer = Trainer::new(self.config.clone());
        let model = trainer.train(&split.train, &split.valid, &split.feature_names)?;

        let metrics = evaluation::evaluate(&model, &split.valid, &split.encoding)?;
        for (name, value) in metrics.iter() {
            info!(metric = name, value, "validation metric");
        }

        let artifacts = RunArtifacts {
            model_blob: serde_json::to_vec(&model)?,
            metrics: metrics.clone(),
            labels: split.encoding.classes().to_vec(),
            created_at: Utc::now(),
        };
        sink.persist(&artifacts)?;

        Ok(TrainingRun {
            model,
            metrics,
            encoding: split.encoding,
        })
    }
}

/// File-based [`ArtifactSink`] writing `model.json`, `metrics.json` and
/// `labels.json` into a directory. If any write fails, everything written so
/// far is removed.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_all(&self, artifacts: &RunArtifacts, written: &mut Vec<PathBuf>) -> Result<()> {
        let model_path = self.dir.join("model.json");
        written.push(model_path.clone());
        fs::write(&model_path, &artifacts.model_blob)?;

        let metrics_path = self.dir.join("metrics.json");
        written.push(metrics_path.clone());
        fs::write(&metrics_path, serde_json::to_vec_pretty(&artifacts.metrics)?)?;

        let labels_path = self.dir.join("labels.json");
        written.push(labels_path.clone());
        let labels_doc = serde_json::json!({
            "labels": artifacts.labels,
            "created_at": artifacts.created_at,
        });
        fs::write(&labels_path, serde_json::to_vec_pretty(&labels_doc)?)?;

        Ok(())
    }
}

impl ArtifactSink for DirectorySink {
    fn persist(&mut self, artifacts: &RunArtifacts) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut written = Vec::new();
        let result = self.write_all(artifacts, &mut written);
        if result.is_err() {
            for path in written {
                let _ = fs::remove_file(path);
            }
        }
        result
    }
}
