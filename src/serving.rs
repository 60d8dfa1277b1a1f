//! Scoring service for trained models
//!
//! An explicit context object holds the loaded model and label encoding;
//! nothing is process-global. The service decodes the deployment JSON
//! contract — `{"data": [{feature: value, …}, …]}` in, `{"predictions":
//! [label, …], "probabilities": {label: [p, …], …}}` out — and is the only
//! obligation the pipeline has toward the HTTP serving boundary, which lives
//! outside this crate.

use crate::error::{BoostflowError, Result};
use crate::preprocessing::LabelEncoding;
use crate::training::{ModelOutput, TrainedModel};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// One scoring request: rows keyed by feature name.
#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub data: Vec<HashMap<String, f64>>,
}

/// Scoring response: one predicted label per row plus per-label probability
/// columns.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub predictions: Vec<String>,
    pub probabilities: BTreeMap<String, Vec<f64>>,
}

/// Context object for scoring: a trained model and its label encoding,
/// constructed once and shared by every request.
pub struct ScoringService {
    model: TrainedModel,
    encoding: LabelEncoding,
}

impl ScoringService {
    pub fn new(model: TrainedModel, encoding: LabelEncoding) -> Self {
        Self { model, encoding }
    }

    /// Load a service from a persisted artifact directory (`model.json` and
    /// `labels.json`, as written by `DirectorySink`).
    pub fn load(dir: &Path) -> Result<Self> {
        let model: TrainedModel = serde_json::from_slice(&fs::read(dir.join("model.json"))?)?;

        #[derive(Deserialize)]
        struct LabelsDoc {
            labels: Vec<String>,
        }
        let doc: LabelsDoc = serde_json::from_slice(&fs::read(dir.join("labels.json"))?)?;

        info!(
            classes = doc.labels.len(),
            features = model.feature_names.len(),
            "scoring service loaded"
        );
        Ok(Self {
            model,
            encoding: LabelEncoding::from_classes(doc.labels),
        })
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn encoding(&self) -> &LabelEncoding {
        &self.encoding
    }

    /// Score a decoded request.
    pub fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse> {
        if request.data.is_empty() {
            return Err(BoostflowError::DataError(
                "scoring request contains no rows".to_string(),
            ));
        }

        let x = self.features_from_rows(&request.data)?;
        let output = self.model.predict_output(&x)?;

        let predictions = self.decode_predictions(&output)?;
        let probabilities = self.probability_columns(&output)?;

        Ok(ScoreResponse {
            predictions,
            probabilities,
        })
    }

    /// Score a raw JSON body, mapping any failure to an `{"error": …}` JSON
    /// object the way the deployment boundary expects.
    pub fn score_json(&self, raw: &str) -> String {
        let result = serde_json::from_str::<ScoreRequest>(raw)
            .map_err(BoostflowError::from)
            .and_then(|request| self.score(&request))
            .and_then(|response| serde_json::to_string(&response).map_err(Into::into));

        match result {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "scoring request failed");
                serde_json::json!({ "error": e.to_string() }).to_string()
            }
        }
    }

    fn features_from_rows(&self, rows: &[HashMap<String, f64>]) -> Result<Array2<f64>> {
        let names = &self.model.feature_names;
        let mut values = Vec::with_capacity(rows.len() * names.len());
        for row in rows {
            for name in names {
                let v = row
                    .get(name)
                    .ok_or_else(|| BoostflowError::FeatureNotFound(name.clone()))?;
                values.push(*v);
            }
        }
        Array2::from_shape_vec((rows.len(), names.len()), values).map_err(Into::into)
    }

    fn decode_predictions(&self, output: &ModelOutput) -> Result<Vec<String>> {
        output
            .predicted_classes()
            .into_iter()
            .map(|code| {
                self.encoding
                    .label_of(code)
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        BoostflowError::DataError(format!(
                            "predicted class {} is outside the label list",
                            code
                        ))
                    })
            })
            .collect()
    }

    fn probability_columns(&self, output: &ModelOutput) -> Result<BTreeMap<String, Vec<f64>>> {
        let label = |code: usize| -> Result<String> {
            self.encoding
                .label_of(code)
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    BoostflowError::DataError(format!("class {} is outside the label list", code))
                })
        };

        let mut columns = BTreeMap::new();
        match output {
            ModelOutput::Binary(p) => {
                columns.insert(label(0)?, p.iter().map(|&v| 1.0 - v).collect());
                columns.insert(label(1)?, p.iter().copied().collect());
            }
            ModelOutput::Multiclass(proba) => {
                for class in 0..proba.ncols() {
                    columns.insert(label(class)?, proba.column(class).iter().copied().collect());
                }
            }
        }
        Ok(columns)
    }
}
