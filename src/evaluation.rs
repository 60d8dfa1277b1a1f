//! Model evaluation: accuracy and AUC-family metrics
//!
//! Scoring branches on the task. Binary models get a single ROC-AUC over the
//! raw positive-class score; multi-class models get one one-vs-rest ROC-AUC
//! per class plus their unweighted mean. A class with no positive (or no
//! negative) validation rows has no defined ROC curve and is skipped: no
//! per-class key is reported for it and it is excluded from the macro
//! average.

use crate::error::{BoostflowError, Result};
use crate::preprocessing::{LabelEncoding, Partition};
use crate::training::{ModelOutput, TrainedModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// A flat mapping from metric name to value, created once per training run.
///
/// Binary tasks report `{accuracy, auc}`; multi-class tasks report
/// `{accuracy, auc_class_<label>…, auc_macro}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsReport {
    values: BTreeMap<String, f64>,
}

impl MetricsReport {
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Score a trained model against a validation partition.
pub fn evaluate(
    model: &TrainedModel,
    valid: &Partition,
    encoding: &LabelEncoding,
) -> Result<MetricsReport> {
    let n = valid.labels.len();
    if valid.features.nrows() != n {
        return Err(BoostflowError::EvaluationError(format!(
            "partition shape mismatch: {} feature rows but {} labels",
            valid.features.nrows(),
            n
        )));
    }

    let distinct = distinct_labels(valid);
    if distinct.len() < 2 {
        return Err(BoostflowError::EvaluationError(format!(
            "validation partition has {} distinct label(s); AUC needs at least 2",
            distinct.len()
        )));
    }

    let output = model.predict_output(&valid.features)?;
    if output.len() != n {
        return Err(BoostflowError::EvaluationError(format!(
            "model produced {} output rows for {} validation rows",
            output.len(),
            n
        )));
    }

    let k = encoding.num_classes();
    match (&output, k) {
        (ModelOutput::Binary(_), 2) => {}
        (ModelOutput::Multiclass(proba), _) if proba.ncols() == k => {}
        _ => {
            return Err(BoostflowError::EvaluationError(format!(
                "model output does not match the {}-class label encoding",
                k
            )));
        }
    }

    let mut report = MetricsReport::default();

    let predicted = output.predicted_classes();
    let correct = predicted
        .iter()
        .zip(valid.labels.iter())
        .filter(|(&p, &y)| p as f64 == y)
        .count();
    report.insert("accuracy", correct as f64 / n as f64);

    match &output {
        ModelOutput::Binary(scores) => {
            let positive: Vec<bool> = valid.labels.iter().map(|&y| y >= 0.5).collect();
            let scores: Vec<f64> = scores.iter().copied().collect();
            report.insert("auc", roc_auc(&scores, &positive));
        }
        ModelOutput::Multiclass(proba) => {
            let mut per_class = Vec::new();
            for (class, label) in encoding.classes().iter().enumerate() {
                let positive: Vec<bool> =
                    valid.labels.iter().map(|&y| y as usize == class).collect();
                let n_pos = positive.iter().filter(|&&p| p).count();
                if n_pos == 0 || n_pos == n {
                    warn!(
                        label = %label,
                        "class has no positive/negative validation rows; skipping its AUC"
                    );
                    continue;
                }
                let scores: Vec<f64> = proba.column(class).iter().copied().collect();
                let auc = roc_auc(&scores, &positive);
                report.insert(format!("auc_class_{}", label), auc);
                per_class.push(auc);
            }
            if per_class.is_empty() {
                return Err(BoostflowError::EvaluationError(
                    "no class has both positive and negative validation rows".to_string(),
                ));
            }
            let macro_auc = per_class.iter().sum::<f64>() / per_class.len() as f64;
            report.insert("auc_macro", macro_auc);
        }
    }

    Ok(report)
}

fn distinct_labels(valid: &Partition) -> Vec<i64> {
    let mut labels: Vec<i64> = valid.labels.iter().map(|&y| y as i64).collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

/// Area under the ROC curve via the rank-sum statistic, with midranks for
/// tied scores. Callers must guarantee both classes are present.
fn roc_auc(scores: &[f64], positive: &[bool]) -> f64 {
    let n = scores.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let midrank = (i + j) as f64 / 2.0 + 1.0;
        for r in i..=j {
            ranks[order[r]] = midrank;
        }
        i = j + 1;
    }

    let n_pos = positive.iter().filter(|&&p| p).count() as f64;
    let n_neg = n as f64 - n_pos;
    let rank_sum: f64 = (0..n).filter(|&i| positive[i]).map(|i| ranks[i]).sum();
    (rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}
