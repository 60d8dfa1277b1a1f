//! Deterministic train/validation splitting

use super::LabelEncoding;
use crate::data;
use crate::error::{BoostflowError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Fraction of rows held out for validation.
pub const VALIDATION_FRACTION: f64 = 0.2;

/// Seed for the split shuffle. Fixed so re-running on the same input yields a
/// bit-identical partition.
pub const SPLIT_SEED: u64 = 0;

/// One side of a train/validation split: a feature matrix and the encoded
/// labels for the same rows. Consumed read-only by the trainer and evaluator.
#[derive(Debug, Clone)]
pub struct Partition {
    pub features: Array2<f64>,
    pub labels: Array1<f64>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Output of [`split`]: disjoint train/validation partitions covering every
/// input row, the label encoding they share, and the feature column order.
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub train: Partition,
    pub valid: Partition,
    pub encoding: LabelEncoding,
    pub feature_names: Vec<String>,
}

/// Split a dataset into train and validation partitions.
///
/// The label column is factorized into integer codes in first-occurrence
/// order and removed from the feature matrix. Rows are then shuffled with a
/// fixed seed and `ceil(0.2 * n)` of them held out for validation. The split
/// is stratification-agnostic and pure: the input frame is not modified.
pub fn split(df: &DataFrame, label_column: &str) -> Result<SplitOutput> {
    let n = df.height();
    if n == 0 {
        return Err(BoostflowError::EmptyDatasetError(
            "dataset has no rows".to_string(),
        ));
    }

    let label = df.column(label_column).map_err(|_| {
        BoostflowError::InvalidDatasetError(format!(
            "label column '{}' not found",
            label_column
        ))
    })?;

    let (encoding, codes) = LabelEncoding::fit(label.as_materialized_series())?;
    if encoding.num_classes() < 2 {
        return Err(BoostflowError::InvalidDatasetError(format!(
            "need at least 2 distinct labels, found {}",
            encoding.num_classes()
        )));
    }

    let feature_names = data::feature_columns(df, label_column);
    if feature_names.is_empty() {
        return Err(BoostflowError::InvalidDatasetError(
            "dataset has no feature columns besides the label".to_string(),
        ));
    }
    let x = data::columns_to_matrix(df, &feature_names)?;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(SPLIT_SEED);
    indices.shuffle(&mut rng);

    let n_valid = ((n as f64) * VALIDATION_FRACTION).ceil() as usize;
    let (valid_idx, train_idx) = indices.split_at(n_valid);

    Ok(SplitOutput {
        train: take_rows(&x, &codes, train_idx),
        valid: take_rows(&x, &codes, valid_idx),
        encoding,
        feature_names,
    })
}

fn take_rows(x: &Array2<f64>, codes: &[usize], idx: &[usize]) -> Partition {
    let features = Array2::from_shape_fn((idx.len(), x.ncols()), |(i, j)| x[[idx[i], j]]);
    let labels = Array1::from_iter(idx.iter().map(|&i| codes[i] as f64));
    Partition { features, labels }
}
