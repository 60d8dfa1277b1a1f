//! Label encoding over arbitrary label values

use crate::error::{BoostflowError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bijective mapping from original label values to dense integer codes.
///
/// Codes are assigned in first-occurrence order over the label column, so the
/// encoding is deterministic for a fixed row order and the code space is
/// `0..K-1` with no gaps. Label values are canonicalized to strings before
/// encoding, which makes the encoding dtype-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoding {
    classes: Vec<String>,
}

impl LabelEncoding {
    /// Fit an encoding over a label column, returning the encoding together
    /// with the per-row integer codes.
    ///
    /// A null label is an `InvalidDatasetError`; every row used for training
    /// or evaluation must carry a label.
    pub fn fit(series: &Series) -> Result<(Self, Vec<usize>)> {
        let canonical = series
            .cast(&DataType::String)
            .map_err(|e| BoostflowError::DataError(e.to_string()))?;
        let ca = canonical
            .str()
            .map_err(|e| BoostflowError::DataError(e.to_string()))?;

        let mut classes: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut codes = Vec::with_capacity(series.len());

        for val in ca.into_iter() {
            let val = val.ok_or_else(|| {
                BoostflowError::InvalidDatasetError(format!(
                    "null label in column '{}'",
                    series.name()
                ))
            })?;
            let code = match index.get(val) {
                Some(&code) => code,
                None => {
                    let code = classes.len();
                    index.insert(val.to_string(), code);
                    classes.push(val.to_string());
                    code
                }
            };
            codes.push(code);
        }

        Ok((Self { classes }, codes))
    }

    /// Rebuild an encoding from a persisted ordered label list.
    pub fn from_classes(classes: Vec<String>) -> Self {
        Self { classes }
    }

    /// The integer code of a label, if the label was seen during fitting.
    pub fn code_of(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    /// The original label for a code.
    pub fn label_of(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(|s| s.as_str())
    }

    /// Original labels in code order; index equals integer code.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of distinct labels observed.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_order() {
        let series = Series::new("label".into(), &["pear", "apple", "pear", "fig", "apple"]);
        let (encoding, codes) = LabelEncoding::fit(&series).unwrap();

        assert_eq!(encoding.classes(), &["pear", "apple", "fig"]);
        assert_eq!(codes, vec![0, 1, 0, 2, 1]);
    }

    #[test]
    fn test_bijection_round_trip() {
        let series = Series::new("label".into(), &["a", "b", "c", "b", "a"]);
        let (encoding, codes) = LabelEncoding::fit(&series).unwrap();

        for label in ["a", "b", "c"] {
            let code = encoding.code_of(label).unwrap();
            assert_eq!(encoding.label_of(code), Some(label));
        }
        // Every code in 0..K-1 is used at least once.
        for code in 0..encoding.num_classes() {
            assert!(codes.contains(&code));
        }
    }

    #[test]
    fn test_numeric_labels_are_canonicalized() {
        let series = Series::new("label".into(), &[3i64, 1, 3, 2]);
        let (encoding, codes) = LabelEncoding::fit(&series).unwrap();

        assert_eq!(encoding.num_classes(), 3);
        assert_eq!(codes, vec![0, 1, 0, 2]);
    }

    #[test]
    fn test_null_label_rejected() {
        let series = Series::new("label".into(), &[Some("a"), None, Some("b")]);
        let err = LabelEncoding::fit(&series).unwrap_err();
        assert!(matches!(err, BoostflowError::InvalidDatasetError(_)));
    }
}
