//! Tabular data access
//!
//! File loading and DataFrame-to-matrix extraction. The pipeline core only
//! requires a deserialized row-oriented table; this module is the collaborator
//! that produces one from CSV, JSON or Parquet files.

use crate::error::{BoostflowError, Result};
use ndarray::Array2;
use polars::prelude::*;
use std::path::Path;

/// Load a DataFrame from a file, dispatching on the extension.
pub fn load_dataframe(path: &Path) -> Result<DataFrame> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let df = match ext {
        "csv" => CsvReadOptions::default()
            .with_infer_schema_length(Some(1000))
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        "json" => JsonReader::new(std::fs::File::open(path)?).finish()?,
        "parquet" => ParquetReader::new(std::fs::File::open(path)?).finish()?,
        _ => {
            return Err(BoostflowError::DataError(format!(
                "unsupported file format: '{}'",
                ext
            )))
        }
    };

    Ok(df)
}

/// All column names except the label column, in frame order.
pub fn feature_columns(df: &DataFrame, label_column: &str) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != label_column)
        .map(|s| s.to_string())
        .collect()
}

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`.
///
/// Every row must have a value for every requested column; a null cell is an
/// `InvalidDatasetError`, a non-numeric column a `DataError`.
pub fn columns_to_matrix(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let mut col_data: Vec<Vec<f64>> = Vec::with_capacity(n_cols);
    for col_name in col_names {
        let column = df
            .column(col_name)
            .map_err(|_| BoostflowError::FeatureNotFound(col_name.clone()))?;
        let column_f64 = column.cast(&DataType::Float64).map_err(|e| {
            BoostflowError::DataError(format!(
                "feature column '{}' is not numeric: {}",
                col_name, e
            ))
        })?;
        let ca = column_f64
            .f64()
            .map_err(|e| BoostflowError::DataError(e.to_string()))?;

        let mut values = Vec::with_capacity(n_rows);
        for v in ca.into_iter() {
            match v {
                Some(v) => values.push(v),
                None => {
                    return Err(BoostflowError::InvalidDatasetError(format!(
                        "null value in feature column '{}'",
                        col_name
                    )))
                }
            }
        }
        col_data.push(values);
    }

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}
