//! Numeric feature matrix with an explicit mapping back to table rows.

use crate::config::AnomalyConfig;
use crate::error::{QualityError, Result};
use crate::utils::{finite_f64_values, is_numeric_dtype, numeric_column_names};
use polars::prelude::*;
use tracing::{debug, warn};

/// Numeric, missing-free projection of a table.
///
/// Values are stored row-major. `row_index[i]` is the position in the source
/// table of matrix row `i`; it is strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Vec<f64>,
    row_index: Vec<usize>,
    source_rows: usize,
}

impl FeatureMatrix {
    /// Build a matrix from explicit rows. Used by tests and callers that
    /// already hold numeric data.
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let mut values = Vec::with_capacity(rows.len() * columns.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(QualityError::Internal(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            columns,
            values,
            row_index: (0..rows.len()).collect(),
            source_rows: rows.len(),
        })
    }

    /// Project `df` onto `columns`, dropping every row with a missing,
    /// unconvertible or non-finite value in any of them.
    pub fn from_table(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let column_values = read_columns(df, columns)?;

        let mut values = Vec::new();
        let mut row_index = Vec::new();

        for row in 0..df.height() {
            let row_values: Option<Vec<f64>> = column_values.iter().map(|col| col[row]).collect();
            if let Some(row_values) = row_values {
                values.extend(row_values);
                row_index.push(row);
            }
        }

        debug!(
            "Feature matrix: {} of {} rows kept across {} columns",
            row_index.len(),
            df.height(),
            columns.len()
        );

        Ok(Self {
            columns: columns.to_vec(),
            values,
            row_index,
            source_rows: df.height(),
        })
    }

    /// Project `df` onto `columns`, replacing missing, unconvertible and
    /// non-finite values with the mean of the column's usable values. Every
    /// row is kept. A column with no usable value cannot be imputed and is
    /// left out of the matrix.
    pub fn from_table_imputed(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let column_values = read_columns(df, columns)?;

        let mut kept_columns = Vec::with_capacity(columns.len());
        let mut filled_columns = Vec::with_capacity(columns.len());

        for (name, values) in columns.iter().zip(column_values) {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            if present.is_empty() {
                warn!("Column '{}' has no numeric values to impute from; skipping it", name);
                continue;
            }
            let mean = present.iter().sum::<f64>() / present.len() as f64;
            let imputed = values.len() - present.len();
            if imputed > 0 {
                debug!("Column '{}': {} values imputed with mean {}", name, imputed, mean);
            }

            kept_columns.push(name.clone());
            filled_columns.push(
                values
                    .into_iter()
                    .map(|v| v.unwrap_or(mean))
                    .collect::<Vec<f64>>(),
            );
        }

        let height = if kept_columns.is_empty() { 0 } else { df.height() };
        let mut values = Vec::with_capacity(height * kept_columns.len());
        for row in 0..height {
            values.extend(filled_columns.iter().map(|col| col[row]));
        }

        debug!(
            "Imputed feature matrix: {} rows across {} of {} columns",
            height,
            kept_columns.len(),
            columns.len()
        );

        Ok(Self {
            columns: kept_columns,
            values,
            row_index: (0..height).collect(),
            source_rows: df.height(),
        })
    }

    /// Column names in matrix order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.row_index.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_index.is_empty() || self.columns.is_empty()
    }

    /// Number of rows in the table the matrix was built from.
    pub fn source_rows(&self) -> usize {
        self.source_rows
    }

    /// Values of matrix row `i`.
    pub fn row(&self, i: usize) -> &[f64] {
        let width = self.columns.len();
        &self.values[i * width..(i + 1) * width]
    }

    #[inline]
    pub fn value(&self, row: usize, feature: usize) -> f64 {
        self.values[row * self.columns.len() + feature]
    }

    /// Iterate over the values of one feature column.
    pub fn column_values(&self, feature: usize) -> impl Iterator<Item = f64> + '_ {
        (0..self.n_rows()).map(move |row| self.value(row, feature))
    }

    /// Original table row of matrix row `i`.
    pub fn original_index(&self, i: usize) -> usize {
        self.row_index[i]
    }

    /// The full matrix row → table row mapping.
    pub fn row_index(&self) -> &[usize] {
        &self.row_index
    }
}

/// Read each of `columns` as finite floats; `None` marks a missing,
/// unconvertible or non-finite value.
fn read_columns(df: &DataFrame, columns: &[String]) -> Result<Vec<Vec<Option<f64>>>> {
    let mut column_values = Vec::with_capacity(columns.len());

    for name in columns {
        let column = df
            .column(name)
            .map_err(|_| QualityError::ColumnNotFound(name.clone()))?;
        let series = column.as_materialized_series();
        let values = finite_f64_values(series)?;

        let unusable = values.iter().filter(|v| v.is_none()).count();
        let converted_away = unusable.saturating_sub(series.null_count());
        if converted_away > 0 {
            if is_numeric_dtype(series.dtype()) {
                debug!("Column '{}': {} non-finite values", name, converted_away);
            } else {
                warn!(
                    "Column '{}': {} values could not be read as numbers",
                    name, converted_away
                );
            }
        }

        column_values.push(values);
    }

    Ok(column_values)
}

/// Pick the feature columns for `df`.
///
/// Explicit columns from the config must exist. Without an explicit list,
/// every integer and float column is used.
pub fn select_feature_columns(df: &DataFrame, config: &AnomalyConfig) -> Result<Vec<String>> {
    match &config.columns {
        Some(columns) => {
            for name in columns {
                if df.column(name).is_err() {
                    return Err(QualityError::ColumnNotFound(name.clone()));
                }
            }
            Ok(columns.clone())
        }
        None => Ok(numeric_column_names(df)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_rows_with_missing_values_and_keeps_mapping() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "b" => [Some(10i64), Some(20), None, Some(40)],
            "label" => ["x", "y", "z", "w"],
        ]
        .unwrap();

        let matrix =
            FeatureMatrix::from_table(&df, &["a".to_string(), "b".to_string()]).unwrap();

        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.row_index(), &[0, 3]);
        assert_eq!(matrix.row(1), &[4.0, 40.0]);
        assert_eq!(matrix.source_rows(), 4);
    }

    #[test]
    fn test_non_finite_values_are_missing() {
        let df = df![
            "a" => [1.0, f64::NAN, f64::INFINITY, 2.0],
        ]
        .unwrap();

        let matrix = FeatureMatrix::from_table(&df, &["a".to_string()]).unwrap();
        assert_eq!(matrix.row_index(), &[0, 3]);
    }

    #[test]
    fn test_unconvertible_strings_drop_rows() {
        let df = df![
            "amount" => ["1.5", "oops", "3"],
        ]
        .unwrap();

        let matrix = FeatureMatrix::from_table(&df, &["amount".to_string()]).unwrap();
        assert_eq!(matrix.row_index(), &[0, 2]);
        assert_eq!(matrix.column_values(0).collect::<Vec<_>>(), vec![1.5, 3.0]);
    }

    #[test]
    fn test_imputed_matrix_keeps_every_row() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0), Some(f64::NAN)],
            "b" => [Some(10i64), Some(20), None, Some(30)],
        ]
        .unwrap();

        let matrix =
            FeatureMatrix::from_table_imputed(&df, &["a".to_string(), "b".to_string()]).unwrap();

        assert_eq!(matrix.row_index(), &[0, 1, 2, 3]);
        assert_eq!(matrix.row(1), &[2.0, 20.0]);
        assert_eq!(matrix.row(2), &[3.0, 20.0]);
        assert_eq!(matrix.row(3), &[2.0, 30.0]);
    }

    #[test]
    fn test_imputed_matrix_skips_columns_without_values() {
        let df = df![
            "empty" => [None::<f64>, None, None],
            "b" => [Some(1.0), None, Some(5.0)],
        ]
        .unwrap();

        let matrix =
            FeatureMatrix::from_table_imputed(&df, &["empty".to_string(), "b".to_string()])
                .unwrap();
        assert_eq!(matrix.columns(), &["b".to_string()]);
        assert_eq!(matrix.column_values(0).collect::<Vec<_>>(), vec![1.0, 3.0, 5.0]);

        let nothing = FeatureMatrix::from_table_imputed(&df, &["empty".to_string()]).unwrap();
        assert!(nothing.is_empty());
    }

    #[test]
    fn test_select_numeric_columns_by_default() {
        let df = df![
            "id" => [1i64, 2],
            "name" => ["a", "b"],
            "score" => [0.5, 0.7],
            "flag" => [true, false],
        ]
        .unwrap();

        let columns = select_feature_columns(&df, &AnomalyConfig::default()).unwrap();
        assert_eq!(columns, vec!["id".to_string(), "score".to_string()]);
    }

    #[test]
    fn test_select_explicit_missing_column_errors() {
        let df = df!["a" => [1.0]].unwrap();
        let config = AnomalyConfig::builder().columns(["b"]).build().unwrap();

        let err = select_feature_columns(&df, &config).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let result = FeatureMatrix::from_rows(
            vec!["a".to_string(), "b".to_string()],
            &[vec![1.0, 2.0], vec![3.0]],
        );
        assert!(result.is_err());
    }
}
