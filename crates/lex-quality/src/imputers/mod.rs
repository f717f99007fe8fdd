//! Constant null filling.
//!
//! Each requested column gets its missing cells (nulls, and NaN in float
//! columns) replaced by one caller-supplied JSON value. The input table is
//! never modified; a filled copy is returned with a per-column report.

mod fill;

use crate::error::Result;
use crate::types::{ColumnFillReport, FillStatus, FillValues, FilledTable};
use crate::utils::missing_mask;
use fill::FillPlan;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Fills missing values with per-column constants.
pub struct NullFiller;

impl NullFiller {
    /// Fill `values` into a copy of `df`.
    ///
    /// Columns absent from the table are reported as
    /// [`FillStatus::ColumnMissing`]. A fill value that cannot be stored
    /// leaves its column unchanged and is reported as
    /// [`FillStatus::ConversionFailed`]. Columns not named in `values` are
    /// untouched.
    pub fn fill_nulls(df: &DataFrame, values: &FillValues) -> Result<FilledTable> {
        let mut table = df.clone();
        let mut report = Vec::with_capacity(values.len());

        for (column, value) in values {
            let Ok(col) = df.column(column) else {
                debug!("Fill requested for missing column '{}'", column);
                report.push(ColumnFillReport {
                    column: column.clone(),
                    status: FillStatus::ColumnMissing,
                    filled: 0,
                    message: None,
                });
                continue;
            };
            let series = col.as_materialized_series();

            match Self::fill_column(series, value) {
                Ok(Some((filled_series, filled))) => {
                    table.replace(column, filled_series)?;
                    report.push(ColumnFillReport {
                        column: column.clone(),
                        status: FillStatus::Filled,
                        filled,
                        message: None,
                    });
                }
                Ok(None) => {
                    report.push(ColumnFillReport {
                        column: column.clone(),
                        status: FillStatus::Filled,
                        filled: 0,
                        message: None,
                    });
                }
                Err(message) => {
                    warn!("Could not fill '{}': {}", column, message);
                    report.push(ColumnFillReport {
                        column: column.clone(),
                        status: FillStatus::ConversionFailed,
                        filled: 0,
                        message: Some(message),
                    });
                }
            }
        }

        info!(
            "Filled {} of {} requested columns",
            report.iter().filter(|r| r.status == FillStatus::Filled).count(),
            report.len()
        );

        Ok(FilledTable { table, report })
    }

    /// The filled column and the number of replaced cells, or `None` when
    /// nothing is missing.
    fn fill_column(
        series: &Series,
        value: &serde_json::Value,
    ) -> std::result::Result<Option<(Series, usize)>, String> {
        let plan = FillPlan::for_column(series.dtype(), value)
            .ok_or_else(|| format!("unsupported fill value {}", value))?;

        let missing = missing_mask(series).map_err(|e| e.to_string())?;
        let filled = missing.iter().filter(|&&m| m).count();
        if filled == 0 {
            return Ok(None);
        }

        let new_series = plan.apply(series, &missing).map_err(|e| e.to_string())?;
        Ok(Some((new_series, filled)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fill_values(entries: &[(&str, serde_json::Value)]) -> FillValues {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn sample() -> DataFrame {
        df![
            "age" => [Some(30i64), None, Some(40)],
            "score" => [Some(1.5), Some(f64::NAN), None],
            "city" => [Some("Oslo"), None, Some("Rome")],
            "untouched" => [None::<f64>, Some(2.0), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_fills_only_requested_columns() {
        let df = sample();
        let values = fill_values(&[("age", json!(0)), ("score", json!(0.5)), ("city", json!("?"))]);

        let result = NullFiller::fill_nulls(&df, &values).unwrap();
        let table = &result.table;

        assert_eq!(table.column("age").unwrap().dtype(), &DataType::Int64);
        assert_eq!(table.column("age").unwrap().null_count(), 0);
        assert_eq!(table.column("score").unwrap().get(1).unwrap(), AnyValue::Float64(0.5));
        assert_eq!(table.column("score").unwrap().get(2).unwrap(), AnyValue::Float64(0.5));
        assert_eq!(table.column("city").unwrap().get(1).unwrap(), AnyValue::String("?"));
        let untouched = table.column("untouched").unwrap().as_materialized_series();
        assert!(untouched.equals_missing(df.column("untouched").unwrap().as_materialized_series()));

        // original is unchanged
        assert_eq!(df.column("age").unwrap().null_count(), 1);

        let filled: Vec<usize> = result.report.iter().map(|r| r.filled).collect();
        assert_eq!(filled, vec![1, 2, 1]);
    }

    #[test]
    fn test_float_into_int_column_widens() {
        let df = sample();
        let result = NullFiller::fill_nulls(&df, &fill_values(&[("age", json!(2.5))])).unwrap();

        let age = result.table.column("age").unwrap();
        assert_eq!(age.dtype(), &DataType::Float64);
        assert_eq!(age.get(1).unwrap(), AnyValue::Float64(2.5));
    }

    #[test]
    fn test_string_into_numeric_column_stringifies() {
        let df = sample();
        let result =
            NullFiller::fill_nulls(&df, &fill_values(&[("age", json!("unknown"))])).unwrap();

        let age = result.table.column("age").unwrap();
        assert_eq!(age.dtype(), &DataType::String);
        assert_eq!(age.get(0).unwrap(), AnyValue::String("30"));
        assert_eq!(age.get(1).unwrap(), AnyValue::String("unknown"));
    }

    #[test]
    fn test_missing_column_and_bad_value_are_reported() {
        let df = sample();
        let values = fill_values(&[("nope", json!(1)), ("age", json!([1, 2]))]);

        let result = NullFiller::fill_nulls(&df, &values).unwrap();

        assert_eq!(result.report[0].status, FillStatus::ColumnMissing);
        assert_eq!(result.report[1].status, FillStatus::ConversionFailed);
        assert_eq!(result.failed_columns(), vec!["age"]);
        assert_eq!(result.table.column("age").unwrap().null_count(), 1);
    }
}
