//! Table profiling: schema inference, null rates and snapshots.
//!
//! Profiling is read-only and never fails on a loaded table. A column that
//! cannot be profiled is logged and left out of the result.

mod type_inference;

use crate::types::{InferredSchema, NullRates, Record};
use crate::utils::{missing_count, row_to_record};
use polars::prelude::*;
use tracing::{debug, warn};

pub(crate) use type_inference::infer_column_type;

/// Default number of leading rows used for schema inference.
pub const DEFAULT_SCHEMA_SAMPLE_ROWS: usize = 100;

/// Default number of rows returned by [`DataProfiler::snapshot`].
pub const DEFAULT_SNAPSHOT_ROWS: usize = 10;

/// Stateless profiler over a loaded table.
pub struct DataProfiler;

impl DataProfiler {
    /// Infer a primitive type for every column from the first `sample_rows`
    /// rows.
    pub fn infer_schema(df: &DataFrame, sample_rows: usize) -> InferredSchema {
        let mut schema = InferredSchema::with_capacity(df.width());

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            match infer_column_type(series, sample_rows) {
                Ok(column_type) => {
                    schema.insert(col.name().to_string(), column_type);
                }
                Err(e) => warn!("Could not infer type of '{}': {}", col.name(), e),
            }
        }

        debug!("Inferred schema for {} columns", schema.len());
        schema
    }

    /// Fraction of missing values per column, in `[0, 1]`.
    pub fn null_rates(df: &DataFrame) -> NullRates {
        let height = df.height();
        let mut rates = NullRates::with_capacity(df.width());

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let missing = match missing_count(series) {
                Ok(count) => count,
                Err(e) => {
                    warn!("Could not count nulls in '{}': {}", col.name(), e);
                    continue;
                }
            };

            let rate = if height > 0 {
                missing as f64 / height as f64
            } else {
                0.0
            };
            rates.insert(col.name().to_string(), rate);
        }

        rates
    }

    /// The first `n` rows as records.
    pub fn snapshot(df: &DataFrame, n: usize) -> Vec<Record> {
        let rows = n.min(df.height());
        let mut records = Vec::with_capacity(rows);

        for idx in 0..rows {
            match row_to_record(df, idx) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Could not read row {}: {}", idx, e);
                    break;
                }
            }
        }

        records
    }
}
