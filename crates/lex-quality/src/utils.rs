//! Shared helpers for dtype classification, literal parsing and value
//! conversion.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use serde_json::Value;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is a floating point type.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || is_float_dtype(dtype)
}

/// Names of the columns whose dtype is numeric, in table order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

// =============================================================================
// Literal Parsing
// =============================================================================

static INTEGER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("Invalid regex: integer"));

static FLOAT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[+-]?((\d+\.?\d*|\.\d+)(e[+-]?\d+)?|inf|infinity|nan)$")
        .expect("Invalid regex: float")
});

/// Parse an integer literal such as `"42"` or `"-7"`.
pub fn parse_integer_string(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    if INTEGER_PATTERN.is_match(trimmed) {
        trimmed.parse::<i64>().ok()
    } else {
        None
    }
}

/// Parse a float literal such as `"1.5"`, `"2"`, `"1e-3"` or `"nan"`.
pub fn parse_float_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if FLOAT_PATTERN.is_match(trimmed) {
        trimmed.parse::<f64>().ok()
    } else {
        None
    }
}

/// Parse a boolean literal (`true` / `false`, any case).
pub fn parse_boolean_string(s: &str) -> Option<bool> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Some(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Markers read as missing when loading CSV files. Empty fields are
/// always missing.
pub const NULL_MARKERS: [&str; 14] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "#N/A",
    "<NA>", "#NA", "-1.#IND",
];

// =============================================================================
// Value Conversion
// =============================================================================

/// Convert a polars cell into a JSON value. Non-finite floats become null.
pub fn any_value_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::Int8(v) => Value::from(*v),
        AnyValue::Int16(v) => Value::from(*v),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::UInt8(v) => Value::from(*v),
        AnyValue::UInt16(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::Float32(v) => float_to_json(*v as f64),
        AnyValue::Float64(v) => float_to_json(*v),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        other => Value::String(format!("{}", other)),
    }
}

fn float_to_json(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Text form of a polars cell, used when a column is stored as strings.
/// Missing cells return `None`.
pub fn any_value_to_text(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        AnyValue::Float32(v) if v.is_nan() => None,
        AnyValue::Float64(v) if v.is_nan() => None,
        other => Some(format!("{}", other)),
    }
}

/// Text form of a scalar JSON value. Null, arrays and objects have none.
pub fn json_scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Read row `idx` of `df` as a [`Record`](crate::types::Record).
pub fn row_to_record(df: &DataFrame, idx: usize) -> PolarsResult<crate::types::Record> {
    let mut record = crate::types::Record::with_capacity(df.width());
    for col in df.get_columns() {
        let value = col.get(idx)?;
        record.insert(col.name().to_string(), any_value_to_json(&value));
    }
    Ok(record)
}

/// Per-cell missing mask: nulls, plus NaN in float columns.
pub fn missing_mask(series: &Series) -> PolarsResult<Vec<bool>> {
    if is_float_dtype(series.dtype()) {
        let float_series = series.cast(&DataType::Float64)?;
        Ok(float_series
            .f64()?
            .into_iter()
            .map(|v| v.is_none_or(f64::is_nan))
            .collect())
    } else {
        Ok(series.is_null().into_iter().map(|v| v.unwrap_or(true)).collect())
    }
}

/// Number of missing cells (see [`missing_mask`]).
pub fn missing_count(series: &Series) -> PolarsResult<usize> {
    if is_float_dtype(series.dtype()) {
        Ok(missing_mask(series)?.into_iter().filter(|&m| m).count())
    } else {
        Ok(series.null_count())
    }
}

/// Cast a series to `Float64` and read it as optional finite values.
///
/// Cells that are null, cannot be converted, or are NaN/±inf come back as
/// `None`.
pub fn finite_f64_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    let ca = float_series.f64()?;
    Ok(ca
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

// =============================================================================
// Tests
// =============================================================================
