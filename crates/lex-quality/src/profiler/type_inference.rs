//! Primitive type inference for a column sample.

use crate::types::ColumnType;
use crate::utils::{
    is_float_dtype, is_integer_dtype, parse_boolean_string, parse_float_string,
    parse_integer_string,
};
use polars::prelude::*;

/// Infer the type of `series` from its first `sample_rows` values.
///
/// Native integer, float and boolean columns keep their type. String
/// columns are coerced in order int → float → bool and fall back to str.
/// A sample without any non-missing value is float, matching how missing
/// values are represented.
pub(crate) fn infer_column_type(series: &Series, sample_rows: usize) -> PolarsResult<ColumnType> {
    let sample = series.head(Some(sample_rows)).drop_nulls();
    let dtype = series.dtype();

    if is_integer_dtype(dtype) {
        return Ok(ColumnType::Int);
    }
    if is_float_dtype(dtype) {
        return Ok(ColumnType::Float);
    }
    if matches!(dtype, DataType::Boolean) {
        return Ok(ColumnType::Bool);
    }
    if sample.is_empty() && matches!(dtype, DataType::String | DataType::Null) {
        return Ok(ColumnType::Float);
    }
    if !matches!(dtype, DataType::String) {
        return Ok(ColumnType::Str);
    }

    let values: Vec<&str> = sample.str()?.into_iter().flatten().collect();
    Ok(infer_from_strings(&values))
}

fn infer_from_strings(values: &[&str]) -> ColumnType {
    if values.iter().all(|v| parse_integer_string(v).is_some()) {
        ColumnType::Int
    } else if values.iter().all(|v| parse_float_string(v).is_some()) {
        ColumnType::Float
    } else if values.iter().all(|v| parse_boolean_string(v).is_some()) {
        ColumnType::Bool
    } else {
        ColumnType::Str
    }
}
