//! Whether a column's values can be represented as a declared type.

use crate::types::ColumnType;
use crate::utils::{
    is_float_dtype, is_integer_dtype, is_numeric_dtype, parse_boolean_string,
    parse_float_string, parse_integer_string,
};
use polars::prelude::*;

/// True if every non-missing value of `series` is representable as `target`.
///
/// NaN in a float column counts as missing. An all-missing column is
/// representable as any type.
pub fn is_representable(series: &Series, target: ColumnType) -> PolarsResult<bool> {
    let dtype = series.dtype();

    if matches!(target, ColumnType::Str) || matches!(dtype, DataType::Null) {
        return Ok(true);
    }

    match target {
        ColumnType::Int => {
            if is_integer_dtype(dtype) || matches!(dtype, DataType::Boolean) {
                Ok(true)
            } else if is_float_dtype(dtype) {
                all_numeric(series, |v| v.is_finite() && v.fract() == 0.0)
            } else if matches!(dtype, DataType::String) {
                all_strings(series, |s| parse_integer_string(s).is_some())
            } else {
                Ok(false)
            }
        }
        ColumnType::Float => {
            if is_numeric_dtype(dtype) || matches!(dtype, DataType::Boolean) {
                Ok(true)
            } else if matches!(dtype, DataType::String) {
                all_strings(series, |s| parse_float_string(s).is_some())
            } else {
                Ok(false)
            }
        }
        ColumnType::Bool => {
            if matches!(dtype, DataType::Boolean) {
                Ok(true)
            } else if is_numeric_dtype(dtype) {
                all_numeric(series, |v| v == 0.0 || v == 1.0)
            } else if matches!(dtype, DataType::String) {
                all_strings(series, |s| parse_boolean_string(s).is_some())
            } else {
                Ok(false)
            }
        }
        ColumnType::Str => Ok(true),
    }
}

fn all_numeric(series: &Series, predicate: impl Fn(f64) -> bool) -> PolarsResult<bool> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .all(predicate))
}

fn all_strings(series: &Series, predicate: impl Fn(&str) -> bool) -> PolarsResult<bool> {
    Ok(series.str()?.into_iter().flatten().all(predicate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_target() {
        let ints = Series::new("a".into(), &[1i64, 2, 3]);
        let whole_floats = Series::new("b".into(), &[Some(1.0), None, Some(3.0)]);
        let fractional = Series::new("c".into(), &[1.0, 2.5]);
        let strings = Series::new("d".into(), &["1", "-2"]);
        let words = Series::new("e".into(), &["1", "two"]);

        assert!(is_representable(&ints, ColumnType::Int).unwrap());
        assert!(is_representable(&whole_floats, ColumnType::Int).unwrap());
        assert!(!is_representable(&fractional, ColumnType::Int).unwrap());
        assert!(is_representable(&strings, ColumnType::Int).unwrap());
        assert!(!is_representable(&words, ColumnType::Int).unwrap());
    }

    #[test]
    fn test_float_target() {
        let ints = Series::new("a".into(), &[1i64, 2]);
        let strings = Series::new("b".into(), &["1.5", "2"]);
        let words = Series::new("c".into(), &["abc"]);

        assert!(is_representable(&ints, ColumnType::Float).unwrap());
        assert!(is_representable(&strings, ColumnType::Float).unwrap());
        assert!(!is_representable(&words, ColumnType::Float).unwrap());
    }

    #[test]
    fn test_bool_target() {
        let bools = Series::new("a".into(), &[true, false]);
        let flags = Series::new("b".into(), &[0i64, 1, 1]);
        let counts = Series::new("c".into(), &[0i64, 2]);
        let literals = Series::new("d".into(), &["True", "false"]);

        assert!(is_representable(&bools, ColumnType::Bool).unwrap());
        assert!(is_representable(&flags, ColumnType::Bool).unwrap());
        assert!(!is_representable(&counts, ColumnType::Bool).unwrap());
        assert!(is_representable(&literals, ColumnType::Bool).unwrap());
    }

    #[test]
    fn test_str_target_always_ok() {
        let ints = Series::new("a".into(), &[1i64]);
        assert!(is_representable(&ints, ColumnType::Str).unwrap());
    }
}
