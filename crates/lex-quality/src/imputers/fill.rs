//! Constant fills for a single column.

use crate::utils::{any_value_to_text, is_float_dtype, is_integer_dtype, json_scalar_text};
use polars::prelude::*;
use serde_json::Value;

/// How a fill value is stored in a column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FillPlan {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// The column is stored as strings and missing cells take this text.
    Text(String),
}

impl FillPlan {
    /// Decide how `value` is stored in a column of `dtype`. `None` for fill
    /// values that have no scalar form.
    pub(crate) fn for_column(dtype: &DataType, value: &Value) -> Option<Self> {
        let text = json_scalar_text(value)?;

        let plan = match (dtype, value) {
            (DataType::String, _) => FillPlan::Text(text),
            (DataType::Null, Value::Bool(b)) => FillPlan::Bool(*b),
            (DataType::Null, Value::String(_)) => FillPlan::Text(text),
            (DataType::Boolean, Value::Bool(b)) => FillPlan::Bool(*b),
            (dt, Value::Number(n)) if is_integer_dtype(dt) || matches!(dt, DataType::Null) => {
                match n.as_i64() {
                    Some(i) => FillPlan::Int(i),
                    None => FillPlan::Float(n.as_f64()?),
                }
            }
            (dt, Value::Number(n)) if is_float_dtype(dt) => FillPlan::Float(n.as_f64()?),
            _ => FillPlan::Text(text),
        };
        Some(plan)
    }

    /// Replace the cells flagged in `missing` and return the new column.
    pub(crate) fn apply(&self, series: &Series, missing: &[bool]) -> PolarsResult<Series> {
        let name = series.name().clone();

        let filled = match self {
            FillPlan::Int(fill) => {
                let ints = series.cast(&DataType::Int64)?;
                let values: Vec<Option<i64>> = ints
                    .i64()?
                    .into_iter()
                    .zip(missing)
                    .map(|(v, &m)| if m { Some(*fill) } else { v })
                    .collect();
                Series::new(name, values)
            }
            FillPlan::Float(fill) => {
                let floats = series.cast(&DataType::Float64)?;
                let values: Vec<Option<f64>> = floats
                    .f64()?
                    .into_iter()
                    .zip(missing)
                    .map(|(v, &m)| if m { Some(*fill) } else { v })
                    .collect();
                Series::new(name, values)
            }
            FillPlan::Bool(fill) => {
                let bools = series.cast(&DataType::Boolean)?;
                let values: Vec<Option<bool>> = bools
                    .bool()?
                    .into_iter()
                    .zip(missing)
                    .map(|(v, &m)| if m { Some(*fill) } else { v })
                    .collect();
                Series::new(name, values)
            }
            FillPlan::Text(fill) => {
                let mut values: Vec<Option<String>> = Vec::with_capacity(series.len());
                for (i, &m) in missing.iter().enumerate() {
                    if m {
                        values.push(Some(fill.clone()));
                    } else {
                        values.push(any_value_to_text(&series.get(i)?));
                    }
                }
                Series::new(name, values)
            }
        };

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_keeps_matching_dtype() {
        assert_eq!(
            FillPlan::for_column(&DataType::Int64, &json!(0)),
            Some(FillPlan::Int(0))
        );
        assert_eq!(
            FillPlan::for_column(&DataType::Float64, &json!(1)),
            Some(FillPlan::Float(1.0))
        );
        assert_eq!(
            FillPlan::for_column(&DataType::Boolean, &json!(true)),
            Some(FillPlan::Bool(true))
        );
    }

    #[test]
    fn test_plan_widens_or_stringifies() {
        assert_eq!(
            FillPlan::for_column(&DataType::Int64, &json!(2.5)),
            Some(FillPlan::Float(2.5))
        );
        assert_eq!(
            FillPlan::for_column(&DataType::Boolean, &json!(1)),
            Some(FillPlan::Text("1".to_string()))
        );
        assert_eq!(
            FillPlan::for_column(&DataType::Float64, &json!("unknown")),
            Some(FillPlan::Text("unknown".to_string()))
        );
        assert_eq!(
            FillPlan::for_column(&DataType::String, &json!(3)),
            Some(FillPlan::Text("3".to_string()))
        );
    }

    #[test]
    fn test_plan_rejects_non_scalars() {
        assert_eq!(FillPlan::for_column(&DataType::Int64, &json!(null)), None);
        assert_eq!(FillPlan::for_column(&DataType::Int64, &json!([1, 2])), None);
        assert_eq!(FillPlan::for_column(&DataType::String, &json!({"a": 1})), None);
    }

    #[test]
    fn test_apply_text_keeps_existing_values() {
        let series = Series::new("v".into(), &[Some(1.5), None]);
        let filled = FillPlan::Text("n/a".to_string())
            .apply(&series, &[false, true])
            .unwrap();

        assert_eq!(filled.dtype(), &DataType::String);
        let values: Vec<Option<&str>> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("1.5"), Some("n/a")]);
    }
}
