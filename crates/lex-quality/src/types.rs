use indexmap::IndexMap;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One table row as column name → JSON value, in column order.
pub type Record = IndexMap<String, serde_json::Value>;

/// Inferred column types, in column order.
pub type InferredSchema = IndexMap<String, ColumnType>;

/// User-declared column → type name. Names are resolved through
/// [`ColumnType::from_str`] only.
pub type DeclaredSchema = IndexMap<String, String>;

/// Column → fraction of missing values.
pub type NullRates = IndexMap<String, f64>;

/// Column → value used to replace missing entries.
pub type FillValues = IndexMap<String, serde_json::Value>;

/// The closed set of primitive column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Str,
}

impl ColumnType {
    /// Canonical name used in schemas.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
        }
    }

    /// True for `int` and `float`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a declared type name is not one of the supported identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported column type '{0}' (expected one of: int, float, bool, str)")]
pub struct UnknownColumnType(pub String);

impl FromStr for ColumnType {
    type Err = UnknownColumnType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Int),
            "float" | "double" => Ok(Self::Float),
            "bool" | "boolean" => Ok(Self::Bool),
            "str" | "string" => Ok(Self::Str),
            _ => Err(UnknownColumnType(s.to_string())),
        }
    }
}

/// Result of checking one declared column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCheck {
    pub column: String,
    pub exists: bool,
    pub type_ok: bool,
}

/// Anomaly score of one clean row. Lower is more anomalous; negative scores
/// are labeled anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub row_index: usize,
    pub score: f64,
}

/// A row flagged by the anomaly engine, joined back to its original values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Position of the row in the input table.
    pub row_index: usize,
    /// All original column values of the row.
    #[serde(flatten)]
    pub fields: Record,
    pub anomaly_score: f64,
    /// Numeric columns more than the configured number of standard
    /// deviations away from their mean. May be empty for rows that are only
    /// anomalous in combination.
    pub problem_columns: Vec<String>,
}

impl AnomalyRecord {
    /// Keys the record itself writes when serialized. Table columns with
    /// these names are dropped from `fields`.
    pub const RESERVED_FIELDS: [&'static str; 3] =
        ["row_index", "anomaly_score", "problem_columns"];

    pub fn new(
        row_index: usize,
        mut fields: Record,
        anomaly_score: f64,
        problem_columns: Vec<String>,
    ) -> Self {
        for key in Self::RESERVED_FIELDS {
            if fields.shift_remove(key).is_some() {
                tracing::debug!("Column '{}' is shadowed by the anomaly record field", key);
            }
        }
        Self {
            row_index,
            fields,
            anomaly_score,
            problem_columns,
        }
    }
}

/// Outcome of filling one requested column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    Filled,
    ColumnMissing,
    ConversionFailed,
}

/// Per-column report produced by the null filler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFillReport {
    pub column: String,
    pub status: FillStatus,
    /// Number of missing cells replaced.
    pub filled: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A filled copy of a table plus what happened to each requested column.
#[derive(Debug, Clone)]
pub struct FilledTable {
    pub table: DataFrame,
    pub report: Vec<ColumnFillReport>,
}

impl FilledTable {
    /// Columns whose fill value could not be stored.
    pub fn failed_columns(&self) -> Vec<&str> {
        self.report
            .iter()
            .filter(|r| r.status == FillStatus::ConversionFailed)
            .map(|r| r.column.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_from_closed_set() {
        assert_eq!("int".parse::<ColumnType>(), Ok(ColumnType::Int));
        assert_eq!(" Float ".parse::<ColumnType>(), Ok(ColumnType::Float));
        assert_eq!("boolean".parse::<ColumnType>(), Ok(ColumnType::Bool));
        assert_eq!("str".parse::<ColumnType>(), Ok(ColumnType::Str));
        assert!("__import__('os')".parse::<ColumnType>().is_err());
        assert!("datetime".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_column_type_serializes_lowercase() {
        let json = serde_json::to_string(&ColumnType::Str).unwrap();
        assert_eq!(json, "\"str\"");
    }

    #[test]
    fn test_anomaly_record_flattens_fields() {
        let mut fields = Record::new();
        fields.insert("id".to_string(), serde_json::json!(3));
        let record = AnomalyRecord {
            row_index: 2,
            fields,
            anomaly_score: -0.2,
            problem_columns: vec!["value".to_string()],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["row_index"], 2);
        assert_eq!(json["problem_columns"][0], "value");
    }

    #[test]
    fn test_anomaly_record_shadows_colliding_columns() {
        let mut fields = Record::new();
        fields.insert("row_index".to_string(), serde_json::json!("r-7"));
        fields.insert("anomaly_score".to_string(), serde_json::json!(99));
        fields.insert("city".to_string(), serde_json::json!("Oslo"));

        let record = AnomalyRecord::new(7, fields, -0.3, vec![]);
        let keys: Vec<&String> = record.fields.keys().collect();
        assert_eq!(keys, vec!["city"]);

        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text.matches("\"row_index\"").count(), 1);
        let parsed: AnomalyRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.row_index, 7);
    }
}
