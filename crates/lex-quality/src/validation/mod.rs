//! Validation of a table against a declared column → type mapping.

mod coercion;

pub use coercion::is_representable;

use crate::types::{ColumnType, DeclaredSchema, SchemaCheck};
use polars::prelude::*;
use tracing::{debug, warn};

/// Checks declared columns for presence and type compatibility.
pub struct SchemaValidator;

impl SchemaValidator {
    /// One [`SchemaCheck`] per declared entry, in declaration order.
    ///
    /// Entries with a blank type name are skipped. A type name outside the
    /// closed [`ColumnType`] set is reported as `type_ok: false`.
    pub fn validate(df: &DataFrame, declared: &DeclaredSchema) -> Vec<SchemaCheck> {
        let mut checks = Vec::with_capacity(declared.len());

        for (column, type_name) in declared {
            if type_name.trim().is_empty() {
                debug!("Skipping '{}': no declared type", column);
                continue;
            }

            let Ok(col) = df.column(column) else {
                checks.push(SchemaCheck {
                    column: column.clone(),
                    exists: false,
                    type_ok: false,
                });
                continue;
            };

            let type_ok = match type_name.parse::<ColumnType>() {
                Ok(target) => match is_representable(col.as_materialized_series(), target) {
                    Ok(ok) => ok,
                    Err(e) => {
                        warn!("Could not check '{}' as {}: {}", column, target, e);
                        false
                    }
                },
                Err(e) => {
                    debug!("{}", e);
                    false
                }
            };

            checks.push(SchemaCheck {
                column: column.clone(),
                exists: true,
                type_ok,
            });
        }

        checks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(entries: &[(&str, &str)]) -> DeclaredSchema {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample() -> DataFrame {
        df![
            "id" => [1i64, 2, 3],
            "price" => ["1.5", "2", "abc"],
            "name" => ["a", "b", "c"],
        ]
        .unwrap()
    }

    #[test]
    fn test_existing_and_missing_columns() {
        let checks = SchemaValidator::validate(
            &sample(),
            &declared(&[("missing", "int"), ("id", "int"), ("price", "float")]),
        );

        assert_eq!(
            checks,
            vec![
                SchemaCheck {
                    column: "missing".into(),
                    exists: false,
                    type_ok: false
                },
                SchemaCheck {
                    column: "id".into(),
                    exists: true,
                    type_ok: true
                },
                SchemaCheck {
                    column: "price".into(),
                    exists: true,
                    type_ok: false
                },
            ]
        );
    }

    #[test]
    fn test_unknown_type_name() {
        let checks = SchemaValidator::validate(&sample(), &declared(&[("id", "__import__")]));
        assert_eq!(checks.len(), 1);
        assert!(checks[0].exists);
        assert!(!checks[0].type_ok);
    }

    #[test]
    fn test_blank_type_is_skipped() {
        let checks = SchemaValidator::validate(&sample(), &declared(&[("id", " "), ("name", "str")]));
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].column, "name");
        assert!(checks[0].type_ok);
    }

    #[test]
    fn test_empty_declaration() {
        assert!(SchemaValidator::validate(&sample(), &DeclaredSchema::new()).is_empty());
    }
}
