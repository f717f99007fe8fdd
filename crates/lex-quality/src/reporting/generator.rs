use crate::anomaly::AnomalyEngine;
use crate::cancellation::CancellationToken;
use crate::config::{AnomalyConfig, ProfileConfig};
use crate::error::{QualityError, Result};
use crate::profiler::DataProfiler;
use crate::types::{AnomalyRecord, DeclaredSchema, InferredSchema, NullRates, SchemaCheck};
use crate::validation::SchemaValidator;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Every check run against one table, in a single serializable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Number of rows in the table
    pub rows: usize,
    /// Number of columns in the table
    pub columns: usize,
    pub null_rates: NullRates,
    pub inferred_schema: InferredSchema,
    /// Declared-schema results; empty when no schema was declared.
    pub schema_checks: Vec<SchemaCheck>,
    pub anomaly_count: usize,
    pub anomalies: Vec<AnomalyRecord>,
    /// Columns whose null rate exceeds the configured threshold.
    pub high_null_columns: Vec<String>,
}

impl QualityReport {
    /// Declared columns that are absent or hold incompatible values.
    pub fn failed_schema_checks(&self) -> impl Iterator<Item = &SchemaCheck> {
        self.schema_checks.iter().filter(|c| !c.exists || !c.type_ok)
    }
}

/// Runs all checks against a table and assembles a [`QualityReport`].
#[derive(Debug, Clone, Default)]
pub struct ReportGenerator {
    anomaly: AnomalyConfig,
    profile: ProfileConfig,
    cancellation: Option<CancellationToken>,
}

impl ReportGenerator {
    pub fn new(anomaly: AnomalyConfig, profile: ProfileConfig) -> Self {
        Self {
            anomaly,
            profile,
            cancellation: None,
        }
    }

    /// Attach a token that aborts anomaly detection.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Null rates, inferred schema, optional declared-schema validation and
    /// anomaly detection for `df`.
    pub fn run_checks(&self, df: &DataFrame, declared: Option<&DeclaredSchema>) -> Result<QualityReport> {
        self.profile
            .validate()
            .map_err(|e| QualityError::InvalidConfig(e.to_string()))?;

        let null_rates = DataProfiler::null_rates(df);
        let inferred_schema = DataProfiler::infer_schema(df, self.profile.schema_sample_rows);
        let schema_checks = declared
            .map(|schema| SchemaValidator::validate(df, schema))
            .unwrap_or_default();

        let mut engine = AnomalyEngine::new(self.anomaly.clone());
        if let Some(token) = &self.cancellation {
            engine = engine.with_cancellation(token.clone());
        }
        let anomalies = engine.detect_anomalies(df)?;

        let high_null_columns = null_rates
            .iter()
            .filter(|(_, rate)| **rate > self.profile.high_null_threshold)
            .map(|(name, _)| name.clone())
            .collect();

        let report = QualityReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            rows: df.height(),
            columns: df.width(),
            null_rates,
            inferred_schema,
            schema_checks,
            anomaly_count: anomalies.len(),
            anomalies,
            high_null_columns,
        };

        info!(
            "Quality report: {} rows, {} anomalies, {} high-null columns",
            report.rows,
            report.anomaly_count,
            report.high_null_columns.len()
        );
        Ok(report)
    }

    /// Write `report` as pretty JSON to `path`.
    pub fn write_report_to_file(report: &QualityReport, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(report)?)?;

        info!("Report saved: {}", path.display());
        Ok(path.to_path_buf())
    }
}
