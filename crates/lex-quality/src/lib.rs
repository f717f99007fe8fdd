//! Data Quality Checks Library
//!
//! Profiling and explainable anomaly detection for a single CSV table, built
//! on Polars.
//!
//! # Overview
//!
//! - **Anomaly Detection**: Isolation forest over the numeric columns, with
//!   every flagged row explained by the columns that deviate from their mean
//! - **Schema Inference**: Primitive type per column from a leading sample
//! - **Schema Validation**: Declared column types checked against the data
//!   using a closed set of type names
//! - **Null Profiling**: Per-column missing-value rates
//! - **Null Filling**: Per-column constant fills into a copy of the table
//! - **Reports**: All checks bundled into one serializable report
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_quality::{AnomalyConfig, AnomalyEngine, DataProfiler, TableLoader};
//!
//! let df = TableLoader::read_csv("data.csv")?;
//!
//! println!("{:?}", DataProfiler::infer_schema(&df, 100));
//! println!("{:?}", DataProfiler::null_rates(&df));
//!
//! let engine = AnomalyEngine::new(AnomalyConfig::default());
//! for record in engine.detect_anomalies(&df)? {
//!     println!("row {}: {:?}", record.row_index, record.problem_columns);
//! }
//! ```
//!
//! # Table Handles
//!
//! Long-lived hosts keep tables in a [`TableStore`] and address them by
//! [`TableId`] through a [`QualityService`]:
//!
//! ```rust,ignore
//! use lex_quality::{QualityService, TableStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(TableStore::new());
//! store.upload_csv("sales", &bytes)?;
//!
//! let service = QualityService::new(store);
//! let rates = service.null_rates(&"sales".into());
//! let report = service.run_checks(&"sales".into(), None)?;
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use lex_quality::{AnomalyConfig, Contamination};
//!
//! let config = AnomalyConfig::builder()
//!     .n_estimators(200)
//!     .contamination(Contamination::Fraction(0.01))
//!     .deviation_threshold(3.0)
//!     .build()?;
//! ```

pub mod anomaly;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod imputers;
pub mod profiler;
pub mod reporting;
pub mod service;
pub mod table;
pub mod types;
pub mod utils;
pub mod validation;

// Re-exports for convenient access
pub use anomaly::{AnomalyEngine, DeviationExplainer, FeatureMatrix, IsolationForest};
pub use cancellation::CancellationToken;
pub use config::{
    AnomalyConfig, AnomalyConfigBuilder, ConfigValidationError, Contamination, ProfileConfig,
    ProfileConfigBuilder,
};
pub use error::{QualityError, Result as QualityResult, ResultExt};
pub use imputers::NullFiller;
pub use profiler::DataProfiler;
pub use reporting::{QualityReport, ReportGenerator};
pub use service::QualityService;
pub use table::{TableId, TableInfo, TableLoader, TableStore};
pub use types::{
    AnomalyRecord, AnomalyScore, ColumnFillReport, ColumnType, DeclaredSchema, FillStatus,
    FillValues, FilledTable, InferredSchema, NullRates, Record, SchemaCheck,
};
pub use validation::SchemaValidator;
