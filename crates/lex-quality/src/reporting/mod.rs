//! Combined quality reports.
//!
//! A [`QualityReport`] bundles null rates, the inferred schema, optional
//! declared-schema checks and the anomaly records of one table. It is the
//! output of the `report` CLI command and can be written to a JSON file.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_quality::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::default().run_checks(&df, None)?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ReportGenerator::write_report_to_file(&report, "out/report.json")?;
//! ```

mod generator;

pub use generator::{QualityReport, ReportGenerator};
