//! Explainable anomaly detection.
//!
//! The engine runs four stages on a table:
//!
//! 1. **Select** numeric feature columns (or the configured ones).
//! 2. **Filter** rows into a [`FeatureMatrix`], keeping the mapping back to
//!    the original row positions. With `impute_missing` set, missing values
//!    are replaced by the column mean and no row is dropped.
//! 3. **Fit and score** an [`IsolationForest`] on that matrix.
//! 4. **Explain** every anomalous row by listing the columns that lie more
//!    than `deviation_threshold` standard deviations from the column mean.
//!
//! Degenerate inputs (no numeric columns, no complete rows) produce an empty
//! result rather than an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_quality::{AnomalyConfig, AnomalyEngine};
//!
//! let engine = AnomalyEngine::new(AnomalyConfig::default());
//! for record in engine.detect_anomalies(&df)? {
//!     println!("row {} score {:.3}: {:?}",
//!         record.row_index, record.anomaly_score, record.problem_columns);
//! }
//! ```

mod explain;
mod feature_matrix;
mod isolation_forest;

pub use explain::{ColumnStats, DeviationExplainer};
pub use feature_matrix::{FeatureMatrix, select_feature_columns};
pub use isolation_forest::IsolationForest;

use crate::cancellation::CancellationToken;
use crate::config::AnomalyConfig;
use crate::error::{QualityError, Result, ResultExt};
use crate::types::{AnomalyRecord, AnomalyScore};
use crate::utils::row_to_record;
use polars::prelude::*;
use tracing::{debug, info};

/// Scores and labels of every row of a feature matrix.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub matrix: FeatureMatrix,
    /// Decision scores, one per matrix row.
    pub scores: Vec<f64>,
    /// Anomaly labels, one per matrix row.
    pub labels: Vec<bool>,
}

impl Evaluation {
    /// Matrix rows labeled anomalous.
    pub fn anomalous_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, anomalous)| **anomalous)
            .map(|(i, _)| i)
    }
}

/// Anomaly detection over a single table. Holds no state between calls; the
/// forest is refit on every invocation.
#[derive(Debug, Clone, Default)]
pub struct AnomalyEngine {
    config: AnomalyConfig,
    cancellation: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(AnomalyEngine: Send, Sync);

impl AnomalyEngine {
    pub fn new(config: AnomalyConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Attach a token checked between trees and before output assembly.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Select, filter, fit and score. Returns `None` when there is nothing to
    /// fit on.
    pub fn evaluate(&self, df: &DataFrame) -> Result<Option<Evaluation>> {
        self.config
            .validate()
            .map_err(|e| QualityError::InvalidConfig(e.to_string()))?;

        let columns = select_feature_columns(df, &self.config)?;
        if columns.is_empty() {
            debug!("No numeric columns; skipping anomaly detection");
            return Ok(None);
        }

        let matrix = if self.config.impute_missing {
            FeatureMatrix::from_table_imputed(df, &columns)
        } else {
            FeatureMatrix::from_table(df, &columns)
        }
        .context("Building feature matrix")?;
        if matrix.is_empty() {
            debug!("No complete numeric rows; skipping anomaly detection");
            return Ok(None);
        }

        let mut forest = IsolationForest::new()
            .with_n_estimators(self.config.n_estimators)
            .with_max_samples(self.config.max_samples)
            .with_contamination(self.config.contamination)
            .with_random_state(self.config.random_state);
        forest.fit(&matrix, self.cancellation.as_ref())?;

        let scores = forest.decision_function(&matrix)?;
        let labels: Vec<bool> = scores.iter().map(|&s| s < 0.0).collect();

        info!(
            "Scored {} rows over {} columns: {} anomalous",
            matrix.n_rows(),
            matrix.n_features(),
            labels.iter().filter(|&&a| a).count()
        );

        Ok(Some(Evaluation {
            matrix,
            scores,
            labels,
        }))
    }

    /// Rows labeled anomalous, joined back to their original values, each
    /// with its score and problem columns. Ordered by row index.
    pub fn detect_anomalies(&self, df: &DataFrame) -> Result<Vec<AnomalyRecord>> {
        let Some(evaluation) = self.evaluate(df)? else {
            return Ok(Vec::new());
        };
        self.check_cancelled()?;

        let explainer =
            DeviationExplainer::fit(&evaluation.matrix, self.config.deviation_threshold);

        evaluation
            .anomalous_rows()
            .map(|i| -> Result<AnomalyRecord> {
                let row_index = evaluation.matrix.original_index(i);
                Ok(AnomalyRecord::new(
                    row_index,
                    row_to_record(df, row_index)?,
                    evaluation.scores[i],
                    explainer.problem_columns(&evaluation.matrix, i),
                ))
            })
            .collect()
    }

    /// `(row_index, score)` for every clean row, independent of the label
    /// threshold.
    pub fn anomaly_scores(&self, df: &DataFrame) -> Result<Vec<AnomalyScore>> {
        let Some(evaluation) = self.evaluate(df)? else {
            return Ok(Vec::new());
        };
        self.check_cancelled()?;

        Ok(evaluation
            .matrix
            .row_index()
            .iter()
            .zip(&evaluation.scores)
            .map(|(&row_index, &score)| AnomalyScore { row_index, score })
            .collect())
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}
