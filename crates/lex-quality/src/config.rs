//! Configuration types for quality checks.
//!
//! Both configurations use the builder pattern and are validated on `build()`.

use serde::{Deserialize, Serialize};

/// How the anomaly threshold is derived from the isolation scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Contamination {
    /// Fixed offset of -0.5 on the raw score: a row is anomalous when its
    /// normalized isolation score exceeds 0.5.
    #[default]
    Auto,
    /// Expected fraction of anomalous rows (0.0, 0.5]. The offset becomes the
    /// matching quantile of the training scores.
    Fraction(f64),
}

/// Configuration for the anomaly engine.
///
/// # Example
///
/// ```rust,ignore
/// use lex_quality::config::{AnomalyConfig, Contamination};
///
/// let config = AnomalyConfig::builder()
///     .n_estimators(200)
///     .contamination(Contamination::Fraction(0.01))
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Number of isolation trees.
    /// Default: 100
    pub n_estimators: usize,

    /// Upper bound on the rows sampled to grow each tree.
    /// Default: 256
    pub max_samples: usize,

    /// Threshold mode for labeling rows.
    /// Default: Auto
    pub contamination: Contamination,

    /// Seed for tree construction.
    /// Default: 42
    pub random_state: u64,

    /// Number of standard deviations a value must exceed to be listed in
    /// `problem_columns`.
    /// Default: 2.0
    pub deviation_threshold: f64,

    /// Explicit feature columns. When None, every integer and float column
    /// is used.
    /// Default: None
    pub columns: Option<Vec<String>>,

    /// Replace missing or non-numeric feature values with the column mean
    /// instead of skipping their rows.
    /// Default: false
    #[serde(default)]
    pub impute_missing: bool,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: Contamination::Auto,
            random_state: 42,
            deviation_threshold: 2.0,
            columns: None,
            impute_missing: false,
        }
    }
}

impl AnomalyConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnomalyConfigBuilder {
        AnomalyConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.n_estimators == 0 {
            return Err(ConfigValidationError::ZeroCount {
                field: "n_estimators".to_string(),
            });
        }

        if self.max_samples == 0 {
            return Err(ConfigValidationError::ZeroCount {
                field: "max_samples".to_string(),
            });
        }

        if let Contamination::Fraction(fraction) = self.contamination
            && !(fraction > 0.0 && fraction <= 0.5)
        {
            return Err(ConfigValidationError::InvalidContamination(fraction));
        }

        if !(self.deviation_threshold.is_finite() && self.deviation_threshold > 0.0) {
            return Err(ConfigValidationError::InvalidDeviationThreshold(
                self.deviation_threshold,
            ));
        }

        if let Some(columns) = &self.columns
            && columns.is_empty()
        {
            return Err(ConfigValidationError::EmptyColumnSelection);
        }

        Ok(())
    }
}

/// Configuration for profiling and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Rows sampled from the top of the table for schema inference.
    /// Default: 100
    pub schema_sample_rows: usize,

    /// Rows returned by a snapshot.
    /// Default: 10
    pub snapshot_rows: usize,

    /// Null rate above which a column is reported as high-null (0.0 - 1.0).
    /// Default: 0.5
    pub high_null_threshold: f64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            schema_sample_rows: crate::profiler::DEFAULT_SCHEMA_SAMPLE_ROWS,
            snapshot_rows: crate::profiler::DEFAULT_SNAPSHOT_ROWS,
            high_null_threshold: 0.5,
        }
    }
}

impl ProfileConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProfileConfigBuilder {
        ProfileConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.schema_sample_rows == 0 {
            return Err(ConfigValidationError::ZeroCount {
                field: "schema_sample_rows".to_string(),
            });
        }

        if self.snapshot_rows == 0 {
            return Err(ConfigValidationError::ZeroCount {
                field: "snapshot_rows".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.high_null_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "high_null_threshold".to_string(),
                value: self.high_null_threshold,
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("'{field}' must be at least 1")]
    ZeroCount { field: String },

    #[error("Invalid contamination: {0} (must be in (0.0, 0.5])")]
    InvalidContamination(f64),

    #[error("Invalid deviation threshold: {0} (must be a positive number)")]
    InvalidDeviationThreshold(f64),

    #[error("Column selection must name at least one column")]
    EmptyColumnSelection,
}

/// Builder for [`AnomalyConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnomalyConfigBuilder {
    n_estimators: Option<usize>,
    max_samples: Option<usize>,
    contamination: Option<Contamination>,
    random_state: Option<u64>,
    deviation_threshold: Option<f64>,
    columns: Option<Vec<String>>,
    impute_missing: bool,
}

impl AnomalyConfigBuilder {
    /// Set the number of isolation trees.
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    /// Set the per-tree subsample size.
    pub fn max_samples(mut self, n: usize) -> Self {
        self.max_samples = Some(n);
        self
    }

    /// Set the contamination mode.
    pub fn contamination(mut self, contamination: Contamination) -> Self {
        self.contamination = Some(contamination);
        self
    }

    /// Set the random seed.
    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Set the standard deviation multiplier for problem columns.
    pub fn deviation_threshold(mut self, threshold: f64) -> Self {
        self.deviation_threshold = Some(threshold);
        self
    }

    /// Restrict detection to the given columns.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Mean-impute missing feature values instead of skipping rows.
    pub fn impute_missing(mut self, impute: bool) -> Self {
        self.impute_missing = impute;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<AnomalyConfig, ConfigValidationError> {
        let defaults = AnomalyConfig::default();
        let config = AnomalyConfig {
            n_estimators: self.n_estimators.unwrap_or(defaults.n_estimators),
            max_samples: self.max_samples.unwrap_or(defaults.max_samples),
            contamination: self.contamination.unwrap_or_default(),
            random_state: self.random_state.unwrap_or(defaults.random_state),
            deviation_threshold: self
                .deviation_threshold
                .unwrap_or(defaults.deviation_threshold),
            columns: self.columns,
            impute_missing: self.impute_missing,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`ProfileConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProfileConfigBuilder {
    schema_sample_rows: Option<usize>,
    snapshot_rows: Option<usize>,
    high_null_threshold: Option<f64>,
}

impl ProfileConfigBuilder {
    /// Set how many leading rows schema inference looks at.
    pub fn schema_sample_rows(mut self, rows: usize) -> Self {
        self.schema_sample_rows = Some(rows);
        self
    }

    /// Set how many rows a snapshot returns.
    pub fn snapshot_rows(mut self, rows: usize) -> Self {
        self.snapshot_rows = Some(rows);
        self
    }

    /// Set the null rate above which a column is reported.
    pub fn high_null_threshold(mut self, threshold: f64) -> Self {
        self.high_null_threshold = Some(threshold);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<ProfileConfig, ConfigValidationError> {
        let defaults = ProfileConfig::default();
        let config = ProfileConfig {
            schema_sample_rows: self
                .schema_sample_rows
                .unwrap_or(defaults.schema_sample_rows),
            snapshot_rows: self.snapshot_rows.unwrap_or(defaults.snapshot_rows),
            high_null_threshold: self
                .high_null_threshold
                .unwrap_or(defaults.high_null_threshold),
        };

        config.validate()?;
        Ok(config)
    }
}
