//! Error types for the data quality checks.
//!
//! Errors are serializable as `{code, message}` so a hosting service can
//! forward them to a client unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for quality checks.
#[derive(Error, Debug)]
pub enum QualityError {
    /// The requested table has not been loaded or could not be read.
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Detection was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<QualityError>,
    },
}

impl QualityError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        QualityError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TableNotFound(_) => "TABLE_NOT_FOUND",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Cancelled => "CANCELLED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Check if this error means the input table is missing or unreadable.
    pub fn is_missing_input(&self) -> bool {
        match self {
            Self::TableNotFound(_) | Self::Io(_) => true,
            Self::WithContext { source, .. } => source.is_missing_input(),
            _ => false,
        }
    }
}

impl Serialize for QualityError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("QualityError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for quality operations.
pub type Result<T> = std::result::Result<T, QualityError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| QualityError::Polars(e).with_context(context))
    }
}
