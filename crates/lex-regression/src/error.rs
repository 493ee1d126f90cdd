//! Error types for regression training.
//!
//! Every failure surfaced by the learner is a [`RegressionError`]. Plan
//! construction problems are reported as [`RegressionError::Configuration`]
//! before any row is read; the scan itself can only fail with missing values
//! (fail-fast mode), stale domains, or cancellation.
//!
//! Errors serialize as `{code, message}` so they can be handed to a frontend
//! or written into a JSON report unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for regression training.
#[derive(Error, Debug)]
pub enum RegressionError {
    /// Training was cancelled through the cancellation token.
    #[error("Training cancelled")]
    Cancelled,

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The column layout cannot be derived from the schema and settings.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A missing cell was encountered while missing values are not tolerated.
    #[error("Missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    /// A cell disagrees with the precomputed column metadata.
    #[error("Data integrity violation in column '{column}' at row {row}: {reason}")]
    DataIntegrity {
        column: String,
        row: usize,
        reason: String,
    },

    /// The solver could not produce a model.
    #[error("Solver failed: {0}")]
    Solver(String),

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
        source: Box<RegressionError>,
    },
}

impl RegressionError {
    /// Shorthand for a [`RegressionError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        RegressionError::Configuration(message.into())
    }

    /// Shorthand for a [`RegressionError::DataIntegrity`].
    pub fn data_integrity(column: impl Into<String>, row: usize, reason: impl Into<String>) -> Self {
        RegressionError::DataIntegrity {
            column: column.into(),
            row,
            reason: reason.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RegressionError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::MissingValue { .. } => "MISSING_VALUE",
            Self::DataIntegrity { .. } => "DATA_INTEGRITY",
            Self::Solver(_) => "SOLVER_ERROR",
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

    /// Check if this error is recoverable by the caller (retrying with
    /// different settings or simply starting again).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Cancelled | Self::Configuration(_) | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl From<ConfigValidationError> for RegressionError {
    fn from(err: ConfigValidationError) -> Self {
        RegressionError::Configuration(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for RegressionError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("RegressionError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for regression operations.
pub type Result<T> = std::result::Result<T, RegressionError>;

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
        self.map_err(|e| RegressionError::Polars(e).with_context(context))
    }
}
