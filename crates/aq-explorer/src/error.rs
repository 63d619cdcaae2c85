//! Custom error types for the cleaning pipeline and query engine.
//!
//! This module provides the error hierarchy using `thiserror`. Only a few
//! conditions are real errors here: empty filter results, empty aggregation
//! inputs and undefined standard deviations are ordinary data, not failures.
//!
//! Errors are serializable so a presentation layer can display them.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the explorer engine.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// An expected column is missing or has an unusable type.
    #[error("Schema error in column '{column}': {reason}")]
    Schema { column: String, reason: String },

    /// A single value failed type coercion.
    ///
    /// The cleaning pipeline never returns this; it nulls the cell instead.
    #[error("Failed to parse value '{value}' for column '{column}'")]
    Parse { column: String, value: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A query that cannot be answered as requested.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

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
        source: Box<ExplorerError>,
    },
}

impl ExplorerError {
    /// Shorthand for a missing column.
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
            reason: "column not found in dataset".to_string(),
        }
    }

    /// Shorthand for a column whose dtype does not fit its role.
    pub fn wrong_type(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ExplorerError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA_ERROR",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Name of the offending column for schema and parse errors.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::Schema { column, .. } | Self::Parse { column, .. } => Some(column),
            Self::WithContext { source, .. } => source.column(),
            _ => None,
        }
    }

    /// Check if this error is a schema error (possibly wrapped in context).
    pub fn is_schema_error(&self) -> bool {
        self.error_code() == "SCHEMA_ERROR"
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ExplorerError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ExplorerError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for explorer operations.
pub type Result<T> = std::result::Result<T, ExplorerError>;

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
        self.map_err(|e| ExplorerError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ExplorerError::missing_column("CO2").error_code(),
            "SCHEMA_ERROR"
        );
        assert_eq!(
            ExplorerError::InvalidQuery("x".to_string()).error_code(),
            "INVALID_QUERY"
        );
    }

    #[test]
    fn test_missing_column_names_column() {
        let error = ExplorerError::missing_column("AQI");
        assert_eq!(error.column(), Some("AQI"));
        assert!(error.to_string().contains("AQI"));
    }

    #[test]
    fn test_error_serialization() {
        let error = ExplorerError::missing_column("City");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("SCHEMA_ERROR"));
        assert!(json.contains("City"));
    }

    #[test]
    fn test_with_context() {
        let error = ExplorerError::missing_column("Date").with_context("During null audit");
        assert!(error.to_string().contains("During null audit"));
        assert_eq!(error.error_code(), "SCHEMA_ERROR"); // Keeps the inner code
        assert!(error.is_schema_error());
        assert_eq!(error.column(), Some("Date"));
    }
}
