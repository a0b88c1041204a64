//! Error types for the tripdata workspace

use thiserror::Error;

/// Result type alias for tripdata operations
pub type Result<T> = std::result::Result<T, TripdataError>;

/// Main error type for tripdata
#[derive(Error, Debug)]
pub enum TripdataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid {field}: {values}. Valid: {valid}")]
    InvalidInput {
        field: &'static str,
        values: String,
        valid: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl TripdataError {
    /// Create an input-validation error naming the offending values
    pub fn invalid_input(
        field: &'static str,
        values: impl Into<String>,
        valid: impl Into<String>,
    ) -> Self {
        Self::InvalidInput {
            field,
            values: values.into(),
            valid: valid.into(),
        }
    }
}
