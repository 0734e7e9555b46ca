//! Error types shared across taxonest crates

use thiserror::Error;

/// Result type alias for taxonest operations
pub type Result<T> = std::result::Result<T, TaxonestError>;

/// Main error type for taxonest
#[derive(Error, Debug)]
pub enum TaxonestError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

impl TaxonestError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an error for an environment or CLI value that failed to parse
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}
