//! Error types for sheet loading.

use std::path::PathBuf;

use thiserror::Error;

use crate::coerce::CoercionKind;

/// Result type for load operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors that abort a load run
#[derive(Debug, Error)]
pub enum LoadError {
    /// Database config file missing, unreadable, or not a JSON object
    #[error("Failed to read database config {path:?}: {message}")]
    ConfigRead { path: PathBuf, message: String },

    /// Credentials or scopes rejected while reading the sheet
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Worksheet selector of an unsupported type, or one that matches nothing
    #[error("Invalid worksheet selector: {0}")]
    InvalidSelector(String),

    /// Cell value that does not parse as its column's coercion target
    #[error("Failed to parse {value:?} in column '{key}' as {kind}")]
    Parse {
        key: String,
        value: String,
        kind: CoercionKind,
    },

    /// `--coercions` argument that is not a JSON object of strings
    #[error("Invalid coercions: {0}")]
    InvalidCoercions(String),

    /// Sheet source failure other than authentication
    #[error("Failed to read sheet: {0}")]
    Sheet(String),

    /// Warehouse connection or statement failure
    #[error("Warehouse error: {0}")]
    Warehouse(String),

    /// Record that could not be rendered as JSON
    #[error("Failed to encode record as JSON: {0}")]
    Encode(#[source] serde_json::Error),

    /// Writing statements to the output stream failed
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl From<calamine::Error> for LoadError {
    fn from(err: calamine::Error) -> Self {
        LoadError::Sheet(err.to_string())
    }
}
