//! Error types for eewmon.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in eewmon operations.
#[derive(Error, Debug)]
pub enum EewmonError {
    /// Travel-time table could not be read
    #[error("travel-time table unavailable: {0}")]
    TableUnavailable(#[from] std::io::Error),

    /// Travel-time table line did not parse
    #[error("invalid travel-time table row at line {line}: {message}")]
    TableParse { line: usize, message: String },

    /// JSON parsing failed
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Report is missing data required for the requested derivation
    #[error("malformed report: {0}")]
    MalformedReport(String),
}
