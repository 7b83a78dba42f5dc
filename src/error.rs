//! Error types for uplift-engine
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)
//!
//! Every data-quality problem is its own variant so the presentation shell can
//! render a specific message and stop the page for that run.

use crate::arm::Arm;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// uplift-engine error types
#[derive(Error, Debug)]
pub enum Error {
    /// Required column(s) absent from the input table
    #[error("Missing required columns: {columns:?}")]
    MissingColumns {
        /// Absent required column names, sorted
        columns: Vec<String>,
    },

    /// `treatment`/`converted` contain values that could not be coerced to numbers
    #[error(
        "Columns {columns:?} must be numeric (or coercible to numeric): {} unconvertible row(s)",
        .rows.len()
    )]
    NonNumericData {
        /// Offending column names (`treatment` before `converted`)
        columns: Vec<String>,
        /// Sorted row indices holding at least one unconvertible cell
        rows: Vec<usize>,
    },

    /// Coerced values fall outside the canonical `{0, 1}` encoding
    #[error("Columns {columns:?} must only contain 0 or 1 after normalization")]
    NonBinaryData {
        /// Offending column names
        columns: Vec<String>,
    },

    /// One or both arms have zero observations
    #[error("Data must include both treatment groups: 0 (control) and 1 (treatment). Missing: {missing:?}")]
    IncompleteDesign {
        /// Arms with no rows
        missing: Vec<Arm>,
    },

    /// Pooled standard error is zero or undefined
    #[error("Significance test undefined: {0}")]
    UndefinedTest(String),

    /// Requested segment column is not in the table
    #[error("Unknown segment column: {0}")]
    UnknownSegment(String),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller passed an unusable argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage error (CSV/Parquet/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// JSON (configuration) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
