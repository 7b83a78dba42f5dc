//! Schema validation
//!
//! First stage of the pipeline: a table without the required columns is a
//! fatal input error for the run, reported before any value is touched.

use crate::arm::{CONVERTED_COLUMN, TREATMENT_COLUMN};
use crate::storage::ExperimentTable;
use crate::{Error, Result};

/// Columns every experiment table must carry
pub const REQUIRED_COLUMNS: [&str; 2] = [TREATMENT_COLUMN, CONVERTED_COLUMN];

/// Check that the required columns are present.
///
/// # Errors
///
/// Returns [`Error::MissingColumns`] listing every absent required column,
/// sorted by name.
pub fn validate_schema(table: &ExperimentTable) -> Result<&ExperimentTable> {
    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !table.has_column(name))
        .map(ToString::to_string)
        .collect();

    if missing.is_empty() {
        return Ok(table);
    }

    missing.sort();
    tracing::debug!(?missing, "schema validation failed");
    Err(Error::MissingColumns { columns: missing })
}
