//! Experiment report
//!
//! Everything the presentation shell renders for one run, in one
//! serializable value.

use crate::aggregate::ConversionSummary;
use crate::significance::SignificanceResult;
use crate::uplift::UpliftDistribution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message shown when the histogram fell back to `converted`
pub const UPLIFT_FALLBACK_WARNING: &str =
    "Column 'uplift' not found. Showing conversion distribution instead.";

/// Rates, significance verdict and uplift histogram for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Per-arm conversion rates and absolute lift
    pub conversion: ConversionSummary,
    /// Two-proportion z-test verdict
    pub significance: SignificanceResult,
    /// Histogram data for the uplift chart
    pub uplift: UpliftDistribution,
    /// Rows analyzed
    pub rows: usize,
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
}

impl ExperimentReport {
    /// Serialize as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ExperimentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.conversion)?;
        writeln!(f)?;
        writeln!(f, "Statistical Significance")?;
        writeln!(f, "{}", self.significance)?;
        writeln!(f)?;
        write!(f, "Uplift Distribution: {} values", self.uplift.total())?;
        if self.uplift.is_fallback() {
            write!(f, "\n{UPLIFT_FALLBACK_WARNING}")?;
        }
        Ok(())
    }
}
