//! Reporting configuration
//!
//! The decision threshold and the segment allow-list are explicit values
//! passed into the engine rather than literals in the reporting code.
//!
//! ```rust
//! use uplift_engine::config::AnalysisConfig;
//!
//! # fn main() -> uplift_engine::Result<()> {
//! let config = AnalysisConfig::from_json_str(r#"{ "alpha": 0.01 }"#)?;
//! assert!((config.alpha - 0.01).abs() < f64::EPSILON);
//! assert_eq!(config.segments, vec!["new_user", "high_value_user"]);
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default significance threshold
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Default histogram resolution for the uplift distribution
pub const DEFAULT_UPLIFT_BINS: usize = 30;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Results with `p_value < alpha` are labelled significant
    pub alpha: f64,
    /// Segment columns offered to the user; any present column is still accepted
    pub segments: Vec<String>,
    /// Number of bins for the uplift histogram
    pub uplift_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            segments: vec!["new_user".to_string(), "high_value_user".to_string()],
            uplift_bins: DEFAULT_UPLIFT_BINS,
        }
    }
}

impl AnalysisConfig {
    /// Set the significance threshold
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Replace the segment allow-list
    #[must_use]
    pub fn with_segments<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments = segments.into_iter().map(Into::into).collect();
        self
    }

    /// Set the uplift histogram bin count
    #[must_use]
    pub const fn with_uplift_bins(mut self, bins: usize) -> Self {
        self.uplift_bins = bins;
        self
    }

    /// Parse and validate a JSON configuration; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or its contents are invalid.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `alpha` is not strictly between 0 and 1
    /// or `uplift_bins` is zero.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.uplift_bins == 0 {
            return Err(Error::InvalidConfig(
                "uplift_bins must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
