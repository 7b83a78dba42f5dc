//! Experiment arms and the canonical column names shared by every stage

use serde::{Deserialize, Serialize};
use std::fmt;

/// Column holding the arm assignment
pub const TREATMENT_COLUMN: &str = "treatment";

/// Column holding the binary outcome
pub const CONVERTED_COLUMN: &str = "converted";

/// Optional per-row uplift estimate (presentation only)
pub const UPLIFT_COLUMN: &str = "uplift";

/// One assignment group of the experiment.
///
/// The canonical numeric encoding is `0` for control and `1` for treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    /// Baseline group (`0`)
    Control,
    /// Group exposed to the change (`1`)
    Treatment,
}

impl Arm {
    /// Both arms in fixed `(control, treatment)` order
    pub const ALL: [Self; 2] = [Self::Control, Self::Treatment];

    /// Canonical numeric code
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Control => 0,
            Self::Treatment => 1,
        }
    }

    /// Arm for a canonical code, `None` for anything outside `{0, 1}`
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Control),
            1 => Some(Self::Treatment),
            _ => None,
        }
    }

    /// Position in per-arm arrays
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Control => 0,
            Self::Treatment => 1,
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control => write!(f, "control"),
            Self::Treatment => write!(f, "treatment"),
        }
    }
}
