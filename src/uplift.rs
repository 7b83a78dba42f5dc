//! Uplift distribution
//!
//! Histogram data for the per-row `uplift` estimate. The engine only bins the
//! values; drawing is left to the shell. When the table has no `uplift`
//! column the histogram falls back to the `converted` outcome with two bins.

use crate::arm::{CONVERTED_COLUMN, UPLIFT_COLUMN};
use crate::normalize::{coerce_column, Cell, NormalizedTable};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Which column the histogram was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramSource {
    /// The `uplift` column
    Uplift,
    /// `uplift` was absent; binned `converted` instead
    ConvertedFallback,
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpliftDistribution {
    /// Column the values came from
    pub source: HistogramSource,
    /// `counts.len() + 1` bin edges, ascending; empty when there were no values
    pub edges: Vec<f64>,
    /// Values per bin
    pub counts: Vec<u64>,
    /// Non-finite or unparseable uplift cells that were skipped
    pub skipped: usize,
}

impl UpliftDistribution {
    /// Bin the `uplift` column, or `converted` when it is absent.
    ///
    /// # Errors
    ///
    /// Returns error only if the `uplift` column cannot be read as an array.
    pub fn from_table(table: &NormalizedTable, bins: usize) -> Result<Self> {
        let (source, column, bins) = match table.column(UPLIFT_COLUMN) {
            Some(column) => (HistogramSource::Uplift, column, bins),
            None => {
                tracing::warn!("column 'uplift' not found, binning 'converted' instead");
                let column = table.column(CONVERTED_COLUMN).ok_or_else(|| {
                    crate::Error::MissingColumns {
                        columns: vec![CONVERTED_COLUMN.to_string()],
                    }
                })?;
                (HistogramSource::ConvertedFallback, column, 2)
            }
        };

        let cells = coerce_column(column, &[])?;
        let values: Vec<f64> = cells
            .iter()
            .filter_map(|cell| match cell {
                Cell::Value(v) if v.is_finite() => Some(*v),
                _ => None,
            })
            .collect();
        let skipped = cells.len() - values.len();

        let (edges, counts) = histogram(&values, bins);
        Ok(Self {
            source,
            edges,
            counts,
            skipped,
        })
    }

    /// Whether the shell should warn that `uplift` was missing
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.source == HistogramSource::ConvertedFallback
    }

    /// Total binned values
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Equal-width histogram over `[min, max]`, last bin closed on the right.
///
/// A constant sample is centred in `[v - 0.5, v + 0.5]`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
#[must_use]
pub fn histogram(values: &[f64], bins: usize) -> (Vec<f64>, Vec<u64>) {
    if values.is_empty() || bins == 0 {
        return (Vec::new(), Vec::new());
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0u64; bins];
    for &v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    (edges, counts)
}
