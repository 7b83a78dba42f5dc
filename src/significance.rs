//! Two-proportion z-test
//!
//! Pooled-proportion test of `H0: rate[control] == rate[treatment]` against a
//! two-sided alternative, using the standard normal approximation:
//!
//! ```text
//! p̂  = (x0 + x1) / (n0 + n1)
//! SE = sqrt(p̂ (1 - p̂) (1/n0 + 1/n1))
//! z  = (x1/n1 - x0/n0) / SE
//! p  = 2 · (1 - Φ(|z|))
//! ```
//!
//! The sign of `z` follows the lift: positive when treatment converts better.

use crate::aggregate::AggregateSummary;
use crate::config::AnalysisConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw test output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZTest {
    /// Test statistic
    pub z_statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Standard normal upper tail `P(Z > z) = 1 - Φ(z)`
#[must_use]
pub fn normal_sf(z: f64) -> f64 {
    0.5 * statrs::function::erf::erfc(z / std::f64::consts::SQRT_2)
}

/// Run the pooled two-proportion z-test.
///
/// `counts` and `nobs` are in fixed `(control, treatment)` order.
///
/// # Errors
///
/// Returns [`Error::UndefinedTest`] when an arm is empty, counts exceed trials,
/// or the pooled standard error is zero (all or none converted).
#[allow(clippy::cast_precision_loss)]
pub fn two_proportion_z_test(counts: [u64; 2], nobs: [u64; 2]) -> Result<ZTest> {
    let [x0, x1] = counts;
    let [n0, n1] = nobs;

    if n0 == 0 || n1 == 0 {
        return Err(Error::UndefinedTest(format!(
            "empty arm (n0 = {n0}, n1 = {n1})"
        )));
    }
    if x0 > n0 || x1 > n1 {
        return Err(Error::UndefinedTest(format!(
            "conversions exceed trials ({x0}/{n0}, {x1}/{n1})"
        )));
    }

    let (x0, x1, n0, n1) = (x0 as f64, x1 as f64, n0 as f64, n1 as f64);
    let pooled = (x0 + x1) / (n0 + n1);
    let variance = pooled * (1.0 - pooled) * (1.0 / n0 + 1.0 / n1);
    let se = variance.sqrt();

    if !se.is_finite() || se <= 0.0 {
        return Err(Error::UndefinedTest(format!(
            "pooled standard error is zero (pooled rate = {pooled})"
        )));
    }

    let z_statistic = (x1 / n1 - x0 / n0) / se;
    let p_value = (2.0 * normal_sf(z_statistic.abs())).min(1.0);

    Ok(ZTest {
        z_statistic,
        p_value,
    })
}

/// Test the aggregated arms.
///
/// # Errors
///
/// See [`two_proportion_z_test`].
pub fn z_test_summary(summary: &AggregateSummary) -> Result<ZTest> {
    let test = two_proportion_z_test(summary.counts(), summary.nobs())?;
    tracing::debug!(z = test.z_statistic, p = test.p_value, "two-proportion z-test");
    Ok(test)
}

/// Significance verdict reported to the shell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    /// Test statistic
    pub z_statistic: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// `p_value < alpha`
    pub is_significant: bool,
}

impl SignificanceResult {
    /// Apply the configured decision threshold
    #[must_use]
    pub fn from_test(test: ZTest, config: &AnalysisConfig) -> Self {
        Self {
            z_statistic: test.z_statistic,
            p_value: test.p_value,
            is_significant: test.p_value < config.alpha,
        }
    }
}

impl fmt::Display for SignificanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.is_significant {
            "Significant"
        } else {
            "Not Significant"
        };
        write!(f, "{label} (p = {:.4})", self.p_value)
    }
}
