//! Per-arm rate aggregation
//!
//! Groups the normalized table by arm and computes trial count `n`,
//! conversion count `x` and rate `x / n`. Both arms must be present before
//! any rate is computed; a comparison against an empty arm is undefined.

use crate::arm::Arm;
use crate::normalize::NormalizedTable;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts for one arm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmStats {
    /// Trial count `n`
    pub trials: u64,
    /// Conversion count `x`
    pub conversions: u64,
}

impl ArmStats {
    /// Conversion rate `x / n`, `None` for an empty arm
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> Option<f64> {
        (self.trials > 0).then(|| self.conversions as f64 / self.trials as f64)
    }
}

/// Per-arm counts with both arms guaranteed non-empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSummary {
    control: ArmStats,
    treatment: ArmStats,
}

impl AggregateSummary {
    /// Build from raw counts.
    ///
    /// # Errors
    ///
    /// - [`Error::IncompleteDesign`] if either arm has zero trials
    /// - [`Error::InvalidInput`] if conversions exceed trials
    pub fn from_counts(control: ArmStats, treatment: ArmStats) -> Result<Self> {
        let missing: Vec<Arm> = [(Arm::Control, control), (Arm::Treatment, treatment)]
            .into_iter()
            .filter(|(_, stats)| stats.trials == 0)
            .map(|(arm, _)| arm)
            .collect();
        if !missing.is_empty() {
            return Err(Error::IncompleteDesign { missing });
        }

        for (arm, stats) in [(Arm::Control, control), (Arm::Treatment, treatment)] {
            if stats.conversions > stats.trials {
                return Err(Error::InvalidInput(format!(
                    "{arm} arm has {} conversions out of {} trials",
                    stats.conversions, stats.trials
                )));
            }
        }

        Ok(Self { control, treatment })
    }

    /// Counts for one arm
    #[must_use]
    pub const fn arm(&self, arm: Arm) -> ArmStats {
        match arm {
            Arm::Control => self.control,
            Arm::Treatment => self.treatment,
        }
    }

    /// Conversion rate of one arm
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self, arm: Arm) -> f64 {
        let stats = self.arm(arm);
        // trials > 0 is guaranteed by construction
        stats.conversions as f64 / stats.trials as f64
    }

    /// Absolute lift `rate[treatment] - rate[control]`
    #[must_use]
    pub fn lift(&self) -> f64 {
        self.rate(Arm::Treatment) - self.rate(Arm::Control)
    }

    /// Conversion counts in `(control, treatment)` order
    #[must_use]
    pub const fn counts(&self) -> [u64; 2] {
        [self.control.conversions, self.treatment.conversions]
    }

    /// Trial counts in `(control, treatment)` order
    #[must_use]
    pub const fn nobs(&self) -> [u64; 2] {
        [self.control.trials, self.treatment.trials]
    }

    /// Consumer-facing rate summary
    #[must_use]
    pub fn conversion_summary(&self) -> ConversionSummary {
        let control_rate = self.rate(Arm::Control);
        let treatment_rate = self.rate(Arm::Treatment);
        ConversionSummary {
            control_rate,
            treatment_rate,
            absolute_lift: treatment_rate - control_rate,
        }
    }
}

/// Conversion rates and absolute lift reported to the shell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionSummary {
    /// Control conversion rate in `[0, 1]`
    pub control_rate: f64,
    /// Treatment conversion rate in `[0, 1]`
    pub treatment_rate: f64,
    /// `treatment_rate - control_rate`; positive means treatment wins
    pub absolute_lift: f64,
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Control CR: {:.2}%", self.control_rate * 100.0)?;
        writeln!(f, "Treatment CR: {:.2}%", self.treatment_rate * 100.0)?;
        write!(f, "Absolute Lift: {:.2}%", self.absolute_lift * 100.0)
    }
}

/// Aggregate the normalized table into per-arm counts.
///
/// # Errors
///
/// Returns [`Error::IncompleteDesign`] if either arm has no rows.
pub fn aggregate(table: &NormalizedTable) -> Result<AggregateSummary> {
    let mut stats = [ArmStats::default(); 2];
    for (arm, converted) in table.observations() {
        let slot = &mut stats[arm.index()];
        slot.trials += 1;
        slot.conversions += u64::from(converted);
    }

    let [control, treatment] = stats;
    tracing::debug!(
        control_n = control.trials,
        control_x = control.conversions,
        treatment_n = treatment.trials,
        treatment_x = treatment.conversions,
        "aggregated arms"
    );
    AggregateSummary::from_counts(control, treatment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::storage::ExperimentTable;
    use arrow::array::{ArrayRef, Int64Array, RecordBatch};
    use std::sync::Arc;

    fn normalized(treatment: &[i64], converted: &[i64]) -> NormalizedTable {
        let batch = RecordBatch::try_from_iter(vec![
            (
                "treatment",
                Arc::new(Int64Array::from(treatment.to_vec())) as ArrayRef,
            ),
            (
                "converted",
                Arc::new(Int64Array::from(converted.to_vec())) as ArrayRef,
            ),
        ])
        .unwrap();
        normalize(&ExperimentTable::new(batch)).unwrap()
    }

    #[test]
    fn test_counts_and_rates() {
        let table = normalized(&[0, 0, 0, 0, 1, 1], &[1, 0, 0, 0, 1, 0]);
        let summary = aggregate(&table).unwrap();

        assert_eq!(summary.nobs(), [4, 2]);
        assert_eq!(summary.counts(), [1, 1]);
        assert!((summary.rate(Arm::Control) - 0.25).abs() < f64::EPSILON);
        assert!((summary.rate(Arm::Treatment) - 0.5).abs() < f64::EPSILON);
        assert!((summary.lift() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_negative_lift() {
        let table = normalized(&[0, 0, 1, 1], &[1, 1, 0, 1]);
        let summary = aggregate(&table).unwrap().conversion_summary();
        assert!((summary.absolute_lift + 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_only_treatment_rows() {
        let table = normalized(&[1, 1, 1], &[0, 1, 0]);
        match aggregate(&table) {
            Err(Error::IncompleteDesign { missing }) => assert_eq!(missing, vec![Arm::Control]),
            other => panic!("expected IncompleteDesign, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_table_misses_both_arms() {
        let table = normalized(&[], &[]);
        match aggregate(&table) {
            Err(Error::IncompleteDesign { missing }) => {
                assert_eq!(missing, vec![Arm::Control, Arm::Treatment]);
            }
            other => panic!("expected IncompleteDesign, got {other:?}"),
        }
    }

    #[test]
    fn test_from_counts_rejects_impossible_counts() {
        let result = AggregateSummary::from_counts(
            ArmStats {
                trials: 10,
                conversions: 11,
            },
            ArmStats {
                trials: 10,
                conversions: 1,
            },
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_arm_stats_rate_empty() {
        assert_eq!(ArmStats::default().rate(), None);
    }

    #[test]
    fn test_summary_display() {
        let summary = ConversionSummary {
            control_rate: 0.1,
            treatment_rate: 0.12,
            absolute_lift: 0.02,
        };
        let text = summary.to_string();
        assert!(text.contains("Control CR: 10.00%"));
        assert!(text.contains("Treatment CR: 12.00%"));
        assert!(text.contains("Absolute Lift: 2.00%"));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: rates stay in [0, 1] and lift is their exact difference
            #[test]
            fn prop_rates_bounded_lift_exact(
                control in prop::collection::vec(0i64..2, 1..100),
                treatment in prop::collection::vec(0i64..2, 1..100)
            ) {
                let arms: Vec<i64> = std::iter::repeat(0)
                    .take(control.len())
                    .chain(std::iter::repeat(1).take(treatment.len()))
                    .collect();
                let converted: Vec<i64> = control.iter().chain(&treatment).copied().collect();

                let summary = aggregate(&normalized(&arms, &converted))
                    .unwrap()
                    .conversion_summary();

                prop_assert!((0.0..=1.0).contains(&summary.control_rate));
                prop_assert!((0.0..=1.0).contains(&summary.treatment_rate));
                prop_assert_eq!(
                    summary.absolute_lift,
                    summary.treatment_rate - summary.control_rate
                );
            }
        }
    }
}
