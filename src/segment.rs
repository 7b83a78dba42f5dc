//! Segment breakdown
//!
//! Conversion rate keyed by `(segment value, arm)`. The table is sparse: a
//! combination with no rows is absent, never reported as `0.0`.

use crate::arm::Arm;
use crate::normalize::NormalizedTable;
use crate::{Error, Result};
use arrow::array::Array;
use arrow::util::display::array_value_to_string;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One `(segment value, arm)` cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentCell {
    /// Mean of `converted` over the cell
    pub rate: f64,
    /// Rows in the cell
    pub trials: u64,
}

/// Conversion rate per segment value, pivoted by arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBreakdown {
    /// Segment column the rows were grouped by
    pub column: String,
    /// segment value → arm → cell; missing entries mean no observations
    pub rows: BTreeMap<String, BTreeMap<Arm, SegmentCell>>,
}

impl SegmentBreakdown {
    /// Rate for one combination, `None` when it has no rows
    #[must_use]
    pub fn rate(&self, segment: &str, arm: Arm) -> Option<f64> {
        self.rows.get(segment)?.get(&arm).map(|cell| cell.rate)
    }

    /// Segment values in ascending order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Whether no row had a non-null segment value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for SegmentBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .keys()
            .map(String::len)
            .chain([self.column.len()])
            .max()
            .unwrap_or(0);

        write!(f, "{:<width$}", self.column)?;
        for arm in Arm::ALL {
            write!(f, " {:>10}", arm.code())?;
        }
        for (segment, cells) in &self.rows {
            write!(f, "\n{segment:<width$}")?;
            for arm in Arm::ALL {
                match cells.get(&arm) {
                    Some(cell) => write!(f, " {:>10.4}", cell.rate)?,
                    None => write!(f, " {:>10}", "-")?,
                }
            }
        }
        Ok(())
    }
}

/// Group by `(segment, treatment)` and average `converted`.
///
/// Rows whose segment value is null are left out of every group.
///
/// # Errors
///
/// Returns [`Error::UnknownSegment`] if `column` is not in the table.
#[allow(clippy::cast_precision_loss)]
pub fn segment_breakdown(table: &NormalizedTable, column: &str) -> Result<SegmentBreakdown> {
    let segment = table
        .column(column)
        .ok_or_else(|| Error::UnknownSegment(column.to_string()))?;

    let mut groups: BTreeMap<String, [(u64, u64); 2]> = BTreeMap::new();
    for (row, (arm, converted)) in table.observations().enumerate() {
        if segment.is_null(row) {
            continue;
        }
        let key = array_value_to_string(segment, row)?;
        let (trials, conversions) = &mut groups.entry(key).or_default()[arm.index()];
        *trials += 1;
        *conversions += u64::from(converted);
    }

    let rows = groups
        .into_iter()
        .map(|(key, counts)| {
            let cells = Arm::ALL
                .into_iter()
                .filter_map(|arm| {
                    let (trials, conversions) = counts[arm.index()];
                    (trials > 0).then(|| {
                        (
                            arm,
                            SegmentCell {
                                rate: conversions as f64 / trials as f64,
                                trials,
                            },
                        )
                    })
                })
                .collect();
            (key, cells)
        })
        .collect::<BTreeMap<_, _>>();

    tracing::debug!(column, segments = rows.len(), "segment breakdown");
    Ok(SegmentBreakdown {
        column: column.to_string(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::storage::ExperimentTable;
    use arrow::array::{ArrayRef, BooleanArray, Int64Array, RecordBatch, StringArray};
    use std::sync::Arc;

    fn normalized(segment: ArrayRef, treatment: &[i64], converted: &[i64]) -> NormalizedTable {
        let batch = RecordBatch::try_from_iter(vec![
            ("segment", segment),
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
    fn test_mean_per_cell() {
        let table = normalized(
            Arc::new(StringArray::from(vec!["A", "A"])),
            &[0, 0],
            &[1, 0],
        );
        let breakdown = segment_breakdown(&table, "segment").unwrap();

        assert_eq!(breakdown.rate("A", Arm::Control), Some(0.5));
        assert_eq!(breakdown.rows["A"][&Arm::Control].trials, 2);
    }

    #[test]
    fn test_missing_combination_is_absent() {
        let table = normalized(
            Arc::new(StringArray::from(vec!["A", "A", "B"])),
            &[0, 0, 1],
            &[1, 0, 0],
        );
        let breakdown = segment_breakdown(&table, "segment").unwrap();

        assert_eq!(breakdown.rate("A", Arm::Treatment), None);
        assert_eq!(breakdown.rate("B", Arm::Control), None);
        assert_eq!(breakdown.rate("B", Arm::Treatment), Some(0.0));
        assert!(!breakdown.rows["A"].contains_key(&Arm::Treatment));
        assert_eq!(breakdown.segments().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_unknown_segment() {
        let table = normalized(Arc::new(StringArray::from(vec!["A"])), &[0], &[1]);
        match segment_breakdown(&table, "high_value_user") {
            Err(Error::UnknownSegment(name)) => assert_eq!(name, "high_value_user"),
            other => panic!("expected UnknownSegment, got {other:?}"),
        }
    }

    #[test]
    fn test_null_segments_excluded() {
        let table = normalized(
            Arc::new(StringArray::from(vec![Some("A"), None, Some("A")])),
            &[0, 0, 1],
            &[1, 1, 0],
        );
        let breakdown = segment_breakdown(&table, "segment").unwrap();

        assert_eq!(breakdown.rows.len(), 1);
        assert_eq!(breakdown.rows["A"][&Arm::Control].trials, 1);
    }

    #[test]
    fn test_boolean_segment_keys() {
        let table = normalized(
            Arc::new(BooleanArray::from(vec![true, false, true, false])),
            &[0, 0, 1, 1],
            &[1, 0, 1, 1],
        );
        let breakdown = segment_breakdown(&table, "segment").unwrap();

        assert_eq!(breakdown.rate("true", Arm::Control), Some(1.0));
        assert_eq!(breakdown.rate("false", Arm::Treatment), Some(1.0));
    }

    #[test]
    fn test_any_column_accepted() {
        let table = normalized(Arc::new(StringArray::from(vec!["A", "B"])), &[0, 1], &[1, 0]);
        let by_outcome = segment_breakdown(&table, "converted").unwrap();
        assert_eq!(by_outcome.rate("1", Arm::Control), Some(1.0));
        assert_eq!(by_outcome.rate("0", Arm::Treatment), Some(0.0));
    }

    #[test]
    fn test_display_marks_absent_cells() {
        let table = normalized(
            Arc::new(StringArray::from(vec!["A", "A", "B"])),
            &[0, 1, 1],
            &[1, 0, 1],
        );
        let text = segment_breakdown(&table, "segment").unwrap().to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with('A'));
        assert!(lines[1].contains("1.0000"));
        assert!(lines[2].contains('-'));
    }
}
