//! Experiment analysis engine
//!
//! Runs the pipeline over one table snapshot:
//!
//! ```text
//! validate_schema → normalize → aggregate → z-test → ExperimentReport
//!                       │
//!                       └──────────────→ segment_breakdown (on demand)
//! ```
//!
//! Jidoka: the first unmet precondition stops the run and no partial report is
//! returned. Segment reporting runs separately from the normalized table, so an
//! unknown segment never invalidates the report already produced.

use crate::aggregate::{aggregate, AggregateSummary};
use crate::config::AnalysisConfig;
use crate::normalize::{normalize, NormalizedTable};
use crate::report::ExperimentReport;
use crate::segment::{segment_breakdown, SegmentBreakdown};
use crate::significance::{z_test_summary, SignificanceResult};
use crate::storage::ExperimentTable;
use crate::uplift::UpliftDistribution;
use crate::Result;
use chrono::Utc;

/// Stateless analysis engine holding only its configuration
#[derive(Debug, Clone, Default)]
pub struct ExperimentEngine {
    config: AnalysisConfig,
}

impl ExperimentEngine {
    /// Create an engine with a validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// configuration is out of range.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one experiment table.
    ///
    /// # Errors
    ///
    /// Fails fast with the first of `MissingColumns`, `NonNumericData`,
    /// `NonBinaryData`, `IncompleteDesign` or `UndefinedTest`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use arrow::array::{ArrayRef, Int64Array, RecordBatch, StringArray};
    /// use std::sync::Arc;
    /// use uplift_engine::{ExperimentEngine, ExperimentTable};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let batch = RecordBatch::try_from_iter(vec![
    ///     (
    ///         "treatment",
    ///         Arc::new(StringArray::from(vec!["control", "control", "treatment", "treatment"]))
    ///             as ArrayRef,
    ///     ),
    ///     ("converted", Arc::new(Int64Array::from(vec![0, 1, 1, 1])) as ArrayRef),
    /// ])?;
    ///
    /// let engine = ExperimentEngine::default();
    /// let analysis = engine.analyze(&ExperimentTable::new(batch))?;
    ///
    /// let conversion = analysis.report().conversion;
    /// assert!((conversion.absolute_lift - 0.5).abs() < 1e-12);
    /// # Ok(())
    /// # }
    /// ```
    pub fn analyze(&self, table: &ExperimentTable) -> Result<ExperimentAnalysis> {
        let normalized = normalize(table)?;
        let summary = aggregate(&normalized)?;
        let test = z_test_summary(&summary)?;
        let significance = SignificanceResult::from_test(test, &self.config);
        let uplift = UpliftDistribution::from_table(&normalized, self.config.uplift_bins)?;

        tracing::info!(
            rows = normalized.num_rows(),
            lift = summary.lift(),
            p_value = significance.p_value,
            significant = significance.is_significant,
            "experiment analyzed"
        );

        let report = ExperimentReport {
            conversion: summary.conversion_summary(),
            significance,
            uplift,
            rows: normalized.num_rows(),
            generated_at: Utc::now(),
        };

        Ok(ExperimentAnalysis {
            table: normalized,
            summary,
            report,
        })
    }
}

/// Result of one successful engine run
#[derive(Debug, Clone)]
pub struct ExperimentAnalysis {
    table: NormalizedTable,
    summary: AggregateSummary,
    report: ExperimentReport,
}

impl ExperimentAnalysis {
    /// Report for the shell
    #[must_use]
    pub const fn report(&self) -> &ExperimentReport {
        &self.report
    }

    /// Per-arm counts behind the report
    #[must_use]
    pub const fn summary(&self) -> &AggregateSummary {
        &self.summary
    }

    /// Normalized table the report was computed from
    #[must_use]
    pub const fn table(&self) -> &NormalizedTable {
        &self.table
    }

    /// Break conversion down by any column of the table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSegment`](crate::Error::UnknownSegment) if the
    /// column is absent; the report is unaffected.
    pub fn segment_breakdown(&self, column: &str) -> Result<SegmentBreakdown> {
        segment_breakdown(&self.table, column)
    }

    /// Consume the analysis, keeping only the report
    #[must_use]
    pub fn into_report(self) -> ExperimentReport {
        self.report
    }
}
