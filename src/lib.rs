//! # uplift-engine: A/B Experiment Analysis over Arrow Tables
//!
//! **Version**: 0.1.0
//!
//! uplift-engine turns a table of per-user trial records into the numbers an
//! experiment dashboard shows: per-arm conversion rates, absolute lift, a
//! two-proportion z-test on the lift, and conversion broken down by segment.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Fail fast; every data-quality problem is a named [`Error`]
//! - **Poka-Yoke**: Coerce every cell first, then report the full defect set
//! - **Genchi Genbutsu**: Statistics follow the pooled two-proportion z-test exactly
//! - **Muda elimination**: One pass per stage over an immutable Arrow snapshot
//!
//! ## Pipeline
//!
//! ```text
//! ExperimentTable ─▶ validate_schema ─▶ normalize ─▶ aggregate ─▶ z-test ─▶ ExperimentReport
//!                                          │
//!                                          └─▶ segment_breakdown
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use uplift_engine::{ExperimentEngine, ExperimentTable};
//!
//! let table = ExperimentTable::load_csv("data/experiment_simulated.csv")?;
//! let analysis = ExperimentEngine::default().analyze(&table)?;
//!
//! println!("{}", analysis.report());
//! println!("{}", analysis.segment_breakdown("new_user")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod aggregate;
pub mod arm;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod report;
pub mod schema;
pub mod segment;
pub mod significance;
pub mod storage;
pub mod uplift;

pub use aggregate::{AggregateSummary, ArmStats, ConversionSummary};
pub use arm::Arm;
pub use config::AnalysisConfig;
pub use engine::{ExperimentAnalysis, ExperimentEngine};
pub use error::{Error, Result};
pub use normalize::{Cell, NormalizedTable};
pub use report::ExperimentReport;
pub use segment::{SegmentBreakdown, SegmentCell};
pub use significance::{SignificanceResult, ZTest};
pub use storage::ExperimentTable;
pub use uplift::{HistogramSource, UpliftDistribution};
