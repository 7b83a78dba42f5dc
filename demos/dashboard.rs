//! Experiment Dashboard: text rendering of one analysis run
//!
//! Loads an experiment table (CSV or Parquet), runs the engine and prints the
//! conversion summary, significance verdict, uplift histogram and a segment
//! breakdown.
//!
//! Usage:
//!   cargo run --example dashboard -- [DATA_FILE] [SEGMENT]
//!
//! Without `DATA_FILE` the dashboard looks for `data/experiment_simulated.csv`
//! and then `../data/experiment_simulated.csv`. `SEGMENT` defaults to the first
//! configured segment. Set `UPLIFT_CONFIG` to a JSON file to override the
//! analysis configuration, and `RUST_LOG` to adjust logging.

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uplift_engine::report::UPLIFT_FALLBACK_WARNING;
use uplift_engine::{AnalysisConfig, Error, ExperimentEngine, ExperimentTable};

const DEFAULT_DATA: [&str; 2] = [
    "data/experiment_simulated.csv",
    "../data/experiment_simulated.csv",
];

fn locate_data(arg: Option<String>) -> anyhow::Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(PathBuf::from(path));
    }
    match DEFAULT_DATA.iter().map(Path::new).find(|p| p.exists()) {
        Some(path) => Ok(path.to_path_buf()),
        None => bail!("Data file not found. Tried: {}", DEFAULT_DATA.join(", ")),
    }
}

fn load(path: &Path) -> anyhow::Result<ExperimentTable> {
    let table = match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => ExperimentTable::load_parquet(path),
        _ => ExperimentTable::load_csv(path),
    };
    table.with_context(|| format!("Failed to load {}", path.display()))
}

fn load_config() -> anyhow::Result<AnalysisConfig> {
    match std::env::var("UPLIFT_CONFIG") {
        Ok(path) => AnalysisConfig::from_json_file(&path)
            .with_context(|| format!("Failed to read config {path}")),
        Err(_) => Ok(AnalysisConfig::default()),
    }
}

fn render_histogram(edges: &[f64], counts: &[u64]) {
    let peak = counts.iter().copied().max().unwrap_or(0).max(1);
    for (bin, count) in counts.iter().enumerate() {
        let bar = usize::try_from(count * 40 / peak).unwrap_or(40);
        println!(
            "  [{:>8.4}, {:>8.4}) {:>7} {}",
            edges[bin],
            edges[bin + 1],
            count,
            "#".repeat(bar)
        );
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("uplift_engine=info".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = locate_data(args.next())?;
    let config = load_config()?;
    let segment = args
        .next()
        .or_else(|| config.segments.first().cloned())
        .context("No segment given and none configured")?;

    let table = load(&path)?;
    let engine = ExperimentEngine::new(config)?;

    println!("=== Experiment Dashboard ===");
    println!("Data: {} ({} rows)\n", path.display(), table.num_rows());

    let analysis = match engine.analyze(&table) {
        Ok(analysis) => analysis,
        Err(e @ (Error::MissingColumns { .. } | Error::NonNumericData { .. })) => {
            bail!("Data validation failed: {e}")
        }
        Err(e) => return Err(e.into()),
    };
    let report = analysis.report();

    println!("{}\n", report.conversion);
    println!("Statistical Significance");
    println!("  z = {:.4}", report.significance.z_statistic);
    println!("  {}\n", report.significance);

    println!("Uplift Distribution");
    if report.uplift.is_fallback() {
        println!("  {UPLIFT_FALLBACK_WARNING}");
    }
    render_histogram(&report.uplift.edges, &report.uplift.counts);
    println!();

    println!("Segment Breakdown");
    match analysis.segment_breakdown(&segment) {
        Ok(breakdown) => println!("{breakdown}"),
        Err(Error::UnknownSegment(name)) => println!("  Column '{name}' not found in data."),
        Err(e) => return Err(e.into()),
    }

    println!("\nGenerated at {}", report.generated_at.to_rfc3339());
    Ok(())
}
