//! End-to-end pipeline tests
//!
//! Each test feeds a raw table through the engine and checks the value or the
//! named failure the dashboard would render.

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray};
use std::sync::Arc;
use uplift_engine::normalize::normalize;
use uplift_engine::schema::validate_schema;
use uplift_engine::significance::two_proportion_z_test;
use uplift_engine::{
    AnalysisConfig, Arm, Error, ExperimentEngine, ExperimentTable, SignificanceResult,
};

fn table(columns: Vec<(&str, ArrayRef)>) -> ExperimentTable {
    ExperimentTable::new(RecordBatch::try_from_iter(columns).unwrap())
}

fn strings(values: &[&str]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

fn ints(values: &[i64]) -> ArrayRef {
    Arc::new(Int64Array::from(values.to_vec()))
}

/// `x0` of `n0` control and `x1` of `n1` treatment rows converted
fn experiment(x0: usize, n0: usize, x1: usize, n1: usize) -> ExperimentTable {
    let mut treatment = Vec::with_capacity(n0 + n1);
    let mut converted = Vec::with_capacity(n0 + n1);
    for i in 0..n0 {
        treatment.push("control");
        converted.push(i64::from(i < x0));
    }
    for i in 0..n1 {
        treatment.push("treatment");
        converted.push(i64::from(i < x1));
    }
    table(vec![
        ("treatment", strings(&treatment)),
        ("converted", ints(&converted)),
    ])
}

// =============================================================================
// Schema validation
// =============================================================================

#[test]
fn test_missing_converted_lists_exactly_converted() {
    let t = table(vec![("treatment", ints(&[0, 1]))]);
    match ExperimentEngine::default().analyze(&t) {
        Err(Error::MissingColumns { columns }) => assert_eq!(columns, vec!["converted"]),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[test]
fn test_missing_both_columns_sorted() {
    let t = table(vec![("uplift", Arc::new(Float64Array::from(vec![0.1])) as ArrayRef)]);
    match validate_schema(&t) {
        Err(Error::MissingColumns { columns }) => {
            assert_eq!(columns, vec!["converted", "treatment"]);
        }
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

// =============================================================================
// Normalization
// =============================================================================

#[test]
fn test_string_labels_match_numeric_codes() {
    let converted = ints(&[1, 0, 0, 1]);
    let labelled = table(vec![
        ("treatment", strings(&["control", "Control", "treatment", "Treatment"])),
        ("converted", converted.clone()),
    ]);
    let numeric = table(vec![
        ("treatment", ints(&[0, 0, 1, 1])),
        ("converted", converted),
    ]);

    let engine = ExperimentEngine::default();
    let a = engine.analyze(&labelled).unwrap();
    let b = engine.analyze(&numeric).unwrap();

    assert_eq!(a.table().treatment(), b.table().treatment());
    assert_eq!(a.summary(), b.summary());
    assert_eq!(a.report().conversion, b.report().conversion);
}

#[test]
fn test_unknown_treatment_label_names_treatment() {
    let t = table(vec![
        ("treatment", strings(&["control", "treatment", "unknown", "control"])),
        ("converted", ints(&[1, 0, 1, 0])),
    ]);
    match ExperimentEngine::default().analyze(&t) {
        Err(Error::NonNumericData { columns, rows }) => {
            assert_eq!(columns, vec!["treatment"]);
            assert_eq!(rows, vec![2]);
        }
        other => panic!("expected NonNumericData, got {other:?}"),
    }
}

#[test]
fn test_normalization_idempotent_on_canonical_table() {
    let t = table(vec![
        ("treatment", ints(&[0, 1, 0, 1])),
        ("converted", ints(&[1, 1, 0, 0])),
        ("new_user", strings(&["y", "n", "y", "n"])),
    ]);
    let once = normalize(&t).unwrap();
    let twice = normalize(&once.clone().into_table()).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.batch().column(2), t.batch().column(2));
}

#[test]
fn test_boolean_like_outcome() {
    let t = table(vec![
        ("treatment", ints(&[0, 0, 1, 1])),
        (
            "converted",
            Arc::new(BooleanArray::from(vec![true, false, true, true])) as ArrayRef,
        ),
    ]);
    let report = ExperimentEngine::default().analyze(&t).unwrap().into_report();
    assert!((report.conversion.control_rate - 0.5).abs() < f64::EPSILON);
    assert!((report.conversion.treatment_rate - 1.0).abs() < f64::EPSILON);
}

// =============================================================================
// Aggregation
// =============================================================================

#[test]
fn test_only_treatment_rows_is_incomplete() {
    let t = table(vec![
        ("treatment", ints(&[1, 1, 1])),
        ("converted", ints(&[1, 0, 1])),
    ]);
    match ExperimentEngine::default().analyze(&t) {
        Err(Error::IncompleteDesign { missing }) => assert_eq!(missing, vec![Arm::Control]),
        other => panic!("expected IncompleteDesign, got {other:?}"),
    }
}

#[test]
fn test_lift_is_exact_difference() {
    let analysis = ExperimentEngine::default()
        .analyze(&experiment(100, 1000, 120, 1000))
        .unwrap();
    let conversion = analysis.report().conversion;

    assert!((conversion.control_rate - 0.10).abs() < f64::EPSILON);
    assert!((conversion.treatment_rate - 0.12).abs() < f64::EPSILON);
    assert_eq!(
        conversion.absolute_lift,
        conversion.treatment_rate - conversion.control_rate
    );
}

// =============================================================================
// Significance
// =============================================================================

#[test]
fn test_reference_z_test() {
    let analysis = ExperimentEngine::default()
        .analyze(&experiment(100, 1000, 120, 1000))
        .unwrap();
    let significance = analysis.report().significance;

    assert!((significance.z_statistic - 1.429_300_849_823_231_4).abs() < 1e-9);
    assert!((significance.p_value - 0.152_917_781_863_946_2).abs() < 1e-7);
    assert_eq!(significance.is_significant, significance.p_value < 0.05);
    assert!(!significance.is_significant);
    assert_eq!(significance.to_string(), "Not Significant (p = 0.1529)");
}

#[test]
fn test_z_test_is_deterministic() {
    let a = two_proportion_z_test([100, 120], [1000, 1000]).unwrap();
    let b = two_proportion_z_test([100, 120], [1000, 1000]).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_alternate_alpha() {
    let test = two_proportion_z_test([100, 120], [1000, 1000]).unwrap();
    let loose = SignificanceResult::from_test(test, &AnalysisConfig::default().with_alpha(0.2));
    assert!(loose.is_significant);
}

#[test]
fn test_no_conversions_is_undefined() {
    match ExperimentEngine::default().analyze(&experiment(0, 10, 0, 10)) {
        Err(Error::UndefinedTest(reason)) => assert!(reason.contains("standard error")),
        other => panic!("expected UndefinedTest, got {other:?}"),
    }
}

// =============================================================================
// Segment breakdown
// =============================================================================

#[test]
fn test_segment_rate_and_absent_pairs() {
    let t = table(vec![
        ("segment", strings(&["A", "A", "B"])),
        ("treatment", ints(&[0, 0, 1])),
        ("converted", ints(&[1, 0, 1])),
    ]);
    let normalized = normalize(&t).unwrap();
    let breakdown = uplift_engine::segment::segment_breakdown(&normalized, "segment").unwrap();

    assert_eq!(breakdown.rate("A", Arm::Control), Some(0.5));
    assert_eq!(breakdown.rate("A", Arm::Treatment), None);
    assert_eq!(breakdown.rate("B", Arm::Control), None);
}

#[test]
fn test_unknown_segment_leaves_report_intact() {
    let mut treatment = Vec::new();
    let mut converted = Vec::new();
    let mut new_user = Vec::new();
    for i in 0..40_i64 {
        treatment.push(i % 2);
        converted.push(i64::from(i % 3 == 0));
        new_user.push(if i % 4 < 2 { "new" } else { "returning" });
    }
    let t = table(vec![
        ("treatment", ints(&treatment)),
        ("converted", ints(&converted)),
        ("new_user", strings(&new_user)),
    ]);

    let analysis = ExperimentEngine::default().analyze(&t).unwrap();
    let conversion = analysis.report().conversion;
    let significance = analysis.report().significance;

    assert!(matches!(
        analysis.segment_breakdown("high_value_user"),
        Err(Error::UnknownSegment(_))
    ));
    assert_eq!(analysis.report().conversion, conversion);
    assert_eq!(analysis.report().significance, significance);

    let breakdown = analysis.segment_breakdown("new_user").unwrap();
    assert_eq!(breakdown.segments().collect::<Vec<_>>(), vec!["new", "returning"]);
}
