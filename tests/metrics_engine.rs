// tests/metrics_engine.rs
//
// Lead-funnel metrics from uploaded CSV text.

use campaign_review_agent::error::MetricsError;
use campaign_review_agent::performance::{MetricsEngine, PerformanceMetrics};

#[test]
fn sums_columns_and_derives_values() {
    let m = MetricsEngine::new()
        .compute("Date,New Leads,SignOffs,Closes\n2024-01-20,10,0,5\n")
        .unwrap();
    assert_eq!(m, PerformanceMetrics::new(10, 0, 5));
    assert_eq!(m.qualified_lead_count(), 10);
    assert_eq!(m.win_rate(), 0.5);
}

#[test]
fn zero_raw_leads_gives_zero_win_rate() {
    let m = MetricsEngine::new()
        .compute("New Leads,SignOffs,Closes\n0,0,0\n")
        .unwrap();
    assert_eq!(m.win_rate(), 0.0);
}

#[test]
fn header_only_upload_is_all_zero() {
    let m = MetricsEngine::new().compute("New Leads,SignOffs,Closes\n").unwrap();
    assert_eq!(m, PerformanceMetrics::default());
}

#[test]
fn missing_closes_is_a_schema_error_naming_it() {
    let err = MetricsEngine::new()
        .compute("New Leads,SignOffs\n10,0\n")
        .unwrap_err();
    match &err {
        MetricsError::Schema { missing } => assert_eq!(missing, &vec!["Closes".to_string()]),
        other => panic!("expected schema error, got {other}"),
    }
    assert!(err.to_string().contains("Closes"));
}

#[test]
fn bad_cells_are_computation_errors() {
    let engine = MetricsEngine::new();
    for csv in [
        "New Leads,SignOffs,Closes\nabc,0,0\n",
        "New Leads,SignOffs,Closes\n-1,0,0\n",
        "New Leads,SignOffs,Closes\n1,0\n",
    ] {
        let err = engine.compute(csv).unwrap_err();
        assert!(matches!(err, MetricsError::Computation(_)), "{csv:?} -> {err}");
        assert!(err.to_string().starts_with("Metric Calculation Failed"));
    }
}

#[test]
fn empty_upload_is_a_computation_error() {
    assert!(matches!(
        MetricsEngine::new().compute("   \n"),
        Err(MetricsError::Computation(_))
    ));
}

#[test]
fn empty_cells_count_as_zero() {
    let m = MetricsEngine::new()
        .compute("New Leads,SignOffs,Closes\n5,,1\n,1,\n")
        .unwrap();
    assert_eq!(m, PerformanceMetrics::new(5, 1, 1));
}

#[test]
fn compute_is_idempotent() {
    let csv = "New Leads,SignOffs,Closes\n7,2,3\n\"3\",1,0\n";
    let engine = MetricsEngine::new();
    assert_eq!(engine.compute(csv).unwrap(), engine.compute(csv).unwrap());
}
