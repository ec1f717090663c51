//! Engine integration tests: population runs, failure isolation, snapshots.

use fairisk_core::{
    calculation::CalculationRequest,
    config::EngineConfig,
    efficacy::Control,
    engine::RiskEngine,
    error::RiskError,
    params::{InputOrigin, RawFactor, RawRiskParams},
    types::{Period, Severity},
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn period() -> Period {
    Period::new(2026, 10).unwrap()
}

fn risk(id: &str, cf: f64, pl: f64) -> CalculationRequest {
    CalculationRequest::new(RawRiskParams {
        contact_frequency:     Some(RawFactor::new(cf * 0.5, cf, cf * 2.0)),
        probability_of_action: Some(RawFactor::new(0.2, 0.5, 0.9)),
        threat_capability:     Some(RawFactor::new(3.0, 6.0, 9.0)),
        resistance_strength:   Some(RawFactor::new(2.0, 5.0, 8.0)),
        primary_loss:          Some(RawFactor::new(pl * 0.2, pl, pl * 4.0)),
        ..RawRiskParams::default()
    })
    .with_risk_id(id)
}

fn portfolio() -> Vec<CalculationRequest> {
    vec![
        risk("R-001", 6.0, 750_000.0).with_severity(Severity::Critical),
        risk("R-002", 12.0, 20_000.0).with_severity(Severity::Medium),
        risk("R-003", 1.0, 150_000.0)
            .with_controls(vec![Control::new(7.0, 30.0, 10.0).with_id("edr")]),
        risk("R-004", 3.0, 60_000.0).with_severity(Severity::Low),
    ]
}

#[test]
fn population_run_produces_summary_and_snapshot() {
    let mut engine = RiskEngine::build_test(42).unwrap();
    let report = engine.assess_population(&portfolio(), period()).unwrap();

    assert_eq!(report.assessments.len(), 4);
    assert!(report.failures.is_empty());
    assert_eq!(report.summary.total_count, 4);
    assert_eq!(report.summary.failed_count, 0);

    let residual_total: f64 = report.assessments.iter().map(|a| a.result.residual_risk).sum();
    assert!((report.summary.total_residual_risk - residual_total).abs() < 1e-6);

    assert_eq!(engine.snapshots().len(), 1);
    let latest = engine.latest_snapshot().expect("snapshot recorded");
    assert_eq!(latest.snapshot_id, report.snapshot_id);
    assert_eq!(latest.summary, report.summary);
    assert_eq!(latest.seed, 42);
}

#[test]
fn one_bad_risk_does_not_blank_the_population() {
    init_logging();
    let mut risks = portfolio();
    risks.push(CalculationRequest::new(RawRiskParams::default()).with_risk_id("R-empty"));
    let mut corrupted = risk("R-corrupt", 2.0, 10_000.0).with_origin(InputOrigin::Stored);
    corrupted.params.primary_loss = Some(RawFactor::new(50.0, 10.0, 1.0));
    risks.push(corrupted);

    let mut engine = RiskEngine::build_test(7).unwrap();
    let report = engine.assess_population(&risks, period()).unwrap();

    assert_eq!(report.summary.total_count, 4);
    assert_eq!(report.summary.failed_count, 2);
    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().any(|f| f.risk_id == "R-empty" && f.reason.contains("Missing parameters")));
    assert!(report.failures.iter().any(|f| f.risk_id == "R-corrupt" && f.reason.contains("Invalid distribution")));
}

#[test]
fn fully_rejected_submission_is_a_failure_not_an_exclusion() {
    init_logging();
    let mut garbled = risk("R-garbled", 4.0, 50_000.0);
    garbled.params.contact_frequency = Some(RawFactor::new(9.0, 2.0, 1.0));
    garbled.params.probability_of_action = Some(RawFactor::new(9.0, 2.0, 1.0));
    garbled.params.primary_loss = Some(RawFactor::new(9.0, 2.0, 1.0));
    let mut risks = portfolio();
    risks.push(garbled);

    let mut engine = RiskEngine::build_test(13).unwrap();
    let report = engine.assess_population(&risks, period()).unwrap();

    assert_eq!(report.summary.total_count, 4);
    assert_eq!(report.summary.excluded_count, 0);
    assert_eq!(report.summary.failed_count, 1);
    assert_eq!(report.failures[0].risk_id, "R-garbled");
    assert!(report.failures[0].reason.contains("Missing parameters"));
}

#[test]
fn missing_severity_is_classified_by_bands() {
    let mut engine = RiskEngine::build_test(3).unwrap();
    let report = engine.assess_population(&portfolio(), period()).unwrap();

    let r3 = report.assessments.iter().find(|a| a.risk_id == "R-003").unwrap();
    let expected = engine.config().severity_bands.classify(r3.result.residual_risk);
    assert_eq!(r3.severity, expected);

    let r1 = report.assessments.iter().find(|a| a.risk_id == "R-001").unwrap();
    assert_eq!(r1.severity, Severity::Critical);
}

#[test]
fn risk_result_does_not_depend_on_population_order() {
    let forward = portfolio();
    let mut reversed = portfolio();
    reversed.reverse();

    let mut engine_a = RiskEngine::build_test(11).unwrap();
    let mut engine_b = RiskEngine::build_test(11).unwrap();
    let a = engine_a.assess_population(&forward, period()).unwrap();
    let b = engine_b.assess_population(&reversed, period()).unwrap();

    for assessment in &a.assessments {
        let other = b.assessments.iter().find(|x| x.risk_id == assessment.risk_id).unwrap();
        assert_eq!(assessment.result, other.result, "{} differs by order", assessment.risk_id);
    }
    assert_eq!(a.summary, b.summary);
}

#[test]
fn adhoc_calculation_matches_population_entry() {
    let mut engine = RiskEngine::build_test(5).unwrap();
    let report = engine.assess_population(&portfolio(), period()).unwrap();
    let adhoc = engine.calculate(&risk("R-002", 12.0, 20_000.0)).unwrap();

    let in_population = report.assessments.iter().find(|a| a.risk_id == "R-002").unwrap();
    assert_eq!(adhoc, in_population.result);
}

#[test]
fn snapshots_append_in_creation_order() {
    let mut engine = RiskEngine::build_test(9).unwrap();
    for month in 1..=3 {
        engine
            .assess_population(&portfolio(), Period::new(2026, month).unwrap())
            .unwrap();
    }

    let entries = engine.snapshots().entries();
    assert_eq!(entries.len(), 3);
    for w in entries.windows(2) {
        assert!(w[0].created_at <= w[1].created_at);
        assert_ne!(w[0].snapshot_id, w[1].snapshot_id);
    }
    assert_eq!(entries[2].summary.period.month, 3);
}

#[test]
fn cancellation_fails_the_whole_run_without_a_snapshot() {
    init_logging();
    let mut engine = RiskEngine::build_test(1).unwrap();
    let token = engine.cancellation_token();
    token.cancel();

    let err = engine.assess_population(&portfolio(), period()).unwrap_err();
    assert!(matches!(err, RiskError::Cancelled { .. }), "got {err}");
    assert!(engine.snapshots().is_empty());

    token.reset();
    assert!(engine.assess_population(&portfolio(), period()).is_ok());
}

#[test]
fn empty_population_still_snapshots() {
    let mut engine = RiskEngine::build_test(2).unwrap();
    let report = engine.assess_population(&[], period()).unwrap();
    assert_eq!(report.summary.total_count, 0);
    assert_eq!(report.summary.total_residual_risk, 0.0);
    assert_eq!(engine.snapshots().len(), 1);
}

#[test]
fn invalid_config_is_rejected() {
    let config = EngineConfig { iterations: 0, ..EngineConfig::default_test() };
    assert!(matches!(RiskEngine::new(config), Err(RiskError::InvalidInput(_))));

    let config = EngineConfig { batch_size: 0, ..EngineConfig::default_test() };
    assert!(RiskEngine::new(config).is_err());
}

#[test]
fn config_fields_default_when_omitted() {
    let config: EngineConfig = serde_json::from_str(r#"{ "iterations": 200, "seed": 8 }"#).unwrap();
    assert_eq!(config.iterations, 200);
    assert_eq!(config.seed, Some(8));
    assert_eq!(config.batch_size, EngineConfig::default().batch_size);
    assert_eq!(config.exposure_curve.max_points, 10);
    assert!(config.validate().is_ok());
}
