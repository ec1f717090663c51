//! Population aggregation tests.

use fairisk_core::{
    aggregation::{ExposureCurve, ExposureCurveConfig, PopulationAggregator, RiskExposure},
    error::RiskError,
    types::{Period, Severity},
};

const SEVERITIES: [Severity; 4] = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low];

fn period() -> Period {
    Period::new(2026, 10).unwrap()
}

/// Twenty risks with residual 1_000..=20_000 and inherent twice that.
fn population() -> Vec<RiskExposure> {
    (1..=20)
        .map(|i| RiskExposure {
            risk_id: format!("R-{i:03}"),
            severity: SEVERITIES[i % 4],
            inherent_risk: Some(2_000.0 * i as f64),
            residual_risk: Some(1_000.0 * i as f64),
        })
        .collect()
}

#[test]
fn empty_population_is_all_zero() {
    let s = PopulationAggregator::default().aggregate(&[], period()).unwrap();
    assert_eq!(s.total_count, 0);
    assert_eq!(s.critical_count + s.high_count + s.medium_count + s.low_count, 0);
    assert_eq!(s.total_inherent_risk, 0.0);
    assert_eq!(s.total_residual_risk, 0.0);
    assert_eq!(s.mean_exposure, 0.0);
    assert_eq!(s.p99_exposure, 0.0);
    assert!(s.exposure_curve.is_empty());
    assert_eq!(s.excluded_count, 0);
    assert_eq!(s.failed_count, 0);
}

#[test]
fn summary_statistics_use_nearest_lower_rank() {
    let s = PopulationAggregator::default().aggregate(&population(), period()).unwrap();

    assert_eq!(s.total_count, 20);
    assert_eq!(s.total_inherent_risk, 420_000.0);
    assert_eq!(s.total_residual_risk, 210_000.0);
    assert_eq!(s.min_exposure, 1_000.0);
    assert_eq!(s.max_exposure, 20_000.0);
    assert_eq!(s.mean_exposure, 10_500.0);
    // index floor(0.50 * 20) = 10 → 11_000
    assert_eq!(s.median_exposure, 11_000.0);
    // index floor(0.95 * 20) = 19 → 20_000
    assert_eq!(s.p95_exposure, 20_000.0);
    assert_eq!(s.p99_exposure, 20_000.0);
}

#[test]
fn severity_buckets_are_counted() {
    let s = PopulationAggregator::default().aggregate(&population(), period()).unwrap();
    assert_eq!(s.critical_count, 5);
    assert_eq!(s.high_count, 5);
    assert_eq!(s.medium_count, 5);
    assert_eq!(s.low_count, 5);
}

#[test]
fn uncalculated_and_zero_items_are_excluded_not_zero_filled() {
    let mut items = population();
    items.push(RiskExposure::uncalculated("R-missing".into(), Severity::Critical));
    items.push(RiskExposure {
        risk_id: "R-zero".into(),
        severity: Severity::High,
        inherent_risk: Some(5_000.0),
        residual_risk: Some(0.0),
    });
    items.push(RiskExposure {
        risk_id: "R-half".into(),
        severity: Severity::Low,
        inherent_risk: None,
        residual_risk: Some(7_000.0),
    });

    let s = PopulationAggregator::default().aggregate(&items, period()).unwrap();
    assert_eq!(s.total_count, 20);
    assert_eq!(s.excluded_count, 3);
    assert_eq!(s.critical_count, 5);
    assert_eq!(s.min_exposure, 1_000.0);
    assert_eq!(s.mean_exposure, 10_500.0);
}

#[test]
fn exposure_curve_keeps_first_ten_points() {
    let s = PopulationAggregator::default().aggregate(&population(), period()).unwrap();
    let points = s.exposure_curve.points();

    assert_eq!(points.len(), 10);
    assert_eq!(points[0].impact, 20_000.0);
    assert_eq!(points[0].probability, 0.05);
    assert_eq!(points[9].impact, 11_000.0);
    assert_eq!(points[9].probability, 0.5);
    for w in points.windows(2) {
        assert!(w[0].impact >= w[1].impact);
        assert!(w[0].probability < w[1].probability);
    }
}

#[test]
fn full_curve_on_request() {
    let aggregator = PopulationAggregator::new(ExposureCurveConfig { full: true, ..ExposureCurveConfig::default() });
    let s = aggregator.aggregate(&population(), period()).unwrap();
    let points = s.exposure_curve.points();
    assert_eq!(points.len(), 20);
    assert_eq!(points[19].impact, 1_000.0);
    assert_eq!(points[19].probability, 1.0);
}

#[test]
fn aggregation_is_order_independent() {
    let forward = population();
    let mut reversed = forward.clone();
    reversed.reverse();
    let mut interleaved = forward.clone();
    interleaved.sort_by_key(|r| (r.risk_id.len(), r.risk_id.chars().rev().collect::<String>()));

    let agg = PopulationAggregator::default();
    let a = agg.aggregate(&forward, period()).unwrap();
    let b = agg.aggregate(&reversed, period()).unwrap();
    let c = agg.aggregate(&interleaved, period()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[test]
fn aggregation_does_not_mutate_input() {
    let items = population();
    let before = items.clone();
    PopulationAggregator::default().aggregate(&items, period()).unwrap();
    assert_eq!(items, before);
}

#[test]
fn curve_inverse_is_non_increasing_in_probability() {
    let values: Vec<f64> = [3.0, 90.0, 12.0, 12.0, 45.0, 7.0, 600.0, 1.0].to_vec();
    let curve = ExposureCurve::from_values(&values, None);

    let mut previous = f64::INFINITY;
    for step in 1..=100 {
        let p = step as f64 / 100.0;
        let impact = curve.impact_at(p).expect("full curve covers every probability");
        assert!(impact <= previous, "impact rose to {impact} at p={p}");
        previous = impact;
    }
    assert_eq!(curve.impact_at(0.01), Some(600.0));
    assert_eq!(curve.impact_at(1.0), Some(1.0));
}

#[test]
fn truncated_curve_has_no_impact_beyond_last_point() {
    let curve = ExposureCurve::from_values(&[5.0, 4.0, 3.0, 2.0], Some(2));
    assert_eq!(curve.len(), 2);
    assert_eq!(curve.impact_at(0.5), Some(4.0));
    assert_eq!(curve.impact_at(0.75), None);
}

#[test]
fn invalid_period_is_rejected() {
    let bad = Period { year: 2026, month: 13 };
    let err = PopulationAggregator::default().aggregate(&population(), bad).unwrap_err();
    assert!(matches!(err, RiskError::InvalidInput(_)), "got {err}");
    assert!(Period::new(2026, 0).is_err());
}

#[test]
fn summary_serializes_curve_as_pairs() {
    let s = PopulationAggregator::default().aggregate(&population(), period()).unwrap();
    let json = serde_json::to_value(&s).unwrap();
    assert_eq!(json["exposureCurve"][0]["impact"], 20_000.0);
    assert_eq!(json["exposureCurve"][0]["probability"], 0.05);
    assert_eq!(json["period"]["month"], 10);
    assert_eq!(json["totalCount"], 20);
}
