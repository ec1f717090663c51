//! Population aggregation: summary statistics and the loss-exceedance
//! curve over many risks' results.
//!
//! RULES:
//!   - Risks without both an inherent and a residual value (or with a zero
//!     value) are excluded and counted, never zero-filled.
//!   - Percentiles use the same nearest-lower-rank policy as the simulator.
//!   - Sums run over sorted values so input order never changes a result.

use crate::{
    calculation::RiskCalculationResult,
    error::RiskResult,
    simulation::percentile_nearest_rank,
    types::{round2, Money, Period, RiskId, Severity},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURVE_POINTS: usize = 10;

/// The numeric view of one risk the aggregator works on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskExposure {
    pub risk_id:  RiskId,
    pub severity: Severity,
    pub inherent_risk: Option<Money>,
    pub residual_risk: Option<Money>,
}

impl RiskExposure {
    pub fn from_result(risk_id: RiskId, severity: Severity, result: &RiskCalculationResult) -> Self {
        Self {
            risk_id,
            severity,
            inherent_risk: Some(result.inherent_risk),
            residual_risk: Some(result.residual_risk),
        }
    }

    /// A risk that has never been calculated.
    pub fn uncalculated(risk_id: RiskId, severity: Severity) -> Self {
        Self { risk_id, severity, inherent_risk: None, residual_risk: None }
    }

    fn is_calculated(&self) -> bool {
        let usable = |v: Option<Money>| v.is_some_and(|x| x.is_finite() && x != 0.0);
        usable(self.inherent_risk) && usable(self.residual_risk)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExposurePoint {
    pub impact:      Money,
    /// Empirical probability of meeting or exceeding `impact`.
    pub probability: f64,
}

/// Exposure points ordered by increasing probability (decreasing impact).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ExposureCurve(Vec<ExposurePoint>);

impl ExposureCurve {
    /// Build from residual values in any order, keeping at most
    /// `max_points` (all points when `None`).
    pub fn from_values(values: &[Money], max_points: Option<usize>) -> Self {
        let mut descending = values.to_vec();
        descending.sort_by(|a, b| b.total_cmp(a));
        let n = descending.len();
        let keep = max_points.unwrap_or(n).min(n);
        let points = descending
            .into_iter()
            .take(keep)
            .enumerate()
            .map(|(i, impact)| ExposurePoint {
                impact,
                probability: (i + 1) as f64 / n as f64,
            })
            .collect();
        Self(points)
    }

    pub fn points(&self) -> &[ExposurePoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest impact whose exceedance probability is at least
    /// `probability`. `None` beyond the last retained point.
    pub fn impact_at(&self, probability: f64) -> Option<Money> {
        self.0
            .iter()
            .find(|p| p.probability >= probability)
            .map(|p| p.impact)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExposureCurveConfig {
    #[serde(default = "default_curve_points")]
    pub max_points: usize,
    /// Expose every point instead of the first `max_points`.
    #[serde(default)]
    pub full: bool,
}

fn default_curve_points() -> usize {
    DEFAULT_CURVE_POINTS
}

impl Default for ExposureCurveConfig {
    fn default() -> Self {
        Self { max_points: DEFAULT_CURVE_POINTS, full: false }
    }
}

impl ExposureCurveConfig {
    fn limit(&self) -> Option<usize> {
        if self.full { None } else { Some(self.max_points) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopulationSummary {
    pub period: Period,
    pub total_count:    usize,
    pub critical_count: usize,
    pub high_count:     usize,
    pub medium_count:   usize,
    pub low_count:      usize,
    pub total_inherent_risk: Money,
    pub total_residual_risk: Money,
    pub min_exposure:    Money,
    pub max_exposure:    Money,
    pub mean_exposure:   Money,
    pub median_exposure: Money,
    pub p95_exposure:    Money,
    pub p99_exposure:    Money,
    pub exposure_curve: ExposureCurve,
    /// Risks left out because they lacked a usable calculation.
    pub excluded_count: usize,
    /// Risks whose calculation failed before aggregation.
    pub failed_count: usize,
}

impl PopulationSummary {
    fn empty(period: Period) -> Self {
        Self {
            period,
            total_count: 0,
            critical_count: 0,
            high_count: 0,
            medium_count: 0,
            low_count: 0,
            total_inherent_risk: 0.0,
            total_residual_risk: 0.0,
            min_exposure: 0.0,
            max_exposure: 0.0,
            mean_exposure: 0.0,
            median_exposure: 0.0,
            p95_exposure: 0.0,
            p99_exposure: 0.0,
            exposure_curve: ExposureCurve::default(),
            excluded_count: 0,
            failed_count: 0,
        }
    }

    pub fn with_failed_count(mut self, failed: usize) -> Self {
        self.failed_count = failed;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PopulationAggregator {
    curve: ExposureCurveConfig,
}

impl PopulationAggregator {
    pub fn new(curve: ExposureCurveConfig) -> Self {
        Self { curve }
    }

    /// Summarize a population. Pure; `items` is never modified.
    pub fn aggregate(&self, items: &[RiskExposure], period: Period) -> RiskResult<PopulationSummary> {
        period.validate()?;

        let included: Vec<&RiskExposure> = items.iter().filter(|r| r.is_calculated()).collect();
        let mut summary = PopulationSummary::empty(period);
        summary.excluded_count = items.len() - included.len();
        if included.is_empty() {
            return Ok(summary);
        }

        for item in &included {
            match item.severity {
                Severity::Critical => summary.critical_count += 1,
                Severity::High     => summary.high_count += 1,
                Severity::Medium   => summary.medium_count += 1,
                Severity::Low      => summary.low_count += 1,
            }
        }

        let mut residual: Vec<Money> = included.iter().filter_map(|r| r.residual_risk).collect();
        let mut inherent: Vec<Money> = included.iter().filter_map(|r| r.inherent_risk).collect();
        residual.sort_by(f64::total_cmp);
        inherent.sort_by(f64::total_cmp);

        let n = residual.len();
        let total_residual: Money = residual.iter().sum();

        summary.total_count = n;
        summary.total_inherent_risk = inherent.iter().sum();
        summary.total_residual_risk = total_residual;
        summary.min_exposure = residual[0];
        summary.max_exposure = residual[n - 1];
        summary.mean_exposure = round2(total_residual / n as f64);
        summary.median_exposure = percentile_nearest_rank(&residual, 50);
        summary.p95_exposure = percentile_nearest_rank(&residual, 95);
        summary.p99_exposure = percentile_nearest_rank(&residual, 99);
        summary.exposure_curve = ExposureCurve::from_values(&residual, self.curve.limit());

        Ok(summary)
    }
}
