//! Risk calculation façade.
//!
//! Turns a risk's raw factor values and controls into:
//!   - inherent risk: deterministic point estimate with susceptibility
//!     pinned to 1.0 (no resistance), no sampling;
//!   - residual risk: Monte Carlo mean under the full parameter set and
//!     the configured control policy.

use crate::{
    efficacy::{assess_controls, Control, EfficacyPolicy},
    error::RiskResult,
    params::{InputOrigin, RawRiskParams, RiskCalculationParams},
    simulation::{CancellationToken, SimulationResult, Simulator},
    types::{round_currency, Money, RiskId, Severity},
};
use serde::{Deserialize, Serialize};

/// One calculation request, ad-hoc or for a stored risk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalculationRequest {
    #[serde(default)]
    pub risk_id: Option<RiskId>,
    /// Caller-supplied severity, used only by population runs.
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub origin: InputOrigin,
    pub params: RawRiskParams,
    #[serde(default)]
    pub controls: Vec<Control>,
}

impl CalculationRequest {
    pub fn new(params: RawRiskParams) -> Self {
        Self { params, ..Self::default() }
    }

    pub fn with_risk_id(mut self, risk_id: impl Into<RiskId>) -> Self {
        self.risk_id = Some(risk_id.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_origin(mut self, origin: InputOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_controls(mut self, controls: Vec<Control>) -> Self {
        self.controls = controls;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskCalculationResult {
    pub inherent_risk: Money,
    pub residual_risk: Money,
    pub simulation: SimulationResult,
    /// Multiplier applied inside each trial (1.0 when no control applies).
    pub control_multiplier: f64,
    /// Combined fractional reduction from valid controls.
    pub control_reduction: f64,
    pub controls_applied: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Closed-form point estimate using each factor's mode:
/// round(CF * POA * 1.0 * (PL + SLEF * SLM)).
pub fn inherent_risk(params: &RiskCalculationParams) -> Money {
    let lef = params.contact_frequency.mode * params.probability_of_action.mode;
    let lm = params.primary_loss.mode
        + params.secondary_loss_event_frequency.mode * params.secondary_loss_magnitude.mode;
    round_currency(lef * lm)
}

#[derive(Debug, Clone, Copy)]
pub struct RiskCalculator {
    simulator: Simulator,
    policy:    EfficacyPolicy,
}

impl RiskCalculator {
    pub fn new(simulator: Simulator, policy: EfficacyPolicy) -> Self {
        Self { simulator, policy }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn policy(&self) -> EfficacyPolicy {
        self.policy
    }

    /// Calculate inherent and residual risk for one request.
    pub fn calculate(
        &self,
        request: &CalculationRequest,
        run_seed: u64,
        cancel: &CancellationToken,
    ) -> RiskResult<RiskCalculationResult> {
        let resolved = RiskCalculationParams::from_raw(&request.params, request.origin)?;
        let assessment = assess_controls(&request.controls, self.policy);

        let simulation = self
            .simulator
            .run(&resolved.params, &assessment.effect, run_seed, cancel)?;

        let mut warnings = resolved.warnings;
        warnings.extend(assessment.warnings);

        Ok(RiskCalculationResult {
            inherent_risk: inherent_risk(&resolved.params),
            residual_risk: simulation.mean,
            simulation,
            control_multiplier: assessment.effect.multiplier,
            control_reduction: assessment.reduction,
            controls_applied: assessment.applied,
            warnings,
        })
    }
}

impl Default for RiskCalculator {
    fn default() -> Self {
        Self::new(Simulator::default(), EfficacyPolicy::default())
    }
}
