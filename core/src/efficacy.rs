//! Control efficacy model (FAIR-CAM operational efficacy).
//!
//! A control's nominal effectiveness decays with the time it has gone
//! unverified:
//!
//!   reliability = (1 - VF/365) ^ VD
//!   efficacy    = nominal * reliability
//!
//! Individual efficacies are combined into one multiplier that the
//! simulator applies at the point chosen by `EfficacyPolicy`.

use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

pub const DAYS_PER_YEAR: f64 = 365.0;
pub const MAX_EFFECTIVENESS: f64 = 10.0;

/// A mitigating control with FAIR-CAM timing attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    #[serde(default)]
    pub control_id: Option<String>,
    /// Nominal effectiveness on a 0–10 scale.
    pub nominal_effectiveness: f64,
    #[serde(default)]
    pub verification_frequency_days: f64,
    #[serde(default, alias = "verificationDurationDays")]
    pub days_since_verification: f64,
}

impl Control {
    pub fn new(nominal_effectiveness: f64, verification_frequency_days: f64, days_since_verification: f64) -> Self {
        Self {
            control_id: None,
            nominal_effectiveness,
            verification_frequency_days,
            days_since_verification,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.control_id = Some(id.into());
        self
    }

    pub fn operational_efficacy(&self) -> RiskResult<f64> {
        operational_efficacy(
            self.nominal_effectiveness,
            self.verification_frequency_days,
            self.days_since_verification,
        )
    }

    fn label(&self, index: usize) -> String {
        self.control_id
            .clone()
            .unwrap_or_else(|| format!("control[{index}]"))
    }
}

/// Decayed effectiveness of a control.
pub fn operational_efficacy(
    nominal_effectiveness: f64,
    verification_frequency_days: f64,
    vulnerability_duration_days: f64,
) -> RiskResult<f64> {
    if !nominal_effectiveness.is_finite()
        || !(0.0..=MAX_EFFECTIVENESS).contains(&nominal_effectiveness)
    {
        return Err(RiskError::InvalidControlTiming {
            reason: format!("nominal effectiveness must be within 0..=10, got {nominal_effectiveness}"),
        });
    }
    if !verification_frequency_days.is_finite()
        || !(0.0..DAYS_PER_YEAR).contains(&verification_frequency_days)
    {
        return Err(RiskError::InvalidControlTiming {
            reason: format!(
                "verification frequency must be within [0, 365) days, got {verification_frequency_days}"
            ),
        });
    }
    if !vulnerability_duration_days.is_finite() || vulnerability_duration_days < 0.0 {
        return Err(RiskError::InvalidControlTiming {
            reason: format!(
                "days since verification must be >= 0, got {vulnerability_duration_days}"
            ),
        });
    }

    let reliability = (1.0 - verification_frequency_days / DAYS_PER_YEAR)
        .powf(vulnerability_duration_days);
    Ok(nominal_effectiveness * reliability)
}

/// Where the combined control multiplier enters a Monte Carlo trial.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EfficacyPolicy {
    /// Controls are ignored inside the trial loop.
    Disabled,
    /// Multiply loss event frequency: controls prevent loss events.
    #[default]
    ScaleLossEventFrequency,
    /// Multiply total loss magnitude: controls limit the damage.
    ScaleLossMagnitude,
    /// Multiply each trial's final annual loss.
    ScaleTrialLoss,
}

/// The combined effect of a risk's controls, resolved once per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEffect {
    pub policy:     EfficacyPolicy,
    /// Factor in [0, 1] applied at the policy's integration point.
    pub multiplier: f64,
}

impl ControlEffect {
    pub fn none() -> Self {
        Self { policy: EfficacyPolicy::Disabled, multiplier: 1.0 }
    }

    pub fn lef_factor(&self) -> f64 {
        self.factor_for(EfficacyPolicy::ScaleLossEventFrequency)
    }

    pub fn magnitude_factor(&self) -> f64 {
        self.factor_for(EfficacyPolicy::ScaleLossMagnitude)
    }

    pub fn trial_loss_factor(&self) -> f64 {
        self.factor_for(EfficacyPolicy::ScaleTrialLoss)
    }

    fn factor_for(&self, point: EfficacyPolicy) -> f64 {
        if self.policy == point { self.multiplier } else { 1.0 }
    }
}

impl Default for ControlEffect {
    fn default() -> Self {
        Self::none()
    }
}

/// Outcome of assessing a risk's controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlAssessment {
    pub effect:   ControlEffect,
    /// Combined fractional reduction, `1 - Π(1 - e_i/10)`.
    pub reduction: f64,
    pub applied:  usize,
    pub warnings: Vec<String>,
}

/// Combine a set of controls into one effect under `policy`.
///
/// A control with invalid timing contributes nothing and produces a
/// warning; it never fails the assessment.
pub fn assess_controls(controls: &[Control], policy: EfficacyPolicy) -> ControlAssessment {
    let mut survival = 1.0;
    let mut applied = 0;
    let mut warnings = Vec::new();

    for (index, control) in controls.iter().enumerate() {
        match control.operational_efficacy() {
            Ok(efficacy) => {
                survival *= 1.0 - efficacy / MAX_EFFECTIVENESS;
                applied += 1;
            }
            Err(e) => {
                let label = control.label(index);
                log::warn!("control {label} excluded: {e}");
                warnings.push(format!("{label} excluded: {e}"));
            }
        }
    }

    let reduction = 1.0 - survival;
    let effect = match policy {
        EfficacyPolicy::Disabled => ControlEffect::none(),
        _ => ControlEffect { policy, multiplier: survival },
    };

    ControlAssessment { effect, reduction, applied, warnings }
}
