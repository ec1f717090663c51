//! Risk calculation parameters: raw input shapes and the validated set
//! the simulator consumes.

use crate::{
    distribution::{Confidence, UncertainFactor},
    error::{RiskError, RiskResult},
};
use serde::{Deserialize, Serialize};

/// A factor as it arrives from storage or a request payload. Any field
/// may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawFactor {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default, alias = "avg", alias = "likely")]
    pub mode: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
}

impl RawFactor {
    pub fn new(min: f64, mode: f64, max: f64) -> Self {
        Self { min: Some(min), mode: Some(mode), max: Some(max), confidence: None }
    }

    pub fn point(value: f64) -> Self {
        Self::new(value, value, value)
    }

    /// True when no numeric field was supplied.
    pub fn is_absent(&self) -> bool {
        self.min.is_none() && self.mode.is_none() && self.max.is_none()
    }

    fn resolve(&self) -> UncertainFactor {
        UncertainFactor {
            min:  self.min.unwrap_or(0.0),
            mode: self.mode.unwrap_or(0.0),
            max:  self.max.unwrap_or(0.0),
            confidence: self.confidence.unwrap_or_default(),
        }
    }
}

/// The seven FAIR factors as submitted. Absent factors default to zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawRiskParams {
    #[serde(default, alias = "cf")]
    pub contact_frequency: Option<RawFactor>,
    #[serde(default, alias = "poa")]
    pub probability_of_action: Option<RawFactor>,
    #[serde(default, alias = "tcap")]
    pub threat_capability: Option<RawFactor>,
    #[serde(default, alias = "rs")]
    pub resistance_strength: Option<RawFactor>,
    #[serde(default, alias = "pl")]
    pub primary_loss: Option<RawFactor>,
    #[serde(default, alias = "slef")]
    pub secondary_loss_event_frequency: Option<RawFactor>,
    #[serde(default, alias = "slm")]
    pub secondary_loss_magnitude: Option<RawFactor>,
}

/// Where a parameter set came from. Decides whether a malformed factor
/// rejects just that factor or the whole call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputOrigin {
    /// User-editable request payload: malformed factors are dropped.
    #[default]
    Submitted,
    /// Stored values: a malformed factor means corrupted data.
    Stored,
}

/// Validated inputs for one simulation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskCalculationParams {
    pub contact_frequency:              UncertainFactor,
    pub probability_of_action:          UncertainFactor,
    pub threat_capability:              UncertainFactor,
    pub resistance_strength:            UncertainFactor,
    pub primary_loss:                   UncertainFactor,
    #[serde(default)]
    pub secondary_loss_event_frequency: UncertainFactor,
    #[serde(default)]
    pub secondary_loss_magnitude:       UncertainFactor,
}

/// Parameters plus any warnings raised while resolving raw input.
#[derive(Debug, Clone)]
pub struct ResolvedParams {
    pub params:   RiskCalculationParams,
    pub warnings: Vec<String>,
}

impl RiskCalculationParams {
    /// Build from already-valid factors with no secondary loss.
    pub fn primary(
        contact_frequency: UncertainFactor,
        probability_of_action: UncertainFactor,
        threat_capability: UncertainFactor,
        resistance_strength: UncertainFactor,
        primary_loss: UncertainFactor,
    ) -> Self {
        Self {
            contact_frequency,
            probability_of_action,
            threat_capability,
            resistance_strength,
            primary_loss,
            secondary_loss_event_frequency: UncertainFactor::zero(),
            secondary_loss_magnitude: UncertainFactor::zero(),
        }
    }

    pub fn with_secondary(mut self, frequency: UncertainFactor, magnitude: UncertainFactor) -> Self {
        self.secondary_loss_event_frequency = frequency;
        self.secondary_loss_magnitude = magnitude;
        self
    }

    /// Resolve raw input, defaulting missing numbers to zero and missing
    /// confidence to medium.
    ///
    /// A rejected factor counts as absent: if contact frequency, probability
    /// of action and primary loss are all absent or rejected the call fails
    /// with `MissingParameters`.
    pub fn from_raw(raw: &RawRiskParams, origin: InputOrigin) -> RiskResult<ResolvedParams> {
        let signal = [
            ("contact_frequency", &raw.contact_frequency),
            ("probability_of_action", &raw.probability_of_action),
            ("primary_loss", &raw.primary_loss),
        ];
        let absent = |factor: &Option<RawFactor>| match factor {
            Some(raw) => raw.is_absent(),
            None => true,
        };
        if signal.iter().all(|&(_, factor)| absent(factor)) {
            return Err(RiskError::MissingParameters);
        }

        let mut warnings = Vec::new();
        let mut rejected: Vec<&'static str> = Vec::new();
        let mut resolve = |name: &'static str, factor: &Option<RawFactor>| -> RiskResult<UncertainFactor> {
            let resolved = factor.as_ref().map(RawFactor::resolve).unwrap_or_default();
            match (resolved.validate(), origin) {
                (Ok(()), _) => Ok(resolved),
                (Err(e), InputOrigin::Stored) => Err(e),
                (Err(e), InputOrigin::Submitted) => {
                    log::warn!("factor {name} rejected: {e}");
                    warnings.push(format!("{name} rejected: {e}"));
                    rejected.push(name);
                    Ok(UncertainFactor::zero().with_confidence(resolved.confidence))
                }
            }
        };

        let params = Self {
            contact_frequency:              resolve("contact_frequency", &raw.contact_frequency)?,
            probability_of_action:          resolve("probability_of_action", &raw.probability_of_action)?,
            threat_capability:              resolve("threat_capability", &raw.threat_capability)?,
            resistance_strength:            resolve("resistance_strength", &raw.resistance_strength)?,
            primary_loss:                   resolve("primary_loss", &raw.primary_loss)?,
            secondary_loss_event_frequency: resolve("secondary_loss_event_frequency", &raw.secondary_loss_event_frequency)?,
            secondary_loss_magnitude:       resolve("secondary_loss_magnitude", &raw.secondary_loss_magnitude)?,
        };

        if signal.iter().all(|&(name, factor)| absent(factor) || rejected.contains(&name)) {
            return Err(RiskError::MissingParameters);
        }

        Ok(ResolvedParams { params, warnings })
    }

    /// Every factor in the set, in trial sampling order.
    pub fn factors(&self) -> [(&'static str, &UncertainFactor); 7] {
        [
            ("contact_frequency", &self.contact_frequency),
            ("probability_of_action", &self.probability_of_action),
            ("threat_capability", &self.threat_capability),
            ("resistance_strength", &self.resistance_strength),
            ("primary_loss", &self.primary_loss),
            ("secondary_loss_event_frequency", &self.secondary_loss_event_frequency),
            ("secondary_loss_magnitude", &self.secondary_loss_magnitude),
        ]
    }

    pub fn validate(&self) -> RiskResult<()> {
        for (_, factor) in self.factors() {
            factor.validate()?;
        }
        Ok(())
    }
}
