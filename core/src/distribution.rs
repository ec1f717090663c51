//! Triangular distribution sampling for uncertain FAIR factors.
//!
//! Every uncertain input is a (min, mode, max) estimate. Sampling uses the
//! inverse CDF of the triangular distribution and consumes exactly one
//! uniform draw from the caller's random source.

use crate::error::{RiskError, RiskResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Qualitative confidence in an estimate. Informational only; it never
/// changes how a factor is sampled.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

/// A subjective (min, mode, max) estimate of one FAIR factor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UncertainFactor {
    pub min:  f64,
    #[serde(alias = "avg", alias = "likely")]
    pub mode: f64,
    pub max:  f64,
    #[serde(default)]
    pub confidence: Confidence,
}

impl UncertainFactor {
    /// Build a validated factor.
    pub fn new(min: f64, mode: f64, max: f64) -> RiskResult<Self> {
        let factor = Self { min, mode, max, confidence: Confidence::Medium };
        factor.validate()?;
        Ok(factor)
    }

    /// A degenerate distribution that always yields `value`.
    pub fn point(value: f64) -> Self {
        Self { min: value, mode: value, max: value, confidence: Confidence::Medium }
    }

    /// The "no contribution" factor (0, 0, 0).
    pub fn zero() -> Self {
        Self::point(0.0)
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn validate(&self) -> RiskResult<()> {
        validate_triangle(self.min, self.mode, self.max)
    }

    /// Draw one value. The factor must already be valid.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RiskResult<f64> {
        sample_triangular(self.min, self.mode, self.max, rng)
    }
}

impl Default for UncertainFactor {
    fn default() -> Self {
        Self::zero()
    }
}

fn validate_triangle(min: f64, mode: f64, max: f64) -> RiskResult<()> {
    let finite = min.is_finite() && mode.is_finite() && max.is_finite();
    if !finite || min < 0.0 || min > mode || mode > max {
        return Err(RiskError::InvalidDistribution { min, mode, max });
    }
    Ok(())
}

/// Draw a single value from triangular(min, mode, max).
///
/// Always consumes one uniform draw. Returns `min` when `min == max`.
pub fn sample_triangular<R: Rng + ?Sized>(
    min: f64,
    mode: f64,
    max: f64,
    rng: &mut R,
) -> RiskResult<f64> {
    validate_triangle(min, mode, max)?;
    let u: f64 = rng.gen();
    if min == max {
        return Ok(min);
    }
    Ok(triangular_inverse_cdf(min, mode, max, u))
}

/// Inverse CDF of triangular(min, mode, max) at `u` in [0, 1).
pub(crate) fn triangular_inverse_cdf(min: f64, mode: f64, max: f64, u: f64) -> f64 {
    let range = max - min;
    let c = (mode - min) / range;
    if u < c {
        min + (u * range * (mode - min)).sqrt()
    } else {
        max - ((1.0 - u) * range * (max - mode)).sqrt()
    }
}
