use crate::{
    aggregation::ExposureCurveConfig,
    efficacy::EfficacyPolicy,
    error::{RiskError, RiskResult},
    simulation::{DEFAULT_BATCH_SIZE, DEFAULT_ITERATIONS},
    types::{Money, Severity},
};
use serde::{Deserialize, Serialize};

/// Residual-risk thresholds used to classify a risk that arrives without
/// a caller-supplied severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeverityBands {
    pub critical: Money,
    pub high:     Money,
    pub medium:   Money,
}

impl SeverityBands {
    pub fn classify(&self, residual_risk: Money) -> Severity {
        if residual_risk >= self.critical {
            Severity::Critical
        } else if residual_risk >= self.high {
            Severity::High
        } else if residual_risk >= self.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    fn validate(&self) -> RiskResult<()> {
        let ordered = 0.0 <= self.medium && self.medium <= self.high && self.high <= self.critical;
        if !ordered {
            return Err(RiskError::InvalidInput(format!(
                "severity bands must satisfy 0 <= medium <= high <= critical, got {} / {} / {}",
                self.medium, self.high, self.critical
            )));
        }
        Ok(())
    }
}

impl Default for SeverityBands {
    fn default() -> Self {
        Self {
            critical: 1_000_000.0,
            high:     250_000.0,
            medium:   50_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub iterations: usize,
    pub batch_size: usize,
    /// Spread trial batches and population risks across the rayon pool.
    pub parallel: bool,
    /// Master seed. Drawn from entropy when absent.
    pub seed: Option<u64>,
    pub efficacy_policy: EfficacyPolicy,
    pub exposure_curve: ExposureCurveConfig,
    pub severity_bands: SeverityBands,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            batch_size: DEFAULT_BATCH_SIZE,
            parallel: true,
            seed: None,
            efficacy_policy: EfficacyPolicy::default(),
            exposure_curve: ExposureCurveConfig::default(),
            severity_bands: SeverityBands::default(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    /// In tests, use EngineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        Ok(config)
    }

    /// Seeded, serial configuration for reproducible tests.
    pub fn default_test() -> Self {
        Self {
            seed: Some(42),
            parallel: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> RiskResult<()> {
        if self.iterations == 0 {
            return Err(RiskError::InvalidInput("iterations must be >= 1".into()));
        }
        if self.batch_size == 0 {
            return Err(RiskError::InvalidInput("batchSize must be >= 1".into()));
        }
        if self.exposure_curve.max_points == 0 && !self.exposure_curve.full {
            return Err(RiskError::InvalidInput("exposureCurve.maxPoints must be >= 1".into()));
        }
        self.severity_bands.validate()
    }
}
