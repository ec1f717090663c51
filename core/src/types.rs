//! Shared primitive types used across the entire engine.

use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable identifier for a risk supplied by the caller.
pub type RiskId = String;

/// The canonical population snapshot identifier (uuid v4, hyphenated).
pub type SnapshotId = String;

/// Monetary amount in whole currency units.
pub type Money = f64;

/// Severity bucket for a risk. Supplied by the caller's business rules;
/// the engine only counts by it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low      => "low",
            Self::Medium   => "medium",
            Self::High     => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting period an aggregation run belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period {
    pub year:  i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> RiskResult<Self> {
        let period = Self { year, month };
        period.validate()?;
        Ok(period)
    }

    pub fn validate(&self) -> RiskResult<()> {
        if !(1..=12).contains(&self.month) {
            return Err(RiskError::InvalidInput(format!(
                "period month must be 1..=12, got {}",
                self.month
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Round to whole currency units.
pub(crate) fn round_currency(value: f64) -> f64 {
    value.round()
}

/// Round a diagnostic quantity to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
