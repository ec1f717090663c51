//! The risk engine. Wires configuration, random streams, the calculator,
//! the aggregator and the snapshot log together.
//!
//! RULES:
//!   - Every run seed is derived from the master seed via the StreamBank.
//!   - A risk's result depends only on (master seed, risk id, inputs),
//!     never on its position in a population or on thread scheduling.
//!   - One failing risk never fails a population run; it is excluded,
//!     counted and reported. Cancellation fails the whole run.

use crate::{
    aggregation::{PopulationAggregator, PopulationSummary, RiskExposure},
    calculation::{CalculationRequest, RiskCalculationResult, RiskCalculator},
    config::EngineConfig,
    error::{RiskError, RiskResult},
    rng::StreamBank,
    simulation::{CancellationToken, Simulator},
    snapshot::{PopulationSnapshot, SnapshotLog},
    types::{Period, RiskId, Severity, SnapshotId},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Stream key for ad-hoc requests that carry no risk id.
const ADHOC_RISK_KEY: &str = "adhoc";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub risk_id:  RiskId,
    pub severity: Severity,
    pub result:   RiskCalculationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskFailure {
    pub risk_id: RiskId,
    pub reason:  String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopulationReport {
    pub snapshot_id: SnapshotId,
    pub summary:     PopulationSummary,
    pub assessments: Vec<RiskAssessment>,
    pub failures:    Vec<RiskFailure>,
}

pub struct RiskEngine {
    config:     EngineConfig,
    streams:    StreamBank,
    calculator: RiskCalculator,
    aggregator: PopulationAggregator,
    snapshots:  SnapshotLog,
    cancel:     CancellationToken,
}

impl RiskEngine {
    pub fn new(config: EngineConfig) -> RiskResult<Self> {
        config.validate()?;
        let streams = match config.seed {
            Some(seed) => StreamBank::new(seed),
            None => StreamBank::from_entropy(),
        };
        log::debug!(
            "engine: seed={} iterations={} batch_size={} parallel={} policy={:?}",
            streams.master_seed(),
            config.iterations,
            config.batch_size,
            config.parallel,
            config.efficacy_policy
        );

        let simulator = Simulator::new(config.iterations)?
            .with_batch_size(config.batch_size)?
            .with_parallel(config.parallel);

        Ok(Self {
            calculator: RiskCalculator::new(simulator, config.efficacy_policy),
            aggregator: PopulationAggregator::new(config.exposure_curve),
            snapshots:  SnapshotLog::new(),
            cancel:     CancellationToken::new(),
            streams,
            config,
        })
    }

    /// Engine with the seeded serial test configuration.
    pub fn build_test(seed: u64) -> RiskResult<Self> {
        Self::new(EngineConfig {
            seed: Some(seed),
            ..EngineConfig::default_test()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.streams.master_seed()
    }

    /// A handle that cancels in-flight and future runs until reset.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Calculate one risk, ad-hoc or stored.
    pub fn calculate(&self, request: &CalculationRequest) -> RiskResult<RiskCalculationResult> {
        let key = request.risk_id.as_deref().unwrap_or(ADHOC_RISK_KEY);
        self.calculate_keyed(key, request)
    }

    fn calculate_keyed(&self, key: &str, request: &CalculationRequest) -> RiskResult<RiskCalculationResult> {
        let run_seed = self.streams.seed_for_risk(key);
        self.calculator.calculate(request, run_seed, &self.cancel)
    }

    /// Calculate every risk, aggregate the residual results for `period`
    /// and append a snapshot.
    ///
    /// Risks without an id are keyed by position (`risk-<index>`).
    pub fn assess_population(
        &mut self,
        requests: &[CalculationRequest],
        period: Period,
    ) -> RiskResult<PopulationReport> {
        period.validate()?;

        let keyed: Vec<(RiskId, &CalculationRequest)> = requests
            .iter()
            .enumerate()
            .map(|(i, r)| (r.risk_id.clone().unwrap_or_else(|| format!("risk-{i}")), r))
            .collect();

        let outcomes: Vec<RiskResult<RiskCalculationResult>> = if self.config.parallel {
            keyed.par_iter().map(|(id, r)| self.calculate_keyed(id, r)).collect()
        } else {
            keyed.iter().map(|(id, r)| self.calculate_keyed(id, r)).collect()
        };

        let mut assessments = Vec::with_capacity(requests.len());
        let mut failures = Vec::new();
        let mut exposures = Vec::with_capacity(requests.len());

        for ((risk_id, request), outcome) in keyed.into_iter().zip(outcomes) {
            match outcome {
                Ok(result) => {
                    let severity = request
                        .severity
                        .unwrap_or_else(|| self.config.severity_bands.classify(result.residual_risk));
                    exposures.push(RiskExposure::from_result(risk_id.clone(), severity, &result));
                    assessments.push(RiskAssessment { risk_id, severity, result });
                }
                Err(e @ RiskError::Cancelled { .. }) => return Err(e),
                Err(e) => {
                    log::warn!("{period} risk {risk_id} excluded: {e}");
                    failures.push(RiskFailure { risk_id, reason: e.to_string() });
                }
            }
        }

        let summary = self
            .aggregator
            .aggregate(&exposures, period)?
            .with_failed_count(failures.len());

        let snapshot = PopulationSnapshot::new(self.seed(), summary.clone());
        let snapshot_id = self.snapshots.append(snapshot).snapshot_id.clone();

        log::info!(
            "{period} population: {} included, {} excluded, {} failed, residual total {:.0}",
            summary.total_count,
            summary.excluded_count,
            summary.failed_count,
            summary.total_residual_risk
        );

        Ok(PopulationReport { snapshot_id, summary, assessments, failures })
    }

    pub fn snapshots(&self) -> &SnapshotLog {
        &self.snapshots
    }

    pub fn latest_snapshot(&self) -> Option<&PopulationSnapshot> {
        self.snapshots.latest()
    }
}
