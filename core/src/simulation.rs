//! Single-risk Monte Carlo simulator.
//!
//! One trial:
//!   1. Sample CF, POA, TCap, RS, PL, SLEF, SLM (triangular).
//!   2. susceptibility = 1 / (1 + e^(-(TCap - RS)/2))
//!   3. TEF = CF * POA
//!   4. LEF = TEF * susceptibility
//!   5. LM  = PL + SLEF * SLM
//!   6. loss = LEF * LM
//!
//! Summary statistics use nearest-lower-rank percentiles on the sorted
//! losses: percentile p reads index floor(p/100 * n). No interpolation.

use crate::{
    efficacy::ControlEffect,
    error::{RiskError, RiskResult},
    params::RiskCalculationParams,
    rng::RiskRng,
    types::{round2, round_currency, Money},
};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

pub const DEFAULT_ITERATIONS: usize = 1000;
pub const DEFAULT_BATCH_SIZE: usize = 250;

/// Intermediate quantities of one trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialOutcome {
    pub threat_event_frequency: f64,
    pub susceptibility:         f64,
    pub loss_event_frequency:   f64,
    pub secondary_loss:         f64,
    pub loss_magnitude:         f64,
    pub loss:                   f64,
}

/// Mean and extrema of one diagnostic quantity, rounded to 2 dp.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticStats {
    pub mean: f64,
    pub min:  f64,
    pub max:  f64,
}

impl DiagnosticStats {
    fn from_values(values: impl Iterator<Item = f64>) -> Self {
        let mut n = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            n += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if n == 0 {
            return Self::default();
        }
        Self {
            mean: round2(sum / n as f64),
            min:  round2(min),
            max:  round2(max),
        }
    }
}

/// Summary of one N-trial run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub iterations: usize,
    pub mean: Money,
    pub p10:  Money,
    pub p50:  Money,
    pub p90:  Money,
    pub max:  Money,
    pub threat_event_frequency: DiagnosticStats,
    pub loss_event_frequency:   DiagnosticStats,
    pub susceptibility:         DiagnosticStats,
    pub loss_magnitude:         DiagnosticStats,
    pub secondary_loss:         DiagnosticStats,
}

impl SimulationResult {
    /// Summarize trial outcomes. `outcomes` must be non-empty.
    pub fn from_outcomes(outcomes: &[TrialOutcome]) -> RiskResult<Self> {
        if outcomes.is_empty() {
            return Err(RiskError::InvalidInput("cannot summarize zero trials".into()));
        }
        let n = outcomes.len();
        let mean = outcomes.iter().map(|o| o.loss).sum::<f64>() / n as f64;

        let mut sorted: Vec<f64> = outcomes.iter().map(|o| o.loss).collect();
        sorted.sort_by(f64::total_cmp);

        Ok(Self {
            iterations: n,
            mean: round_currency(mean),
            p10:  round_currency(percentile_nearest_rank(&sorted, 10)),
            p50:  round_currency(percentile_nearest_rank(&sorted, 50)),
            p90:  round_currency(percentile_nearest_rank(&sorted, 90)),
            max:  round_currency(sorted[n - 1]),
            threat_event_frequency: DiagnosticStats::from_values(outcomes.iter().map(|o| o.threat_event_frequency)),
            loss_event_frequency:   DiagnosticStats::from_values(outcomes.iter().map(|o| o.loss_event_frequency)),
            susceptibility:         DiagnosticStats::from_values(outcomes.iter().map(|o| o.susceptibility)),
            loss_magnitude:         DiagnosticStats::from_values(outcomes.iter().map(|o| o.loss_magnitude)),
            secondary_loss:         DiagnosticStats::from_values(outcomes.iter().map(|o| o.secondary_loss)),
        })
    }
}

/// Value at index floor(percentile/100 * n) of an ascending slice,
/// clamped to the last element. Returns 0 for an empty slice.
pub fn percentile_nearest_rank(sorted: &[f64], percentile: u32) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = (percentile as usize * sorted.len()) / 100;
    sorted[index.min(sorted.len() - 1)]
}

/// Logistic map from capability-vs-resistance delta to a 0–1 probability.
pub fn susceptibility(threat_capability: f64, resistance_strength: f64) -> f64 {
    let delta = threat_capability - resistance_strength;
    1.0 / (1.0 + (-delta / 2.0).exp())
}

/// Run one trial. Consumes exactly one draw per factor.
pub fn run_trial<R: Rng + ?Sized>(
    params: &RiskCalculationParams,
    effect: &ControlEffect,
    rng: &mut R,
) -> RiskResult<TrialOutcome> {
    let cf   = params.contact_frequency.sample(rng)?;
    let poa  = params.probability_of_action.sample(rng)?;
    let tcap = params.threat_capability.sample(rng)?;
    let rs   = params.resistance_strength.sample(rng)?;
    let pl   = params.primary_loss.sample(rng)?;
    let slef = params.secondary_loss_event_frequency.sample(rng)?;
    let slm  = params.secondary_loss_magnitude.sample(rng)?;

    let susceptibility = susceptibility(tcap, rs);
    let threat_event_frequency = cf * poa;
    let loss_event_frequency = threat_event_frequency * susceptibility * effect.lef_factor();
    let secondary_loss = slef * slm;
    let loss_magnitude = (pl + secondary_loss) * effect.magnitude_factor();
    let loss = loss_event_frequency * loss_magnitude * effect.trial_loss_factor();

    Ok(TrialOutcome {
        threat_event_frequency,
        susceptibility,
        loss_event_frequency,
        secondary_loss,
        loss_magnitude,
        loss,
    })
}

/// Run `iterations` trials on a single injected random source, with no
/// control adjustment.
pub fn simulate<R: Rng + ?Sized>(
    params: &RiskCalculationParams,
    iterations: usize,
    rng: &mut R,
) -> RiskResult<SimulationResult> {
    simulate_with_controls(params, &ControlEffect::none(), iterations, rng)
}

/// Run `iterations` trials on a single injected random source.
pub fn simulate_with_controls<R: Rng + ?Sized>(
    params: &RiskCalculationParams,
    effect: &ControlEffect,
    iterations: usize,
    rng: &mut R,
) -> RiskResult<SimulationResult> {
    check_iterations(iterations)?;
    params.validate()?;
    let outcomes = (0..iterations)
        .map(|_| run_trial(params, effect, rng))
        .collect::<RiskResult<Vec<_>>>()?;
    SimulationResult::from_outcomes(&outcomes)
}

fn check_iterations(iterations: usize) -> RiskResult<()> {
    if iterations < 1 {
        return Err(RiskError::InvalidInput(format!(
            "iterations must be >= 1, got {iterations}"
        )));
    }
    Ok(())
}

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Batched simulator. Each batch of trials owns a stream derived from the
/// run seed and the batch index, so the result for a given seed does not
/// depend on `parallel`.
#[derive(Debug, Clone, Copy)]
pub struct Simulator {
    iterations: usize,
    batch_size: usize,
    parallel:   bool,
}

impl Simulator {
    pub fn new(iterations: usize) -> RiskResult<Self> {
        check_iterations(iterations)?;
        Ok(Self { iterations, batch_size: DEFAULT_BATCH_SIZE, parallel: false })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> RiskResult<Self> {
        if batch_size == 0 {
            return Err(RiskError::InvalidInput("batch size must be >= 1".into()));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn batch_count(&self) -> usize {
        self.iterations.div_ceil(self.batch_size)
    }

    /// Run the configured number of trials.
    ///
    /// Fails with `Cancelled` if the token is set before every batch has
    /// started; no partial summary is returned.
    pub fn run(
        &self,
        params: &RiskCalculationParams,
        effect: &ControlEffect,
        run_seed: u64,
        cancel: &CancellationToken,
    ) -> RiskResult<SimulationResult> {
        params.validate()?;
        let batches = self.batch_count();
        log::debug!(
            "simulation: {} trials in {batches} batches seed={run_seed:#x} parallel={}",
            self.iterations,
            self.parallel
        );

        let run_batch = |index: usize| -> RiskResult<Option<Vec<TrialOutcome>>> {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let start = index * self.batch_size;
            let len = self.batch_size.min(self.iterations - start);
            let mut rng = RiskRng::new(run_seed, index as u64);
            (0..len)
                .map(|_| run_trial(params, effect, &mut rng))
                .collect::<RiskResult<Vec<_>>>()
                .map(Some)
        };

        let results: Vec<Option<Vec<TrialOutcome>>> = if self.parallel {
            (0..batches).into_par_iter().map(run_batch).collect::<RiskResult<_>>()?
        } else {
            let mut out = Vec::with_capacity(batches);
            for index in 0..batches {
                let batch = run_batch(index)?;
                let stop = batch.is_none();
                out.push(batch);
                if stop {
                    break;
                }
            }
            out
        };

        let completed: usize = results.iter().flatten().map(Vec::len).sum();
        if completed < self.iterations {
            log::warn!(
                "simulation cancelled after {completed}/{} trials",
                self.iterations
            );
            return Err(RiskError::Cancelled { completed, requested: self.iterations });
        }

        let outcomes: Vec<TrialOutcome> = results.into_iter().flatten().flatten().collect();
        SimulationResult::from_outcomes(&outcomes)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self { iterations: DEFAULT_ITERATIONS, batch_size: DEFAULT_BATCH_SIZE, parallel: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_rank_reads_lower_index() {
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(percentile_nearest_rank(&sorted, 10), 2.0);
        assert_eq!(percentile_nearest_rank(&sorted, 50), 6.0);
        assert_eq!(percentile_nearest_rank(&sorted, 90), 10.0);
        assert_eq!(percentile_nearest_rank(&sorted, 100), 10.0);
        assert_eq!(percentile_nearest_rank(&[], 50), 0.0);
    }

    #[test]
    fn single_element_percentiles() {
        assert_eq!(percentile_nearest_rank(&[7.0], 10), 7.0);
        assert_eq!(percentile_nearest_rank(&[7.0], 99), 7.0);
    }

    #[test]
    fn susceptibility_is_half_at_parity() {
        assert_eq!(susceptibility(5.0, 5.0), 0.5);
        assert!(susceptibility(9.0, 1.0) > 0.95);
        assert!(susceptibility(1.0, 9.0) < 0.05);
    }

    #[test]
    fn batch_count_rounds_up() {
        let sim = Simulator::new(1001).unwrap().with_batch_size(250).unwrap();
        assert_eq!(sim.batch_count(), 5);
        let sim = Simulator::new(1).unwrap();
        assert_eq!(sim.batch_count(), 1);
    }
}
