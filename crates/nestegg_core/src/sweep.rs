//! Historical and Monte Carlo sweeps
//!
//! Each scenario in a sweep is independent: it owns its ledger and reads only
//! the shared plan and the immutable rate history, so scenarios run in
//! parallel with no locking. Cancellation is cooperative: a scenario checks
//! the flag before it starts, and cancelled scenarios contribute nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::PlanConfig;
use crate::error::SimulationError;
use crate::model::{
    HistoricalSweep, MonteCarloSummary, RateMode, RateSet, SweepOutcome, history,
};
use crate::simulation::ScenarioRunner;

/// Scenarios per Monte Carlo batch; each batch has its own seeded RNG
const MAX_BATCH_SIZE: usize = 100;

/// Progress tracking and cancellation shared with a running sweep
#[derive(Debug, Clone)]
pub struct SweepProgress {
    completed: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl SweepProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of finished scenarios
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Restart counting for a new sweep of `total` scenarios
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Ask the sweep to stop starting new scenarios
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for SweepProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

fn is_cancelled(progress: Option<&SweepProgress>) -> bool {
    progress.is_some_and(SweepProgress::is_cancelled)
}

// ============================================================================
// Historical sweep
// ============================================================================

/// One scenario per start year in `[from, to]`, each replaying history from
/// its start year through the last bundled year and wrapping around.
pub fn run_historical(
    plan: &PlanConfig,
    from: i16,
    to: i16,
    progress: Option<&SweepProgress>,
) -> Result<HistoricalSweep, SimulationError> {
    history::check_window(from, to)?;
    let data = history::window(from, history::LAST_YEAR)?;
    let horizon = plan.horizon();
    let runner = ScenarioRunner::new(plan);
    let heirs_tax_rate = plan.heirs_tax_rate();
    let starts: Vec<i16> = (from..=to).collect();
    if let Some(p) = progress {
        p.reset(starts.len());
    }
    tracing::info!(from, to, horizon, "historical sweep started");

    let evaluate = |&start: &i16| -> Option<SweepOutcome> {
        if is_cancelled(progress) {
            return None;
        }
        let window = &data[(start - from) as usize..];
        let rates: Vec<RateSet> = window.iter().cycle().take(horizon).copied().collect();
        let outcome = runner.run_rates(&rates);
        if let Some(p) = progress {
            p.increment();
        }
        Some(SweepOutcome {
            start_year: start,
            succeeded: outcome.succeeded(),
            first_failure: outcome.first_failure(),
            estate: outcome.estate(heirs_tax_rate),
        })
    };

    #[cfg(feature = "parallel")]
    let results: Vec<Option<SweepOutcome>> = starts.par_iter().map(evaluate).collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Option<SweepOutcome>> = starts.iter().map(evaluate).collect();

    let outcomes: Vec<SweepOutcome> = results.into_iter().flatten().collect();
    let sweep = HistoricalSweep {
        cancelled: outcomes.len() < starts.len(),
        requested: starts.len(),
        outcomes,
    };
    tracing::info!(
        completed = sweep.outcomes.len(),
        success_rate = sweep.success_rate(),
        cancelled = sweep.cancelled,
        "historical sweep finished"
    );
    Ok(sweep)
}

// ============================================================================
// Monte Carlo sweep
// ============================================================================

/// `n` independent scenarios drawn from a multivariate normal fit to the
/// `[from, to]` window. The result depends only on `seed`, not on thread
/// scheduling.
pub fn run_monte_carlo(
    plan: &PlanConfig,
    n: usize,
    from: i16,
    to: i16,
    seed: u64,
    progress: Option<&SweepProgress>,
) -> Result<MonteCarloSummary, SimulationError> {
    history::check_window(from, to)?;
    let plan = plan.with_rate_mode(RateMode::Stochastic { from, to: Some(to) })?;
    let runner = ScenarioRunner::new(&plan);
    let heirs_tax_rate = plan.heirs_tax_rate();
    let num_batches = n.div_ceil(MAX_BATCH_SIZE);
    if let Some(p) = progress {
        p.reset(n);
    }
    tracing::info!(n, from, to, seed, "monte carlo sweep started");

    let run_batch = |i: usize| -> Vec<(bool, f64)> {
        let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(i as u64));
        let batch_size = if i == num_batches - 1 {
            n - i * MAX_BATCH_SIZE
        } else {
            MAX_BATCH_SIZE
        };
        (0..batch_size)
            .map_while(|_| {
                let scenario_seed = rng.next_u64();
                if is_cancelled(progress) {
                    return None;
                }
                let outcome = runner.run(scenario_seed);
                if let Some(p) = progress {
                    p.increment();
                }
                Some((outcome.succeeded(), outcome.estate(heirs_tax_rate).value))
            })
            .collect()
    };

    #[cfg(feature = "parallel")]
    let results: Vec<(bool, f64)> = (0..num_batches)
        .into_par_iter()
        .flat_map(run_batch)
        .collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<(bool, f64)> = (0..num_batches).flat_map(run_batch).collect();

    let mut estates: Vec<f64> = results.iter().map(|&(_, estate)| estate).collect();
    estates.sort_by(f64::total_cmp);
    let summary = MonteCarloSummary {
        requested: n,
        completed: results.len(),
        successes: results.iter().filter(|&&(ok, _)| ok).count(),
        estates,
        cancelled: results.len() < n,
    };
    tracing::info!(
        completed = summary.completed,
        success_rate = summary.success_rate(),
        cancelled = summary.cancelled,
        "monte carlo sweep finished"
    );
    Ok(summary)
}
