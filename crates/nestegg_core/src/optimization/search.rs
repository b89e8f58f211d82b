//! Coordinate-wise hill climb over the conversion schedule
//!
//! Each coordinate is one individual's conversion in one year they are alive.
//! A pass perturbs every coordinate up and down by the current step and keeps
//! a move only if the estate strictly improves without adding shortfall.
//! After a pass with no accepted move the step halves; the search ends once
//! the step falls below the minimum. Every trial is an independent
//! full-horizon simulation run on the same seed.

use rustc_hash::FxHashMap;

use crate::config::PlanConfig;
use crate::error::ConfigError;
use crate::simulation::ScenarioRunner;
use crate::sweep::SweepProgress;

use super::config::RothOptimizerConfig;
use super::result::{ConvergenceHistory, PassRecord, RothOptimization, TerminationReason};

/// A trial may add at most this much shortfall over the incumbent
const SHORTFALL_TOLERANCE: f64 = 0.01;

pub type Conversions = Vec<Vec<f64>>;

/// Objective and constraint value of one conversion schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub estate: f64,
    pub shortfall: f64,
}

/// Incumbent of the search. Every transition builds a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub conversions: Conversions,
    pub objective: f64,
    pub shortfall: f64,
    pub step: f64,
}

impl SearchState {
    #[must_use]
    pub fn initial(conversions: Conversions, baseline: Evaluation, step: f64) -> Self {
        Self {
            conversions,
            objective: baseline.estate,
            shortfall: baseline.shortfall,
            step,
        }
    }

    /// Whether `trial` beats the incumbent without breaking the income constraint
    #[must_use]
    pub fn accepts(&self, trial: &Evaluation) -> bool {
        trial.shortfall <= self.shortfall + SHORTFALL_TOLERANCE && trial.estate > self.objective
    }

    /// Move coordinate `(owner, index)` to `amount`
    #[must_use]
    pub fn moved(&self, owner: usize, index: usize, amount: f64, result: Evaluation) -> Self {
        let mut conversions = self.conversions.clone();
        conversions[owner][index] = amount;
        Self {
            conversions,
            objective: result.estate,
            shortfall: result.shortfall,
            step: self.step,
        }
    }

    #[must_use]
    pub fn halved(&self) -> Self {
        Self {
            step: self.step / 2.0,
            ..self.clone()
        }
    }
}

enum Stop {
    Budget,
    Cancelled,
}

/// Runs trials, caching results by schedule
struct Evaluator<'a> {
    plan: &'a PlanConfig,
    settings: &'a RothOptimizerConfig,
    progress: Option<&'a SweepProgress>,
    cache: FxHashMap<Vec<u64>, Evaluation>,
    evaluations: usize,
}

impl<'a> Evaluator<'a> {
    fn simulate(plan: &PlanConfig, settings: &RothOptimizerConfig, conversions: &[Vec<f64>]) -> Evaluation {
        let trial = plan.with_roth_conversions(conversions);
        let outcome = ScenarioRunner::new(&trial).run(settings.seed);
        Evaluation {
            estate: outcome.estate(settings.heirs_tax_rate).value,
            shortfall: outcome.total_shortfall(),
        }
    }

    fn key(conversions: &[Vec<f64>]) -> Vec<u64> {
        conversions.iter().flatten().map(|x| x.to_bits()).collect()
    }

    fn check(&self, needed: usize) -> Result<(), Stop> {
        if self.progress.is_some_and(SweepProgress::is_cancelled) {
            return Err(Stop::Cancelled);
        }
        if self.evaluations + needed > self.settings.max_evaluations {
            return Err(Stop::Budget);
        }
        Ok(())
    }

    fn evaluate(&mut self, conversions: &[Vec<f64>]) -> Result<Evaluation, Stop> {
        let key = Self::key(conversions);
        if let Some(&hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        self.check(1)?;
        let result = Self::simulate(self.plan, self.settings, conversions);
        self.record(key, result);
        Ok(result)
    }

    /// Evaluate the up and down trials of one coordinate, in parallel when
    /// both need simulating
    fn evaluate_pair(
        &mut self,
        up: &[Vec<f64>],
        down: Option<&[Vec<f64>]>,
    ) -> Result<(Evaluation, Option<Evaluation>), Stop> {
        let Some(down) = down else {
            return Ok((self.evaluate(up)?, None));
        };
        let (up_key, down_key) = (Self::key(up), Self::key(down));
        let cached = (
            self.cache.get(&up_key).copied(),
            self.cache.get(&down_key).copied(),
        );
        match cached {
            (Some(u), Some(d)) => Ok((u, Some(d))),
            (Some(u), None) => Ok((u, Some(self.evaluate(down)?))),
            (None, Some(d)) => Ok((self.evaluate(up)?, Some(d))),
            (None, None) => {
                self.check(2)?;
                let (plan, settings) = (self.plan, self.settings);

                #[cfg(feature = "parallel")]
                let (u, d) = rayon::join(
                    || Self::simulate(plan, settings, up),
                    || Self::simulate(plan, settings, down),
                );

                #[cfg(not(feature = "parallel"))]
                let (u, d) = (
                    Self::simulate(plan, settings, up),
                    Self::simulate(plan, settings, down),
                );

                self.record(up_key, u);
                self.record(down_key, d);
                Ok((u, Some(d)))
            }
        }
    }

    fn record(&mut self, key: Vec<u64>, result: Evaluation) {
        self.cache.insert(key, result);
        self.evaluations += 1;
        if let Some(p) = self.progress {
            p.increment();
        }
    }
}

/// Coordinates `(individual, year index)` in which the individual is alive
fn coordinates(plan: &PlanConfig) -> Vec<(usize, usize)> {
    let horizon = plan.horizon();
    plan.individuals()
        .iter()
        .enumerate()
        .flat_map(|(owner, p)| {
            (0..horizon)
                .filter(move |&n| p.is_alive(plan.start_year() + n as i16))
                .map(move |n| (owner, n))
        })
        .collect()
}

/// One pass over every coordinate at the current step. Returns the new
/// incumbent and the number of accepted moves.
fn pass(
    mut state: SearchState,
    coords: &[(usize, usize)],
    evaluator: &mut Evaluator<'_>,
    history: &mut ConvergenceHistory,
) -> Result<(SearchState, usize), (SearchState, Stop)> {
    let mut improvements = 0;
    for &(owner, n) in coords {
        let current = state.conversions[owner][n];
        let mut up = state.conversions.clone();
        up[owner][n] = current + state.step;
        let down = (current > 0.0).then(|| {
            let mut down = state.conversions.clone();
            down[owner][n] = (current - state.step).max(0.0);
            down
        });

        let (up_result, down_result) = match evaluator.evaluate_pair(&up, down.as_deref()) {
            Ok(results) => results,
            Err(stop) => return Err((state, stop)),
        };

        let mut best: Option<(f64, Evaluation)> = None;
        if state.accepts(&up_result) {
            best = Some((up[owner][n], up_result));
        }
        if let (Some(down), Some(result)) = (&down, down_result)
            && state.accepts(&result)
            && best.is_none_or(|(_, b)| result.estate > b.estate)
        {
            best = Some((down[owner][n], result));
        }
        if let Some((amount, result)) = best {
            tracing::debug!(
                individual = owner,
                year_index = n,
                amount,
                estate = result.estate,
                "conversion move accepted"
            );
            state = state.moved(owner, n, amount, result);
            improvements += 1;
        }
        history.record_trial(state.objective);
    }
    Ok((state, improvements))
}

/// Search for the conversion schedule maximizing the after-tax estate while
/// every year's income target stays met. Never fails once the settings are
/// valid: the worst result is the unconverted baseline.
pub fn optimize_roth(
    plan: &PlanConfig,
    settings: &RothOptimizerConfig,
    progress: Option<&SweepProgress>,
) -> Result<RothOptimization, ConfigError> {
    settings.validate()?;
    let coords = coordinates(plan);
    let zeros: Conversions = vec![vec![0.0; plan.horizon()]; plan.individuals().len()];
    if let Some(p) = progress {
        p.reset(settings.max_evaluations);
    }

    let mut evaluator = Evaluator {
        plan,
        settings,
        progress,
        cache: FxHashMap::default(),
        evaluations: 0,
    };
    let mut history = ConvergenceHistory::new();

    // The baseline is always simulated, even past the budget
    let baseline = Evaluator::simulate(plan, settings, &zeros);
    evaluator.record(Evaluator::key(&zeros), baseline);
    history.record_trial(baseline.estate);
    tracing::info!(
        coordinates = coords.len(),
        baseline = baseline.estate,
        step = settings.start_conv,
        "roth optimization started"
    );

    let mut state = SearchState::initial(zeros, baseline, settings.start_conv);
    let termination_reason = loop {
        if state.step < settings.min_conv {
            break TerminationReason::Converged;
        }
        match pass(state, &coords, &mut evaluator, &mut history) {
            Ok((next, improvements)) => {
                history.record_pass(PassRecord {
                    step: next.step,
                    estate: next.objective,
                    improvements,
                    evaluations: evaluator.evaluations,
                });
                tracing::info!(
                    step = next.step,
                    estate = next.objective,
                    improvements,
                    evaluations = evaluator.evaluations,
                    "optimization pass complete"
                );
                state = if improvements == 0 { next.halved() } else { next };
            }
            Err((last, stop)) => {
                state = last;
                break match stop {
                    Stop::Budget => TerminationReason::MaxEvaluationsReached,
                    Stop::Cancelled => TerminationReason::UserCancelled,
                };
            }
        }
    };

    tracing::info!(
        estate = state.objective,
        gain = state.objective - baseline.estate,
        evaluations = evaluator.evaluations,
        reason = ?termination_reason,
        "roth optimization finished"
    );

    Ok(RothOptimization {
        plan: plan.with_roth_conversions(&state.conversions),
        baseline_estate: baseline.estate,
        estate: state.objective,
        shortfall: state.shortfall,
        evaluations: evaluator.evaluations,
        history,
        termination_reason,
        conversions: state.conversions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SearchState {
        SearchState::initial(
            vec![vec![0.0; 3]],
            Evaluation {
                estate: 100.0,
                shortfall: 0.0,
            },
            8.0,
        )
    }

    #[test]
    fn test_accepts_only_strict_improvement() {
        let s = state();
        assert!(s.accepts(&Evaluation {
            estate: 100.5,
            shortfall: 0.0
        }));
        assert!(!s.accepts(&Evaluation {
            estate: 100.0,
            shortfall: 0.0
        }));
        assert!(!s.accepts(&Evaluation {
            estate: 200.0,
            shortfall: 5.0
        }));
    }

    #[test]
    fn test_transitions_leave_original_untouched() {
        let s = state();
        let moved = s.moved(
            0,
            1,
            8.0,
            Evaluation {
                estate: 110.0,
                shortfall: 0.0,
            },
        );
        assert_eq!(s.conversions[0][1], 0.0);
        assert_eq!(moved.conversions[0][1], 8.0);
        assert_eq!(moved.objective, 110.0);
        let halved = moved.halved();
        assert_eq!(halved.step, 4.0);
        assert_eq!(halved.conversions, moved.conversions);
    }
}
