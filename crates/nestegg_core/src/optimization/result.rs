//! Optimization result types
//!
//! Contains types for tracking search progress and the final result.

use serde::{Deserialize, Serialize};

use crate::config::PlanConfig;

/// Summary of one full pass over every coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassRecord {
    pub step: f64,
    /// Best estate at the end of the pass
    pub estate: f64,
    /// Accepted moves during the pass
    pub improvements: usize,
    /// Simulations run so far
    pub evaluations: usize,
}

/// History of the search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvergenceHistory {
    pub passes: Vec<PassRecord>,

    /// Best objective after each trial (monotonically non-decreasing)
    pub best_values: Vec<f64>,
}

impl ConvergenceHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_trial(&mut self, best: f64) {
        self.best_values.push(best);
    }

    pub fn record_pass(&mut self, pass: PassRecord) {
        self.passes.push(pass);
    }

    #[must_use]
    pub fn num_trials(&self) -> usize {
        self.best_values.len()
    }
}

/// Reason why optimization terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Step size fell below the minimum
    Converged,

    /// The evaluation budget ran out first
    MaxEvaluationsReached,

    /// Cancelled through the shared progress handle
    UserCancelled,
}

/// Final result of a Roth conversion search
#[derive(Debug, Clone, Serialize)]
pub struct RothOptimization {
    /// Input plan with the optimized conversions applied
    pub plan: PlanConfig,

    /// Conversion per individual per simulated year
    pub conversions: Vec<Vec<f64>>,

    /// Estate of the unconverted plan, in plan-start dollars
    pub baseline_estate: f64,

    /// Estate of the optimized plan, in plan-start dollars
    pub estate: f64,

    /// Total shortfall of the optimized plan
    pub shortfall: f64,

    /// Full-horizon simulations run
    pub evaluations: usize,

    pub history: ConvergenceHistory,

    pub termination_reason: TerminationReason,
}

impl RothOptimization {
    /// Estate gained over the unconverted plan
    #[must_use]
    pub fn improvement(&self) -> f64 {
        self.estate - self.baseline_estate
    }

    /// Sum of all conversions
    #[must_use]
    pub fn total_converted(&self) -> f64 {
        self.conversions.iter().flatten().sum()
    }
}
