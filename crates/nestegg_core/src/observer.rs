//! Per-run observation hooks
//!
//! An observer is passed explicitly into each run; there is no global
//! verbosity switch. Hooks default to no-ops so implementors override only
//! what they need. Observers must be `Sync` because sweeps share one across
//! worker threads.

use crate::model::YearState;

pub trait SimulationObserver: Sync {
    /// Called once per simulated year after the year's state is final
    fn year_completed(&self, _state: &YearState) {}

    /// Called when a year's income target or big-ticket expense goes unfunded
    fn shortfall(&self, _year: i16, _amount: f64) {}

    /// Called at the end of an individual's final year
    fn individual_died(&self, _year: i16, _individual: usize) {}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SimulationObserver for NullObserver {}

/// Forwards every hook to `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SimulationObserver for TracingObserver {
    fn year_completed(&self, state: &YearState) {
        tracing::info!(
            year = state.year,
            target = state.target_income,
            net = state.net_income,
            withdrawals = state.withdrawals.total(),
            tax = state.tax.total(),
            balance = state.closing_balances().total(),
            "year completed"
        );
    }

    fn shortfall(&self, year: i16, amount: f64) {
        tracing::warn!(year, amount, "income shortfall");
    }

    fn individual_died(&self, year: i16, individual: usize) {
        tracing::info!(year, individual, "individual reached life expectancy");
    }
}
