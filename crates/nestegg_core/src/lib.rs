//! Retirement savings simulation library
//!
//! This crate simulates a household's savings year by year and searches for
//! Roth conversion schedules. It supports:
//! - Per-individual taxable, tax-deferred and tax-free accounts
//! - Rate paths that are fixed, averaged, replayed from history or drawn
//!   from a multivariate normal fit to history
//! - Glide-path allocations, optionally packed across accounts and spouses
//! - Federal income tax with inflation-indexed brackets, the TCJA sunset and
//!   Medicare IRMAA surcharges
//! - Required Minimum Distributions and a prioritized withdrawal waterfall
//! - Historical and Monte Carlo sweeps, run in parallel
//!
//! # Example
//!
//! ```ignore
//! use nestegg_core::config::{DesiredIncome, Individual, PlanBuilder};
//! use nestegg_core::model::RateMode;
//! use nestegg_core::observer::NullObserver;
//!
//! let plan = PlanBuilder::new()
//!     .start_year(2025)
//!     .individual(Individual::new("Alex", 1962, 93).tax_free(1_000_000.0))
//!     .desired_income(DesiredIncome::flat(40_000.0))
//!     .rate_mode(RateMode::Historical { from: 1966, to: Some(1997) })
//!     .build()?;
//!
//! let outcome = nestegg_core::run(plan, 0, &NullObserver);
//! println!("first failure: {:?}", outcome.first_failure());
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod allocation;
pub mod error;
pub mod observer;
pub mod optimization;
pub mod simulation;
pub mod sweep;
pub mod taxes;
pub mod withdrawal;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{PlanBuilder, PlanConfig};
pub use error::{ConfigError, RateDataRangeError, SimulationError};
pub use optimization::{RothOptimizerConfig, optimize_roth};
pub use simulation::{ScenarioRunner, run};
pub use sweep::{SweepProgress, run_historical, run_monte_carlo};
