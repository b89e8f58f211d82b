//! Scenario-level tests for the nestegg engine
//!
//! Tests are organized by topic:
//! - `rates` - Rate generation modes and the bundled history
//! - `allocation` - Glide paths and coordinated packing over full runs
//! - `ledger` - Balance bookkeeping, contributions and big-ticket items
//! - `taxes` - Brackets, deductions, regime switch and IRMAA
//! - `withdrawals` - RMDs, waterfall order, income identity, survivors
//! - `scenarios` - Reference retirement scenarios and determinism
//! - `sweeps` - Historical and Monte Carlo sweeps, cancellation
//! - `roth` - Roth conversion search

mod roth;
mod scenarios;
mod taxes;

use crate::config::{DesiredIncome, Individual, PlanBuilder, PlanConfig};
use crate::model::{RateMode, RateSet};

pub(crate) const START_YEAR: i16 = 2025;

/// Rates that leave every balance and the price level unchanged
pub(crate) fn zero_rates() -> RateMode {
    RateMode::Fixed {
        rates: RateSet::new(0.0, 0.0, 0.0, 0.0),
    }
}

/// Age 63 at plan start, simulated through 93, $1M tax-free, $40k flat
pub(crate) fn four_percent_retiree() -> PlanBuilder {
    PlanBuilder::new()
        .start_year(START_YEAR)
        .individual(Individual::new("Retiree", START_YEAR - 63, 93).tax_free(1_000_000.0))
        .desired_income(DesiredIncome::flat(40_000.0))
}

pub(crate) fn four_percent_plan(mode: RateMode) -> PlanConfig {
    four_percent_retiree().rate_mode(mode).build().unwrap()
}
