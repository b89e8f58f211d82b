use serde::{Deserialize, Serialize};

use super::accounts::{AccountWeights, Balances};
use super::market::RateSet;
use super::tax_config::FilingStatus;
use crate::taxes::TaxAssessment;

/// Everything that happened in one simulated year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearState {
    pub year: i16,
    pub index: usize,
    /// Age of each individual, `None` once deceased
    pub ages: Vec<Option<u16>>,
    pub filing_status: FilingStatus,
    pub rates: RateSet,
    pub weights: Vec<AccountWeights>,
    pub opening: Vec<Balances>,
    pub closing: Vec<Balances>,
    /// Realized inflation from plan start through the prior year
    pub inflation_factor: f64,

    pub wages: f64,
    pub pension: f64,
    pub social_security: f64,
    /// Required distributions per individual
    pub rmd: Vec<f64>,
    /// Executed conversions per individual
    pub roth_conversions: Vec<f64>,
    pub contributions: f64,
    pub growth: f64,

    /// Income withdrawals by tax treatment (RMDs and big-ticket draws excluded)
    pub withdrawals: Balances,
    /// Surplus deposited to taxable accounts
    pub deposits: f64,
    /// Signed big-ticket flow actually realized
    pub big_ticket: f64,
    /// Savings drawn to fund big-ticket expenses
    pub big_ticket_draws: Balances,

    pub tax: TaxAssessment,
    pub target_income: f64,
    pub net_income: f64,
    /// Income target (plus big-ticket expense) left unfunded
    pub shortfall: f64,
    pub failed: bool,
}

impl YearState {
    #[must_use]
    pub fn total_rmd(&self) -> f64 {
        self.rmd.iter().sum()
    }

    #[must_use]
    pub fn total_conversions(&self) -> f64 {
        self.roth_conversions.iter().sum()
    }

    /// Wages, pension, social security and required distributions
    #[must_use]
    pub fn fixed_income(&self) -> f64 {
        self.wages + self.pension + self.social_security + self.total_rmd()
    }

    #[must_use]
    pub fn closing_balances(&self) -> Balances {
        self.closing
            .iter()
            .fold(Balances::default(), |acc, b| acc.plus(b))
    }
}

/// Post-tax value left to heirs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estate {
    /// In plan-start dollars
    pub value: f64,
    /// Nominal post-tax value at the end of the horizon
    pub nominal: f64,
    /// Cumulative inflation over the whole horizon
    pub inflation_factor: f64,
}

/// One full-horizon realization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub start_year: i16,
    pub years: Vec<YearState>,
}

impl ScenarioOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.years.iter().any(|y| y.failed)
    }

    /// Index of the first year that could not be funded
    #[must_use]
    pub fn first_failure(&self) -> Option<usize> {
        self.years.iter().position(|y| y.failed)
    }

    #[must_use]
    pub fn total_shortfall(&self) -> f64 {
        self.years.iter().map(|y| y.shortfall).sum()
    }

    /// Household balances at the end of the final year
    #[must_use]
    pub fn final_balances(&self) -> Balances {
        self.years
            .last()
            .map(YearState::closing_balances)
            .unwrap_or_default()
    }

    /// Inflation realized over every simulated year
    #[must_use]
    pub fn cumulative_inflation(&self) -> f64 {
        self.years
            .last()
            .map_or(1.0, |y| y.inflation_factor * (1.0 + y.rates.inflation()))
    }

    /// Final balances after heirs pay `heirs_tax_rate` on the tax-deferred
    /// portion, deflated to plan-start dollars.
    #[must_use]
    pub fn estate(&self, heirs_tax_rate: f64) -> Estate {
        let b = self.final_balances();
        let nominal = b.taxable + b.tax_free + (1.0 - heirs_tax_rate) * b.tax_deferred;
        let inflation_factor = self.cumulative_inflation();
        Estate {
            value: nominal / inflation_factor,
            nominal,
            inflation_factor,
        }
    }
}

// ============================================================================
// Sweep summaries
// ============================================================================

/// Result of one start year in a historical sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub start_year: i16,
    pub succeeded: bool,
    pub first_failure: Option<usize>,
    pub estate: Estate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSweep {
    /// Completed start years, ascending
    pub outcomes: Vec<SweepOutcome>,
    pub requested: usize,
    pub cancelled: bool,
}

impl HistoricalSweep {
    #[must_use]
    pub fn get(&self, start_year: i16) -> Option<&SweepOutcome> {
        self.outcomes.iter().find(|o| o.start_year == start_year)
    }

    #[must_use]
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    /// Start years whose scenario ran out of money
    #[must_use]
    pub fn failures(&self) -> Vec<i16> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| o.start_year)
            .collect()
    }

    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.successes() as f64 / self.outcomes.len() as f64
    }

    #[must_use]
    pub fn mean_estate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().map(|o| o.estate.value).sum::<f64>() / self.outcomes.len() as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub requested: usize,
    pub completed: usize,
    pub successes: usize,
    /// Estate values of completed scenarios, ascending
    pub estates: Vec<f64>,
    pub cancelled: bool,
}

impl MonteCarloSummary {
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.completed == 0 {
            return 0.0;
        }
        self.successes as f64 / self.completed as f64
    }

    #[must_use]
    pub fn mean_estate(&self) -> f64 {
        if self.estates.is_empty() {
            return 0.0;
        }
        self.estates.iter().sum::<f64>() / self.estates.len() as f64
    }

    /// Nearest-rank percentile of estate values, `p` in [0, 1]
    #[must_use]
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.estates.is_empty() {
            return None;
        }
        let idx = ((self.estates.len() as f64 * p).ceil() as usize).saturating_sub(1);
        self.estates.get(idx.min(self.estates.len() - 1)).copied()
    }
}
