//! Plan Builder
//!
//! Fluent construction of a [`PlanConfig`]. Setters never fail; every check
//! runs in [`PlanBuilder::build`], so a plan either validates completely or is
//! not produced at all.
//!
//! # Example
//!
//! ```ignore
//! use nestegg_core::config::{Individual, PlanBuilder, DesiredIncome, SpousalSplit};
//! use nestegg_core::allocation::AllocationPolicy;
//!
//! let plan = PlanBuilder::new()
//!     .individual(
//!         Individual::new("Alex", 1960, 92)
//!             .taxable(250_000.0)
//!             .tax_deferred(800_000.0)
//!             .social_security(32_000.0, 67),
//!     )
//!     .individual(Individual::new("Sam", 1962, 95).tax_free(150_000.0))
//!     .allocation(AllocationPolicy::constant([0.6, 0.1, 0.3, 0.0], 2))
//!     .desired_income(DesiredIncome::smile(90_000.0))
//!     .spousal_split(SpousalSplit::Auto)
//!     .build()?;
//! ```

use super::{DesiredIncome, Individual, PlanConfig, SpousalSplit};
use crate::allocation::AllocationPolicy;
use crate::error::ConfigError;
use crate::model::{
    ContributionRecord, ContributionSchedule, RateMode, RateProvider, RmdTable, TaxTables,
    history,
};

const MAX_INDIVIDUALS: usize = 2;

/// Builder for [`PlanConfig`]
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    start_year: Option<i16>,
    individuals: Vec<Individual>,
    schedules: Vec<(usize, ContributionSchedule)>,
    allocation: Option<AllocationPolicy>,
    desired_income: DesiredIncome,
    spousal_split: SpousalSplit,
    heirs_tax_rate: f64,
    rate_mode: RateMode,
    tax_tables: TaxTables,
    rmd_table: RmdTable,
    prior_magi: Option<f64>,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanBuilder {
    pub const DEFAULT_HEIRS_TAX_RATE: f64 = 0.25;
    /// Held by every account when no allocation is given
    pub const DEFAULT_WEIGHTS: [f64; 4] = [0.5, 0.0, 0.5, 0.0];

    #[must_use]
    pub fn new() -> Self {
        Self {
            start_year: None,
            individuals: Vec::new(),
            schedules: Vec::new(),
            allocation: None,
            desired_income: DesiredIncome::default(),
            spousal_split: SpousalSplit::Auto,
            heirs_tax_rate: Self::DEFAULT_HEIRS_TAX_RATE,
            rate_mode: RateMode::Average {
                from: history::FIRST_YEAR,
                to: history::LAST_YEAR,
            },
            tax_tables: TaxTables::default(),
            rmd_table: RmdTable::default(),
            prior_magi: None,
        }
    }

    // =========================================================================
    // Household
    // =========================================================================

    /// Pin the first simulated year (defaults to the current year)
    #[must_use]
    pub fn start_year(mut self, year: i16) -> Self {
        self.start_year = Some(year);
        self
    }

    /// Add an individual; the first added is the "first-listed spouse"
    #[must_use]
    pub fn individual(mut self, individual: Individual) -> Self {
        self.individuals.push(individual);
        self
    }

    /// Contribution schedule for the individual at `owner`
    #[must_use]
    pub fn schedule(mut self, owner: usize, schedule: ContributionSchedule) -> Self {
        self.schedules.push((owner, schedule));
        self
    }

    /// Set a single year of an individual's schedule
    #[must_use]
    pub fn contribution(mut self, owner: usize, year: i16, record: ContributionRecord) -> Self {
        let mut schedule = ContributionSchedule::new();
        schedule.set(year, record);
        self.schedules.push((owner, schedule));
        self
    }

    // =========================================================================
    // Assumptions
    // =========================================================================

    #[must_use]
    pub fn allocation(mut self, policy: AllocationPolicy) -> Self {
        self.allocation = Some(policy);
        self
    }

    #[must_use]
    pub fn desired_income(mut self, income: DesiredIncome) -> Self {
        self.desired_income = income;
        self
    }

    #[must_use]
    pub fn spousal_split(mut self, split: SpousalSplit) -> Self {
        self.spousal_split = split;
        self
    }

    #[must_use]
    pub fn heirs_tax_rate(mut self, rate: f64) -> Self {
        self.heirs_tax_rate = rate;
        self
    }

    #[must_use]
    pub fn rate_mode(mut self, mode: RateMode) -> Self {
        self.rate_mode = mode;
        self
    }

    #[must_use]
    pub fn tax_tables(mut self, tables: TaxTables) -> Self {
        self.tax_tables = tables;
        self
    }

    #[must_use]
    pub fn rmd_table(mut self, table: RmdTable) -> Self {
        self.rmd_table = table;
        self
    }

    /// MAGI assumed for the two years before plan start, for IRMAA
    #[must_use]
    pub fn prior_magi(mut self, magi: f64) -> Self {
        self.prior_magi = Some(magi);
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Validate everything and produce the plan
    pub fn build(self) -> Result<PlanConfig, ConfigError> {
        let start_year = self
            .start_year
            .unwrap_or_else(|| jiff::Zoned::now().year());

        match self.individuals.len() {
            0 => return Err(ConfigError::NoIndividuals),
            n if n > MAX_INDIVIDUALS => return Err(ConfigError::TooManyIndividuals(n)),
            _ => {}
        }
        for individual in &self.individuals {
            validate_individual(individual, start_year)?;
        }

        let count = self.individuals.len();
        let mut schedules = vec![ContributionSchedule::new(); count];
        for (owner, schedule) in self.schedules {
            schedule.validate()?;
            let target = schedules
                .get_mut(owner)
                .ok_or(ConfigError::UnknownScheduleOwner(owner))?;
            target.records.extend(schedule.records);
        }

        let allocation = self
            .allocation
            .unwrap_or_else(|| AllocationPolicy::constant(Self::DEFAULT_WEIGHTS, count));
        allocation.validate(count)?;

        validate_amount("desired income", self.desired_income.amount)?;
        validate_fraction("survivor fraction", self.desired_income.survivor_fraction)?;
        if let SpousalSplit::Fixed(f) = self.spousal_split {
            validate_fraction("spousal split", f)?;
        }
        validate_fraction("heirs tax rate", self.heirs_tax_rate)?;
        if let Some(magi) = self.prior_magi {
            validate_amount("prior MAGI", magi)?;
        }
        validate_fraction("assumed tax-table inflation", self.tax_tables.assumed_inflation)?;

        validate_rate_mode(&self.rate_mode)?;
        let rates = RateProvider::new(&self.rate_mode)?;

        tracing::debug!(
            start_year,
            individuals = count,
            mode = ?self.rate_mode,
            "plan validated"
        );

        Ok(PlanConfig {
            start_year,
            individuals: self.individuals,
            schedules,
            allocation,
            desired_income: self.desired_income,
            spousal_split: self.spousal_split,
            heirs_tax_rate: self.heirs_tax_rate,
            rate_mode: self.rate_mode,
            tax_tables: self.tax_tables,
            rmd_table: self.rmd_table,
            prior_magi: self.prior_magi,
            rates,
        })
    }
}

fn validate_individual(p: &Individual, start_year: i16) -> Result<(), ConfigError> {
    if p.birth_year > start_year {
        return Err(ConfigError::BirthYearAfterStart {
            name: p.name.clone(),
            birth_year: p.birth_year,
            start_year,
        });
    }
    if p.final_year() < start_year {
        return Err(ConfigError::PastLifeExpectancy {
            name: p.name.clone(),
            life_expectancy: p.life_expectancy,
            start_year,
        });
    }
    let accounts = [
        ("taxable", &p.accounts.taxable),
        ("tax-deferred", &p.accounts.tax_deferred),
        ("tax-free", &p.accounts.tax_free),
    ];
    for (field, account) in accounts {
        validate_amount(field, account.balance)?;
        validate_fraction(field, account.beneficiary_fraction)?;
    }
    if let Some(pension) = &p.pension {
        validate_amount("pension", pension.amount)?;
    }
    if let Some(ss) = &p.social_security {
        validate_amount("social security", ss.amount)?;
    }
    Ok(())
}

pub(super) fn validate_amount(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeAmount { field, value })
    }
}

pub(super) fn validate_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { field, value })
    }
}

pub(super) fn validate_rate_mode(mode: &RateMode) -> Result<(), ConfigError> {
    match mode {
        RateMode::Fixed { rates } | RateMode::Realistic { rates } if !rates.is_finite() => {
            Err(ConfigError::NonFiniteRates)
        }
        _ => Ok(mode.validate()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RateSet;

    fn retiree() -> Individual {
        Individual::new("Alex", 1962, 93).tax_free(1_000_000.0)
    }

    #[test]
    fn test_requires_individuals() {
        let err = PlanBuilder::new().start_year(2025).build().unwrap_err();
        assert_eq!(err, ConfigError::NoIndividuals);
    }

    #[test]
    fn test_rejects_third_individual() {
        let err = PlanBuilder::new()
            .start_year(2025)
            .individual(retiree())
            .individual(retiree())
            .individual(retiree())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::TooManyIndividuals(3));
    }

    #[test]
    fn test_rejects_negative_balance() {
        let err = PlanBuilder::new()
            .start_year(2025)
            .individual(Individual::new("Alex", 1962, 93).taxable(-1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NegativeAmount { field: "taxable", .. }));
    }

    #[test]
    fn test_rejects_window_outside_history() {
        let err = PlanBuilder::new()
            .start_year(2025)
            .individual(retiree())
            .rate_mode(RateMode::Historical {
                from: 1900,
                to: None,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::RateRange(_)));
    }

    #[test]
    fn test_rejects_non_finite_fixed_rates() {
        let err = PlanBuilder::new()
            .start_year(2025)
            .individual(retiree())
            .rate_mode(RateMode::Fixed {
                rates: RateSet::new(f64::NAN, 0.0, 0.0, 0.0),
            })
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::NonFiniteRates);
    }

    #[test]
    fn test_schedule_for_unknown_owner() {
        let err = PlanBuilder::new()
            .start_year(2025)
            .individual(retiree())
            .contribution(1, 2025, ContributionRecord::default())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownScheduleOwner(1));
    }

    #[test]
    fn test_horizon_runs_through_last_survivor() {
        let plan = PlanBuilder::new()
            .start_year(2025)
            .individual(Individual::new("A", 1962, 93))
            .individual(Individual::new("B", 1965, 93))
            .build()
            .unwrap();
        assert_eq!(plan.end_year(), 2058);
        assert_eq!(plan.horizon(), 34);
    }

    #[test]
    fn test_contributions_merge_per_owner() {
        let record = ContributionRecord {
            taxable: 1_000.0,
            ..Default::default()
        };
        let plan = PlanBuilder::new()
            .start_year(2025)
            .individual(retiree())
            .contribution(0, 2025, record)
            .contribution(0, 2026, record)
            .build()
            .unwrap();
        assert_eq!(plan.schedules()[0].records.len(), 2);
    }
}
