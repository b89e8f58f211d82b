//! Plan configuration
//!
//! `PlanConfig` is the complete, validated input to a simulation. It is only
//! produced by [`PlanBuilder`], so every value reaching the engine has passed
//! validation. Derived plans (a different rate mode, a trial conversion
//! schedule) are new values built from an existing one with the `with_*`
//! helpers; nothing is shared between a plan and its derivatives.
//!
//! ```ignore
//! use nestegg_core::config::{Individual, PlanBuilder, DesiredIncome};
//! use nestegg_core::model::RateMode;
//!
//! let plan = PlanBuilder::new()
//!     .start_year(2025)
//!     .individual(Individual::new("Alex", 1962, 93).tax_free(1_000_000.0))
//!     .desired_income(DesiredIncome::flat(40_000.0))
//!     .rate_mode(RateMode::Historical { from: 1966, to: None })
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationPolicy;
use crate::error::ConfigError;
use crate::model::{
    Balances, ContributionSchedule, RateMode, RateProvider, RmdTable, TaxTables,
};

pub mod builder;

pub use builder::PlanBuilder;

// ============================================================================
// Household
// ============================================================================

/// One account of an individual
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountSpec {
    pub balance: f64,
    /// Share the surviving spouse keeps when the owner dies
    pub beneficiary_fraction: f64,
}

impl Default for AccountSpec {
    fn default() -> Self {
        Self {
            balance: 0.0,
            beneficiary_fraction: 1.0,
        }
    }
}

/// The three accounts every individual holds, by tax treatment
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSet {
    pub taxable: AccountSpec,
    pub tax_deferred: AccountSpec,
    pub tax_free: AccountSpec,
}

impl AccountSet {
    #[must_use]
    pub fn balances(&self) -> Balances {
        Balances::new(
            self.taxable.balance,
            self.tax_deferred.balance,
            self.tax_free.balance,
        )
    }

    #[must_use]
    pub fn beneficiary_fractions(&self) -> Balances {
        Balances::new(
            self.taxable.beneficiary_fraction,
            self.tax_deferred.beneficiary_fraction,
            self.tax_free.beneficiary_fraction,
        )
    }
}

/// An annual benefit paid from `start_age` for life
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Benefit {
    pub amount: f64,
    pub start_age: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub name: String,
    pub birth_year: i16,
    /// Age through which the individual is simulated
    pub life_expectancy: u16,
    pub accounts: AccountSet,
    /// Nominal, never indexed
    pub pension: Option<Benefit>,
    /// Indexed by realized inflation from the first benefit year
    pub social_security: Option<Benefit>,
}

impl Individual {
    #[must_use]
    pub fn new(name: impl Into<String>, birth_year: i16, life_expectancy: u16) -> Self {
        Self {
            name: name.into(),
            birth_year,
            life_expectancy,
            accounts: AccountSet::default(),
            pension: None,
            social_security: None,
        }
    }

    #[must_use]
    pub fn taxable(mut self, balance: f64) -> Self {
        self.accounts.taxable.balance = balance;
        self
    }

    #[must_use]
    pub fn tax_deferred(mut self, balance: f64) -> Self {
        self.accounts.tax_deferred.balance = balance;
        self
    }

    #[must_use]
    pub fn tax_free(mut self, balance: f64) -> Self {
        self.accounts.tax_free.balance = balance;
        self
    }

    /// Share of each account passing to a surviving spouse
    #[must_use]
    pub fn beneficiary_fractions(mut self, taxable: f64, tax_deferred: f64, tax_free: f64) -> Self {
        self.accounts.taxable.beneficiary_fraction = taxable;
        self.accounts.tax_deferred.beneficiary_fraction = tax_deferred;
        self.accounts.tax_free.beneficiary_fraction = tax_free;
        self
    }

    #[must_use]
    pub fn pension(mut self, amount: f64, start_age: u16) -> Self {
        self.pension = Some(Benefit { amount, start_age });
        self
    }

    #[must_use]
    pub fn social_security(mut self, amount: f64, start_age: u16) -> Self {
        self.social_security = Some(Benefit { amount, start_age });
        self
    }

    /// Last calendar year the individual is alive
    #[must_use]
    pub fn final_year(&self) -> i16 {
        self.birth_year.saturating_add(self.life_expectancy as i16)
    }

    #[must_use]
    pub fn is_alive(&self, year: i16) -> bool {
        year >= self.birth_year && year <= self.final_year()
    }

    #[must_use]
    pub fn age_in(&self, year: i16) -> u16 {
        (year - self.birth_year).max(0) as u16
    }

    /// Calendar year a benefit starting at `start_age` begins
    #[must_use]
    pub fn year_at_age(&self, age: u16) -> i16 {
        self.birth_year.saturating_add(age as i16)
    }
}

// ============================================================================
// Income target
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeProfile {
    /// Constant real spending
    #[default]
    Flat,
    /// Real spending that dips through the middle of retirement
    Smile,
}

/// Multipliers for ages 65 through 100
const SMILE_CURVE: [f64; 36] = [
    1.000, 1.010, 1.015, 1.010, 1.000, 0.993, 0.978, 0.960, 0.940, 0.918, // 65-74
    0.895, 0.871, 0.848, 0.825, 0.804, 0.785, 0.769, 0.757, 0.748, 0.744, // 75-84
    0.745, 0.752, 0.766, 0.787, 0.815, 0.852, 0.899, 0.955, 1.021, 1.059, // 85-94
    1.100, 1.121, 1.141, 1.151, 1.161, 1.171, // 95-100
];
const SMILE_FIRST_AGE: u16 = 65;

impl IncomeProfile {
    /// Multiplier on the real income target at `age`
    #[must_use]
    pub fn factor(&self, age: u16) -> f64 {
        match self {
            IncomeProfile::Flat => 1.0,
            IncomeProfile::Smile => {
                if age <= SMILE_FIRST_AGE {
                    return 1.0;
                }
                let i = usize::from(age - SMILE_FIRST_AGE).min(SMILE_CURVE.len() - 1);
                SMILE_CURVE[i]
            }
        }
    }
}

/// Desired after-tax household income in plan-start dollars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesiredIncome {
    pub amount: f64,
    pub profile: IncomeProfile,
    /// Share of the couple's target kept once one spouse has died
    pub survivor_fraction: f64,
}

impl DesiredIncome {
    pub const DEFAULT_SURVIVOR_FRACTION: f64 = 0.6;

    #[must_use]
    pub fn flat(amount: f64) -> Self {
        Self {
            amount,
            profile: IncomeProfile::Flat,
            survivor_fraction: Self::DEFAULT_SURVIVOR_FRACTION,
        }
    }

    #[must_use]
    pub fn smile(amount: f64) -> Self {
        Self {
            profile: IncomeProfile::Smile,
            ..Self::flat(amount)
        }
    }

    #[must_use]
    pub fn with_survivor_fraction(mut self, fraction: f64) -> Self {
        self.survivor_fraction = fraction;
        self
    }
}

impl Default for DesiredIncome {
    fn default() -> Self {
        Self::flat(0.0)
    }
}

/// How a joint withdrawal need is divided between two spouses
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpousalSplit {
    /// Proportional to balances in the accounts the need will reach
    #[default]
    Auto,
    /// Fraction drawn from the first-listed spouse
    Fixed(f64),
}

// ============================================================================
// PlanConfig
// ============================================================================

/// Complete, validated input to a simulation
#[derive(Debug, Clone, Serialize)]
pub struct PlanConfig {
    pub(crate) start_year: i16,
    pub(crate) individuals: Vec<Individual>,
    /// One per individual, same order
    pub(crate) schedules: Vec<ContributionSchedule>,
    pub(crate) allocation: AllocationPolicy,
    pub(crate) desired_income: DesiredIncome,
    pub(crate) spousal_split: SpousalSplit,
    pub(crate) heirs_tax_rate: f64,
    pub(crate) rate_mode: RateMode,
    pub(crate) tax_tables: TaxTables,
    pub(crate) rmd_table: RmdTable,
    /// MAGI assumed for the two years before plan start
    pub(crate) prior_magi: Option<f64>,
    #[serde(skip)]
    pub(crate) rates: RateProvider,
}

impl PlanConfig {
    #[must_use]
    pub fn start_year(&self) -> i16 {
        self.start_year
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    #[must_use]
    pub fn schedules(&self) -> &[ContributionSchedule] {
        &self.schedules
    }

    #[must_use]
    pub fn allocation(&self) -> &AllocationPolicy {
        &self.allocation
    }

    #[must_use]
    pub fn desired_income(&self) -> &DesiredIncome {
        &self.desired_income
    }

    #[must_use]
    pub fn spousal_split(&self) -> SpousalSplit {
        self.spousal_split
    }

    #[must_use]
    pub fn heirs_tax_rate(&self) -> f64 {
        self.heirs_tax_rate
    }

    #[must_use]
    pub fn rate_mode(&self) -> &RateMode {
        &self.rate_mode
    }

    #[must_use]
    pub fn tax_tables(&self) -> &TaxTables {
        &self.tax_tables
    }

    #[must_use]
    pub fn rmd_table(&self) -> &RmdTable {
        &self.rmd_table
    }

    #[must_use]
    pub fn prior_magi(&self) -> Option<f64> {
        self.prior_magi
    }

    /// Last calendar year simulated: the last survivor's final year
    #[must_use]
    pub fn end_year(&self) -> i16 {
        self.individuals
            .iter()
            .map(Individual::final_year)
            .max()
            .unwrap_or(self.start_year)
    }

    /// Number of simulated years, plan start through `end_year` inclusive
    #[must_use]
    pub fn horizon(&self) -> usize {
        (self.end_year() - self.start_year + 1).max(0) as usize
    }

    #[must_use]
    pub fn initial_balances(&self) -> Vec<Balances> {
        self.individuals.iter().map(|p| p.accounts.balances()).collect()
    }

    /// Requested conversions per individual, one entry per simulated year
    #[must_use]
    pub fn roth_conversions(&self) -> Vec<Vec<f64>> {
        self.schedules
            .iter()
            .map(|schedule| {
                (0..self.horizon())
                    .map(|i| schedule.get(self.start_year + i as i16).roth_conversion)
                    .collect()
            })
            .collect()
    }

    // === Derived plans ===

    /// Same plan under a different rate mode
    pub fn with_rate_mode(&self, mode: RateMode) -> Result<Self, ConfigError> {
        builder::validate_rate_mode(&mode)?;
        let mut plan = self.clone();
        plan.rates = RateProvider::new(&mode)?;
        plan.rate_mode = mode;
        Ok(plan)
    }

    /// Same plan with the conversion request of every simulated year replaced.
    /// `conversions[i][n]` is individual `i`'s conversion in year index `n`;
    /// missing entries read as zero and negative amounts are clamped.
    #[must_use]
    pub fn with_roth_conversions(&self, conversions: &[Vec<f64>]) -> Self {
        let mut plan = self.clone();
        let horizon = plan.horizon();
        for (owner, schedule) in plan.schedules.iter_mut().enumerate() {
            let row = conversions.get(owner).map_or(&[][..], Vec::as_slice);
            for n in 0..horizon {
                let amount = row.get(n).copied().unwrap_or(0.0).max(0.0);
                schedule.set_roth_conversion(self.start_year + n as i16, amount);
            }
        }
        plan
    }
}
