//! YAML plan files
//!
//! The on-disk format is a flat, human-editable description of a household.
//! It is parsed into the `*Data` types below and converted into a validated
//! [`PlanConfig`] through [`PlanBuilder`]; every rule lives in the builder.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{WrapErr, eyre};
use serde::{Deserialize, Serialize};

use nestegg_core::allocation::{
    AccountPaths, AllocationPlan, AllocationPolicy, GlidePath, Interpolation,
};
use nestegg_core::config::{
    DesiredIncome, IncomeProfile, Individual, PlanBuilder, PlanConfig, SpousalSplit,
};
use nestegg_core::model::{ContributionRecord, RateMode, RateSet};

/// A complete plan in human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
    /// First simulated year (default: the current year)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i16>,

    pub individuals: Vec<IndividualData>,

    pub income: IncomeData,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationData>,

    /// Share of joint withdrawals taken from the first individual. Omit to
    /// split by balances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spousal_split: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heirs_tax_rate: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rates: Option<RatesData>,

    /// MAGI for the two years before the plan starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_magi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualData {
    pub name: String,
    pub birth_year: i16,
    pub life_expectancy: u16,

    #[serde(default)]
    pub taxable: f64,
    #[serde(default)]
    pub tax_deferred: f64,
    #[serde(default)]
    pub tax_free: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_fractions: Option<FractionsData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pension: Option<BenefitData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_security: Option<BenefitData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributions: Vec<ContributionData>,
}

/// Share of each account passed to a surviving spouse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractionsData {
    #[serde(default = "one")]
    pub taxable: f64,
    #[serde(default = "one")]
    pub tax_deferred: f64,
    #[serde(default = "one")]
    pub tax_free: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenefitData {
    pub amount: f64,
    pub start_age: u16,
}

/// One year of planned flows. Omitted amounts are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionData {
    pub year: i16,
    #[serde(default)]
    pub wages: f64,
    #[serde(default)]
    pub taxable: f64,
    #[serde(default)]
    pub traditional_401k: f64,
    #[serde(default)]
    pub roth_401k: f64,
    #[serde(default)]
    pub traditional_ira: f64,
    #[serde(default)]
    pub roth_ira: f64,
    #[serde(default)]
    pub roth_conversion: f64,
    #[serde(default)]
    pub big_ticket_item: f64,
}

impl ContributionData {
    fn record(&self) -> ContributionRecord {
        ContributionRecord {
            wages: self.wages,
            taxable: self.taxable,
            traditional_401k: self.traditional_401k,
            roth_401k: self.roth_401k,
            traditional_ira: self.traditional_ira,
            roth_ira: self.roth_ira,
            roth_conversion: self.roth_conversion,
            big_ticket_item: self.big_ticket_item,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncomeData {
    /// After-tax household income in plan-start dollars
    pub amount: f64,
    #[serde(default)]
    pub profile: IncomeProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survivor_fraction: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coordination {
    /// Every account follows the path on its own
    #[default]
    Accounts,
    /// Packed across each individual's accounts
    Individual,
    /// Packed across the whole household
    Household,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationKind {
    #[default]
    Linear,
    SCurve,
}

/// Glide path as `[equity, corporate bonds, T-notes, inflation-tracking]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationData {
    #[serde(default)]
    pub coordination: Coordination,
    pub initial: [f64; 4],
    /// Weights in the final year (default: same as `initial`)
    #[serde(
        rename = "final",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target: Option<[f64; 4]>,
    #[serde(default)]
    pub interpolation: InterpolationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steepness: Option<f64>,
}

impl AllocationData {
    fn policy(&self, individuals: usize) -> AllocationPolicy {
        let path = GlidePath::new(self.initial, self.target.unwrap_or(self.initial));
        let plan = match self.coordination {
            Coordination::Accounts => AllocationPlan::Accounts {
                paths: vec![AccountPaths::uniform(path); individuals],
            },
            Coordination::Individual => AllocationPlan::Individual {
                paths: vec![path; individuals],
            },
            Coordination::Household => AllocationPlan::Household { path },
        };
        let interpolation = match self.interpolation {
            InterpolationKind::Linear => Interpolation::Linear,
            InterpolationKind::SCurve => Interpolation::SCurve {
                steepness: self.steepness.unwrap_or(Interpolation::DEFAULT_STEEPNESS),
            },
        };
        AllocationPolicy::new(plan, interpolation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    Fixed,
    Average,
    Historical,
    Stochastic,
    Realistic,
}

/// Rate assumptions. `fixed` and `realistic` read `rates`; the other kinds
/// read the `from`/`to` window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatesData {
    pub kind: RateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<i16>,
    /// `[equity, corporate bonds, T-notes, inflation]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rates: Option<[f64; 4]>,
}

impl RatesData {
    fn mode(&self) -> color_eyre::Result<RateMode> {
        use nestegg_core::model::history::{FIRST_YEAR, LAST_YEAR};

        let from = self.from.unwrap_or(FIRST_YEAR);
        let rates = || {
            self.rates
                .map(RateSet::from_values)
                .ok_or_else(|| eyre!("rates of kind {:?} need a `rates` list", self.kind))
        };
        Ok(match self.kind {
            RateKind::Fixed => RateMode::Fixed { rates: rates()? },
            RateKind::Realistic => RateMode::Realistic { rates: rates()? },
            RateKind::Average => RateMode::Average {
                from,
                to: self.to.unwrap_or(LAST_YEAR),
            },
            RateKind::Historical => RateMode::Historical { from, to: self.to },
            RateKind::Stochastic => RateMode::Stochastic { from, to: self.to },
        })
    }
}

impl PlanFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    /// Read and parse a plan file
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read plan file {}", path.display()))?;
        Self::from_yaml(&content)
            .wrap_err_with(|| format!("Failed to parse plan file {}", path.display()))
    }

    /// Translate into a builder without validating
    pub fn to_builder(&self) -> color_eyre::Result<PlanBuilder> {
        let mut builder = PlanBuilder::new();
        if let Some(year) = self.start_year {
            builder = builder.start_year(year);
        }

        for (owner, data) in self.individuals.iter().enumerate() {
            let mut individual = Individual::new(&data.name, data.birth_year, data.life_expectancy)
                .taxable(data.taxable)
                .tax_deferred(data.tax_deferred)
                .tax_free(data.tax_free);
            if let Some(f) = data.beneficiary_fractions {
                individual = individual.beneficiary_fractions(f.taxable, f.tax_deferred, f.tax_free);
            }
            if let Some(p) = data.pension {
                individual = individual.pension(p.amount, p.start_age);
            }
            if let Some(ss) = data.social_security {
                individual = individual.social_security(ss.amount, ss.start_age);
            }
            builder = builder.individual(individual);
            for c in &data.contributions {
                builder = builder.contribution(owner, c.year, c.record());
            }
        }

        let mut income = match self.income.profile {
            IncomeProfile::Flat => DesiredIncome::flat(self.income.amount),
            IncomeProfile::Smile => DesiredIncome::smile(self.income.amount),
        };
        if let Some(fraction) = self.income.survivor_fraction {
            income = income.with_survivor_fraction(fraction);
        }
        builder = builder.desired_income(income);

        if let Some(allocation) = &self.allocation {
            builder = builder.allocation(allocation.policy(self.individuals.len()));
        }
        builder = builder.spousal_split(
            self.spousal_split
                .map_or(SpousalSplit::Auto, SpousalSplit::Fixed),
        );
        if let Some(rate) = self.heirs_tax_rate {
            builder = builder.heirs_tax_rate(rate);
        }
        if let Some(rates) = &self.rates {
            builder = builder.rate_mode(rates.mode()?);
        }
        if let Some(magi) = self.prior_magi {
            builder = builder.prior_magi(magi);
        }
        Ok(builder)
    }

    /// Validate into a plan ready to simulate
    pub fn build(&self) -> color_eyre::Result<PlanConfig> {
        let plan = self
            .to_builder()?
            .build()
            .wrap_err("Plan file failed validation")?;
        Ok(plan)
    }
}
