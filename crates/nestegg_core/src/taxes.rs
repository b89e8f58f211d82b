//! Federal income tax and Medicare IRMAA surcharge
//!
//! Brackets, deductions and IRMAA thresholds are first carried from the
//! tables' base year to the plan start year, then scaled by the cumulative
//! inflation factor realized along the simulated rate path. The bracket
//! regime switches at the TCJA sunset year.

use serde::{Deserialize, Serialize};

use crate::model::{FilingStatus, TaxBracket, TaxRegime, TaxTables};

/// Calculate federal income tax using progressive brackets whose thresholds
/// are multiplied by `scale`. Returns the total tax owed on `income`.
pub fn calculate_federal_tax(income: f64, brackets: &[TaxBracket], scale: f64) -> f64 {
    if income <= 0.0 || brackets.is_empty() {
        return 0.0;
    }

    let mut tax = 0.0;
    for (i, bracket) in brackets.iter().enumerate() {
        let lower = bracket.threshold * scale;
        if income <= lower {
            break;
        }
        let upper = brackets
            .get(i + 1)
            .map_or(f64::INFINITY, |b| b.threshold * scale);
        tax += (income.min(upper) - lower) * bracket.rate;
    }

    tax
}

/// Tax on `additional_income` stacked on top of `base_income`
pub fn calculate_federal_marginal_tax(
    additional_income: f64,
    base_income: f64,
    brackets: &[TaxBracket],
    scale: f64,
) -> f64 {
    calculate_federal_tax(base_income + additional_income, brackets, scale)
        - calculate_federal_tax(base_income, brackets, scale)
}

/// Gross income components entering one year's return
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeComponents {
    /// Wages, already net of tax-deferred contributions
    pub wages: f64,
    pub pension: f64,
    /// Total benefits received; only the taxable share is included
    pub social_security: f64,
    /// Ordinary and required distributions from tax-deferred accounts
    pub tax_deferred_distributions: f64,
    pub roth_conversions: f64,
}

impl IncomeComponents {
    /// Adjusted gross income given the taxable share of social security
    #[must_use]
    pub fn adjusted_gross_income(&self, social_security_share: f64) -> f64 {
        self.wages
            + self.pension
            + social_security_share * self.social_security
            + self.tax_deferred_distributions
            + self.roth_conversions
    }
}

/// Facts about the household and the rate path for one tax year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxYear {
    pub year: i16,
    pub status: FilingStatus,
    /// Living filers at or past Medicare age
    pub seniors: usize,
    /// Realized inflation from plan start through the prior year
    pub inflation_factor: f64,
    /// Income the IRMAA determination looks back to, if any
    pub irmaa_magi: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub adjusted_gross_income: f64,
    pub deduction: f64,
    pub taxable_income: f64,
    pub federal_tax: f64,
    /// Federal rate on the next hundred dollars of ordinary income
    pub marginal_rate: f64,
    pub irmaa: f64,
}

impl TaxAssessment {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.federal_tax + self.irmaa
    }
}

/// Computes federal tax and IRMAA against a fixed set of tables
#[derive(Debug, Clone, Copy)]
pub struct TaxEngine<'a> {
    tables: &'a TaxTables,
    /// Base-year to plan-start index
    start_index: f64,
}

impl<'a> TaxEngine<'a> {
    /// Engine reading the tables in their own base-year dollars
    #[must_use]
    pub fn new(tables: &'a TaxTables) -> Self {
        Self {
            tables,
            start_index: 1.0,
        }
    }

    /// Engine for a plan starting in `start_year`
    #[must_use]
    pub fn starting_in(tables: &'a TaxTables, start_year: i16) -> Self {
        Self {
            tables,
            start_index: tables.index_factor(start_year),
        }
    }

    /// Multiplier applied to every table amount in this tax year
    #[must_use]
    pub fn scale(&self, ctx: &TaxYear) -> f64 {
        self.start_index * ctx.inflation_factor
    }

    #[must_use]
    pub fn tables(&self) -> &'a TaxTables {
        self.tables
    }

    #[must_use]
    pub fn regime(&self, year: i16) -> TaxRegime {
        self.tables.regime(year)
    }

    /// Standard deduction including the per-senior addition
    #[must_use]
    pub fn standard_deduction(&self, ctx: &TaxYear) -> f64 {
        let regime = self.tables.regime_tables(self.regime(ctx.year));
        let base = *regime.standard_deduction.get(ctx.status);
        let senior = *self.tables.senior_deduction.get(ctx.status) * ctx.seniors as f64;
        (base + senior) * self.scale(ctx)
    }

    /// Federal tax on an adjusted gross income
    #[must_use]
    pub fn federal_tax(&self, agi: f64, ctx: &TaxYear) -> f64 {
        let regime = self.tables.regime_tables(self.regime(ctx.year));
        let taxable = agi - self.standard_deduction(ctx);
        calculate_federal_tax(taxable, regime.brackets.get(ctx.status), self.scale(ctx))
    }

    /// Federal rate on the next hundred dollars above `agi`
    #[must_use]
    pub fn marginal_rate(&self, agi: f64, ctx: &TaxYear) -> f64 {
        const PROBE: f64 = 100.0;
        let regime = self.tables.regime_tables(self.regime(ctx.year));
        let taxable = agi - self.standard_deduction(ctx);
        calculate_federal_marginal_tax(
            PROBE,
            taxable,
            regime.brackets.get(ctx.status),
            self.scale(ctx),
        ) / PROBE
    }

    /// Annual surcharge for every enrolled person, stepped on MAGI
    #[must_use]
    pub fn irmaa(&self, magi: f64, ctx: &TaxYear) -> f64 {
        if ctx.seniors == 0 {
            return 0.0;
        }
        let scale = self.scale(ctx);
        let per_person = self
            .tables
            .irmaa
            .get(ctx.status)
            .iter()
            .rev()
            .find(|tier| magi >= tier.threshold * scale)
            .map_or(0.0, |tier| tier.annual_surcharge);
        per_person * scale * ctx.seniors as f64
    }

    pub fn compute_tax(&self, components: &IncomeComponents, ctx: &TaxYear) -> TaxAssessment {
        let agi =
            components.adjusted_gross_income(self.tables.social_security_taxable_share);
        let deduction = self.standard_deduction(ctx);
        TaxAssessment {
            adjusted_gross_income: agi,
            deduction,
            taxable_income: (agi - deduction).max(0.0),
            federal_tax: self.federal_tax(agi, ctx),
            marginal_rate: self.marginal_rate(agi, ctx),
            irmaa: ctx.irmaa_magi.map_or(0.0, |magi| self.irmaa(magi, ctx)),
        }
    }
}
