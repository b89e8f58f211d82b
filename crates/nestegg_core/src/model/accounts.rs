//! Account balances and the per-household ledger
//!
//! Each individual holds exactly one balance per tax treatment. Balances never
//! go negative: debits clamp at zero and report what was actually taken.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::market::RateSet;

/// Tax treatment for an account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaxStatus {
    /// Regular brokerage - principal withdrawals are not taxed
    Taxable,
    /// 401k, Traditional IRA - withdrawals taxed as ordinary income
    TaxDeferred,
    /// Roth IRA, Roth 401k - withdrawals tax-free
    TaxFree,
}

/// Withdrawal waterfall order
pub const TAX_STATUSES: [TaxStatus; 3] =
    [TaxStatus::Taxable, TaxStatus::TaxDeferred, TaxStatus::TaxFree];

/// One amount per tax treatment
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    pub taxable: f64,
    pub tax_deferred: f64,
    pub tax_free: f64,
}

impl Balances {
    #[must_use]
    pub const fn new(taxable: f64, tax_deferred: f64, tax_free: f64) -> Self {
        Self {
            taxable,
            tax_deferred,
            tax_free,
        }
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.taxable + self.tax_deferred + self.tax_free
    }

    /// Element-wise sum
    #[must_use]
    pub fn plus(&self, other: &Balances) -> Balances {
        Balances::new(
            self.taxable + other.taxable,
            self.tax_deferred + other.tax_deferred,
            self.tax_free + other.tax_free,
        )
    }
}

impl Index<TaxStatus> for Balances {
    type Output = f64;

    fn index(&self, status: TaxStatus) -> &f64 {
        match status {
            TaxStatus::Taxable => &self.taxable,
            TaxStatus::TaxDeferred => &self.tax_deferred,
            TaxStatus::TaxFree => &self.tax_free,
        }
    }
}

impl IndexMut<TaxStatus> for Balances {
    fn index_mut(&mut self, status: TaxStatus) -> &mut f64 {
        match status {
            TaxStatus::Taxable => &mut self.taxable,
            TaxStatus::TaxDeferred => &mut self.tax_deferred,
            TaxStatus::TaxFree => &mut self.tax_free,
        }
    }
}

/// Per-account weight vectors for one individual, indexed like [`Balances`]
pub type AccountWeights = [[f64; 4]; 3];

#[must_use]
pub(crate) const fn slot(status: TaxStatus) -> usize {
    match status {
        TaxStatus::Taxable => 0,
        TaxStatus::TaxDeferred => 1,
        TaxStatus::TaxFree => 2,
    }
}

/// Household balances, one [`Balances`] per individual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLedger {
    balances: Vec<Balances>,
}

impl AccountLedger {
    #[must_use]
    pub fn new(balances: Vec<Balances>) -> Self {
        Self { balances }
    }

    #[must_use]
    pub fn owners(&self) -> usize {
        self.balances.len()
    }

    #[must_use]
    pub fn balance(&self, owner: usize, status: TaxStatus) -> f64 {
        self.balances[owner][status]
    }

    #[must_use]
    pub fn balances(&self, owner: usize) -> Balances {
        self.balances[owner]
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Balances> {
        self.balances.clone()
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.balances.iter().map(Balances::total).sum()
    }

    /// Grow every balance by its account's weighted return, compounded once.
    /// A return below -100% empties the account rather than driving it
    /// negative. Returns the total growth credited.
    pub fn apply_growth(&mut self, rates: &RateSet, weights: &[AccountWeights]) -> f64 {
        let mut growth = 0.0;
        for (balances, w) in self.balances.iter_mut().zip(weights) {
            for status in TAX_STATUSES {
                let before = balances[status];
                let after = (before * (1.0 + rates.portfolio_return(&w[slot(status)]))).max(0.0);
                balances[status] = after;
                growth += after - before;
            }
        }
        growth
    }

    pub fn credit(&mut self, owner: usize, status: TaxStatus, amount: f64) {
        if amount > 0.0 {
            self.balances[owner][status] += amount;
        }
    }

    /// Take up to `amount`; returns what was actually debited. Running dry is
    /// not an error, callers compare the result against the request.
    pub fn debit(&mut self, owner: usize, status: TaxStatus, amount: f64) -> f64 {
        if amount <= 0.0 {
            return 0.0;
        }
        let balance = &mut self.balances[owner][status];
        let taken = amount.min(*balance);
        *balance -= taken;
        if *balance < 1e-9 {
            *balance = 0.0;
        }
        taken
    }

    /// Move one individual's balances to a survivor. `fractions` gives the
    /// share of each account the survivor keeps; the rest leaves the household.
    pub fn bequeath(&mut self, from: usize, to: usize, fractions: &Balances) {
        let estate = self.balances[from];
        for status in TAX_STATUSES {
            self.balances[to][status] += estate[status] * fractions[status];
        }
        self.balances[from] = Balances::default();
    }
}
