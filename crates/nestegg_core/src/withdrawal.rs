//! Withdrawal engine
//!
//! Required distributions, the spousal split of a withdrawal need, and the
//! prioritized waterfall (taxable, then tax-deferred, then tax-free). Every
//! draw is first computed as a [`Draw`] against a copy of the balances and
//! only then committed to the ledger, so the income solve can evaluate trial
//! withdrawals without side effects.

use crate::config::{Individual, SpousalSplit};
use crate::model::{AccountLedger, Balances, RmdTable, TAX_STATUSES, TaxStatus};

/// Iteration cap for the withdrawal solve
pub const MAX_SOLVE_ITERATIONS: usize = 64;
/// Net income within this distance of the target is considered met
pub const SOLVE_TOLERANCE: f64 = 0.01;
/// Residual below which a draw counts as fully funded
const FUNDED_EPSILON: f64 = 1e-6;

/// Take up to `amount` from `available` in waterfall order, reducing it.
/// Returns what was taken from each account.
pub fn waterfall(available: &mut Balances, amount: f64) -> Balances {
    let mut taken = Balances::default();
    let mut need = amount;
    for status in TAX_STATUSES {
        if need <= 0.0 {
            break;
        }
        let take = need.min(available[status]).max(0.0);
        available[status] -= take;
        taken[status] = take;
        need -= take;
    }
    taken
}

/// A withdrawal computed against the ledger but not yet applied
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    /// Amount taken per individual, indexed like the ledger
    pub per_owner: Vec<Balances>,
    /// Part of the request no account could fund
    pub unfunded: f64,
}

impl Draw {
    #[must_use]
    pub fn empty(owners: usize) -> Self {
        Self {
            per_owner: vec![Balances::default(); owners],
            unfunded: 0.0,
        }
    }

    /// Household amounts by tax treatment
    #[must_use]
    pub fn by_status(&self) -> Balances {
        self.per_owner
            .iter()
            .fold(Balances::default(), |acc, b| acc.plus(b))
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.by_status().total()
    }

    #[must_use]
    pub fn is_funded(&self) -> bool {
        self.unfunded <= FUNDED_EPSILON
    }
}

/// Result of solving for the withdrawal that meets a net income target
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub draw: Draw,
    pub iterations: usize,
    /// Every reachable account was emptied before the target was met
    pub exhausted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct WithdrawalEngine<'a> {
    rmd_table: &'a RmdTable,
    split: SpousalSplit,
}

impl<'a> WithdrawalEngine<'a> {
    #[must_use]
    pub fn new(rmd_table: &'a RmdTable, split: SpousalSplit) -> Self {
        Self { rmd_table, split }
    }

    /// Distribution due in `year` on the prior year-end tax-deferred balance
    #[must_use]
    pub fn required_distribution(&self, individual: &Individual, year: i16, prior_balance: f64) -> f64 {
        self.rmd_table.required_distribution(
            individual.birth_year,
            individual.age_in(year),
            prior_balance,
        )
    }

    /// Share of `need` assigned to `living[0]`. A lone survivor takes all.
    #[must_use]
    pub fn split_fraction(&self, need: f64, ledger: &AccountLedger, living: &[usize]) -> f64 {
        let [first, second] = living else {
            return 1.0;
        };
        match self.split {
            SpousalSplit::Fixed(f) if *first == 0 => f,
            SpousalSplit::Fixed(f) => 1.0 - f,
            SpousalSplit::Auto => {
                let a = ledger.balances(*first);
                let b = ledger.balances(*second);
                let mut mine = 0.0;
                let mut household = 0.0;
                for status in TAX_STATUSES {
                    mine += a[status];
                    household += a[status] + b[status];
                    if need <= household {
                        break;
                    }
                }
                // +1 avoids dividing by zero; the sub-dollar bias it adds is accepted
                mine / (household + 1.0)
            }
        }
    }

    /// Draw `need` from the living individuals without touching the ledger.
    /// With two spouses the need is split, and a share one spouse cannot
    /// fund is offered to the other's waterfall.
    #[must_use]
    pub fn preview(&self, need: f64, ledger: &AccountLedger, living: &[usize]) -> Draw {
        let mut draw = Draw::empty(ledger.owners());
        if need <= 0.0 || living.is_empty() {
            return draw;
        }

        let f = self.split_fraction(need, ledger, living);
        let mut available: Vec<Balances> = living.iter().map(|&o| ledger.balances(o)).collect();
        let mut left: Vec<f64> = living
            .iter()
            .enumerate()
            .map(|(k, _)| if k == 0 { need * f } else { need * (1.0 - f) })
            .collect();

        for (k, &owner) in living.iter().enumerate() {
            let taken = waterfall(&mut available[k], left[k]);
            left[k] -= taken.total();
            draw.per_owner[owner] = taken;
        }

        // Re-offer unfunded shares to the other spouse
        for k in 0..living.len() {
            for (j, &owner) in living.iter().enumerate() {
                if j == k || left[k] <= FUNDED_EPSILON {
                    continue;
                }
                let taken = waterfall(&mut available[j], left[k]);
                left[k] -= taken.total();
                draw.per_owner[owner] = draw.per_owner[owner].plus(&taken);
            }
        }

        draw.unfunded = left.iter().map(|l| l.max(0.0)).sum();
        draw
    }

    /// Draw `amount` from one individual's accounts only
    #[must_use]
    pub fn preview_owner(&self, amount: f64, ledger: &AccountLedger, owner: usize) -> Draw {
        self.preview(amount, ledger, &[owner])
    }

    /// Apply a previewed draw
    pub fn commit(&self, draw: &Draw, ledger: &mut AccountLedger) {
        for (owner, taken) in draw.per_owner.iter().enumerate() {
            for status in TAX_STATUSES {
                ledger.debit(owner, status, taken[status]);
            }
        }
    }

    /// Find the withdrawal at which `net(draw)` meets `target` by fixed-point
    /// iteration `w <- w + (target - net(w))`. Tax only ever takes part of an
    /// extra dollar, so the iteration climbs monotonically to the solution.
    /// Stops early when the accounts run dry.
    pub fn solve<F>(&self, target: f64, ledger: &AccountLedger, living: &[usize], net: F) -> Solution
    where
        F: Fn(&Draw) -> f64,
    {
        let mut draw = Draw::empty(ledger.owners());
        let mut w = target - net(&draw);
        let mut iterations = 0;

        while iterations < MAX_SOLVE_ITERATIONS && w > 0.0 {
            iterations += 1;
            draw = self.preview(w, ledger, living);
            if !draw.is_funded() {
                return Solution {
                    draw,
                    iterations,
                    exhausted: true,
                };
            }
            let gap = target - net(&draw);
            if gap.abs() < SOLVE_TOLERANCE {
                break;
            }
            w += gap;
        }

        Solution {
            draw,
            iterations,
            exhausted: false,
        }
    }
}

/// Amount drawn from tax-deferred accounts, which is ordinary income
#[must_use]
pub fn taxable_portion(draw: &Draw) -> f64 {
    draw.by_status()[TaxStatus::TaxDeferred]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(table: &RmdTable, split: SpousalSplit) -> WithdrawalEngine<'_> {
        WithdrawalEngine::new(table, split)
    }

    #[test]
    fn test_waterfall_order() {
        let mut available = Balances::new(100.0, 200.0, 300.0);
        let taken = waterfall(&mut available, 250.0);
        assert_eq!(taken, Balances::new(100.0, 150.0, 0.0));
        assert_eq!(available, Balances::new(0.0, 50.0, 300.0));
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let table = RmdTable::default();
        let ledger = AccountLedger::new(vec![Balances::new(100.0, 0.0, 0.0)]);
        let draw = engine(&table, SpousalSplit::Auto).preview(40.0, &ledger, &[0]);
        assert!((draw.total() - 40.0).abs() < 1e-12);
        assert_eq!(ledger.balance(0, TaxStatus::Taxable), 100.0);
    }

    #[test]
    fn test_unfunded_share_goes_to_other_spouse() {
        let table = RmdTable::default();
        let ledger = AccountLedger::new(vec![
            Balances::new(10.0, 0.0, 0.0),
            Balances::new(0.0, 0.0, 1_000.0),
        ]);
        let draw = engine(&table, SpousalSplit::Fixed(0.5)).preview(100.0, &ledger, &[0, 1]);
        assert!(draw.is_funded());
        assert!((draw.per_owner[0].taxable - 10.0).abs() < 1e-12);
        assert!((draw.per_owner[1].tax_free - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_auto_split_by_reachable_balances() {
        let table = RmdTable::default();
        let ledger = AccountLedger::new(vec![
            Balances::new(300.0, 5_000.0, 0.0),
            Balances::new(100.0, 0.0, 0.0),
        ]);
        let e = engine(&table, SpousalSplit::Auto);
        // Need fits in taxable: split on taxable balances only
        let f = e.split_fraction(200.0, &ledger, &[0, 1]);
        assert!((f - 300.0 / 401.0).abs() < 1e-12);
        // Need reaches tax-deferred
        let f = e.split_fraction(1_000.0, &ledger, &[0, 1]);
        assert!((f - 5_300.0 / 5_401.0).abs() < 1e-12);
    }

    #[test]
    fn test_auto_split_bias_stays_below_a_dollar() {
        let table = RmdTable::default();
        let ledger = AccountLedger::new(vec![
            Balances::new(300.0, 1_000.0, 0.0),
            Balances::new(100.0, 1_000.0, 0.0),
        ]);
        // Need equals household taxable; the second share overshoots by 100/401
        let draw = engine(&table, SpousalSplit::Auto).preview(400.0, &ledger, &[0, 1]);
        assert!((draw.total() - 400.0).abs() < 1e-9);
        assert_eq!(draw.per_owner[1].taxable, 100.0);
        let overshoot = 400.0 * 101.0 / 401.0 - 100.0;
        assert!((draw.per_owner[1].tax_deferred - overshoot).abs() < 1e-9);
        assert!(overshoot < 1.0);
        assert_eq!(draw.per_owner[0].tax_deferred, 0.0);
    }

    #[test]
    fn test_fixed_split_follows_first_listed() {
        let table = RmdTable::default();
        let ledger = AccountLedger::new(vec![Balances::default(), Balances::default()]);
        let e = engine(&table, SpousalSplit::Fixed(0.7));
        assert!((e.split_fraction(1.0, &ledger, &[0, 1]) - 0.7).abs() < 1e-12);
        assert_eq!(e.split_fraction(1.0, &ledger, &[1]), 1.0);
    }

    #[test]
    fn test_solve_grosses_up_for_tax() {
        let table = RmdTable::default();
        let ledger = AccountLedger::new(vec![Balances::new(0.0, 1_000_000.0, 0.0)]);
        // Flat 20% tax on tax-deferred draws
        let net = |d: &Draw| d.total() - 0.2 * taxable_portion(d);
        let solution = engine(&table, SpousalSplit::Auto).solve(40_000.0, &ledger, &[0], net);
        assert!(!solution.exhausted);
        assert!((net(&solution.draw) - 40_000.0).abs() < SOLVE_TOLERANCE);
        assert!((solution.draw.total() - 50_000.0).abs() < 0.1);
    }

    #[test]
    fn test_solve_reports_exhaustion() {
        let table = RmdTable::default();
        let ledger = AccountLedger::new(vec![Balances::new(0.0, 0.0, 1_000.0)]);
        let solution =
            engine(&table, SpousalSplit::Auto).solve(5_000.0, &ledger, &[0], Draw::total);
        assert!(solution.exhausted);
        assert!((solution.draw.total() - 1_000.0).abs() < 1e-9);
    }
}
