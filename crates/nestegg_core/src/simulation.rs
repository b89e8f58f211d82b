//! Year-by-year simulation of one rate realization
//!
//! [`YearSimulator`] owns the household ledger and advances it one calendar
//! year at a time. [`ScenarioRunner`] generates the rate path for a plan and
//! drives the simulator across the horizon. Years are strictly sequential:
//! each one starts from the previous year's closing balances.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::PlanConfig;
use crate::model::{
    AccountLedger, FilingStatus, RateSet, ScenarioOutcome, TaxStatus, YearState, slot,
};
use crate::observer::{NullObserver, SimulationObserver};
use crate::taxes::{IncomeComponents, TaxAssessment, TaxEngine, TaxYear};
use crate::withdrawal::{Draw, SOLVE_TOLERANCE, WithdrawalEngine, taxable_portion};

/// Conversions capped by more than this are reported
const CAP_REPORT_THRESHOLD: f64 = 0.005;

/// Household state carried from one year to the next
pub struct YearSimulator<'a> {
    plan: &'a PlanConfig,
    taxes: TaxEngine<'a>,
    withdrawals: WithdrawalEngine<'a>,
    ledger: AccountLedger,
    horizon: usize,
    /// Realized inflation through the prior year, one entry per year started
    inflation_path: Vec<f64>,
    inflation: f64,
    /// Realized MAGI per completed year
    magi: Vec<f64>,
    survivor_multiplier: f64,
}

/// Per-individual fixed income for one year
#[derive(Debug, Clone, Copy, Default)]
struct FixedIncome {
    wages: f64,
    pension: f64,
    social_security: f64,
    rmd: f64,
}

impl FixedIncome {
    fn total(&self) -> f64 {
        self.wages + self.pension + self.social_security + self.rmd
    }
}

impl<'a> YearSimulator<'a> {
    #[must_use]
    pub fn new(plan: &'a PlanConfig) -> Self {
        Self {
            plan,
            taxes: TaxEngine::starting_in(&plan.tax_tables, plan.start_year),
            withdrawals: WithdrawalEngine::new(&plan.rmd_table, plan.spousal_split),
            ledger: AccountLedger::new(plan.initial_balances()),
            horizon: plan.horizon(),
            inflation_path: Vec::with_capacity(plan.horizon()),
            inflation: 1.0,
            magi: Vec::with_capacity(plan.horizon()),
            survivor_multiplier: 1.0,
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    /// Simulate year `index` under `rates`. Must be called with consecutive
    /// indices starting at zero.
    pub fn step(
        &mut self,
        index: usize,
        rates: &RateSet,
        observer: &dyn SimulationObserver,
    ) -> YearState {
        let plan = self.plan;
        let year = plan.start_year + index as i16;
        let individuals = &plan.individuals;
        let owners = individuals.len();

        // 1. Ages and household status
        let living: Vec<usize> = (0..owners)
            .filter(|&i| individuals[i].is_alive(year))
            .collect();
        let ages: Vec<Option<u16>> = individuals
            .iter()
            .map(|p| p.is_alive(year).then(|| p.age_in(year)))
            .collect();
        let filing_status = if living.len() == 2 {
            FilingStatus::MarriedFilingJointly
        } else {
            FilingStatus::Single
        };
        let inflation_factor = self.inflation;
        self.inflation_path.push(inflation_factor);
        let opening = self.ledger.snapshot();
        let records: Vec<_> = plan.schedules.iter().map(|s| s.get(year)).collect();

        // 2. Required distributions on prior year-end balances
        let mut rmd_due = vec![0.0; owners];
        for &i in &living {
            let prior = self.ledger.balance(i, TaxStatus::TaxDeferred);
            rmd_due[i] = self
                .withdrawals
                .required_distribution(&individuals[i], year, prior);
        }

        // 3. Conversions at the start of the year
        let mut roth_conversions = vec![0.0; owners];
        for &i in &living {
            let requested = records[i].roth_conversion;
            if requested <= 0.0 {
                continue;
            }
            let cap = (self.ledger.balance(i, TaxStatus::TaxDeferred) - rmd_due[i]).max(0.0);
            let executed = requested.min(cap);
            if requested - executed > CAP_REPORT_THRESHOLD {
                tracing::warn!(
                    year,
                    individual = i,
                    requested,
                    executed,
                    "roth conversion capped by tax-deferred balance"
                );
            }
            let moved = self.ledger.debit(i, TaxStatus::TaxDeferred, executed);
            self.ledger.credit(i, TaxStatus::TaxFree, moved);
            roth_conversions[i] = moved;
        }
        let conversions: f64 = roth_conversions.iter().sum();

        // 4. Allocation on post-conversion balances
        let weights = plan.allocation.weights(index, self.horizon, &self.ledger);

        // 5. Growth, then contributions with half a year of growth
        let mut growth = self.ledger.apply_growth(rates, &weights);
        let mut contributions = 0.0;
        for &i in &living {
            let record = &records[i];
            let deposits = [
                (TaxStatus::Taxable, record.taxable),
                (TaxStatus::TaxDeferred, record.tax_deferred_contributions()),
                (TaxStatus::TaxFree, record.tax_free_contributions()),
            ];
            for (status, amount) in deposits {
                if amount <= 0.0 {
                    continue;
                }
                let r = rates.portfolio_return(&weights[i][slot(status)]);
                let credited = (amount * (1.0 + r / 2.0)).max(0.0);
                self.ledger.credit(i, status, credited);
                contributions += amount;
                growth += credited - amount;
            }
        }

        // 6. Fixed income, required distributions and big-ticket items
        let mut fixed = vec![FixedIncome::default(); owners];
        for &i in &living {
            let p = &individuals[i];
            let age = p.age_in(year);
            fixed[i].wages = records[i].wages;
            fixed[i].rmd = self.ledger.debit(i, TaxStatus::TaxDeferred, rmd_due[i]);
            if let Some(pension) = p.pension.filter(|b| age >= b.start_age) {
                fixed[i].pension = pension.amount;
            }
            if let Some(ss) = p.social_security.filter(|b| age >= b.start_age) {
                let first = (p.year_at_age(ss.start_age) - plan.start_year).max(0) as usize;
                let base = self.inflation_path.get(first).copied().unwrap_or(1.0);
                fixed[i].social_security = ss.amount * inflation_factor / base;
            }
        }

        let mut big_ticket = 0.0;
        let mut big_ticket_draws = Draw::empty(owners);
        let mut shortfall = 0.0;
        for &i in &living {
            let item = records[i].big_ticket_item;
            if item > 0.0 {
                self.ledger.credit(i, TaxStatus::Taxable, item);
                big_ticket += item;
            } else if item < 0.0 {
                let draw = self.withdrawals.preview_owner(-item, &self.ledger, i);
                self.withdrawals.commit(&draw, &mut self.ledger);
                big_ticket -= draw.total();
                shortfall += draw.unfunded;
                big_ticket_draws.per_owner[i] = draw.per_owner[i];
            }
        }

        let wages: f64 = fixed.iter().map(|f| f.wages).sum();
        let pension: f64 = fixed.iter().map(|f| f.pension).sum();
        let social_security: f64 = fixed.iter().map(|f| f.social_security).sum();
        let rmd: Vec<f64> = fixed.iter().map(|f| f.rmd).collect();
        let fixed_total: f64 = fixed.iter().map(FixedIncome::total).sum();
        let ordinary_distributions = rmd.iter().sum::<f64>() + taxable_portion(&big_ticket_draws);

        // 7. Income target
        let oldest = living
            .iter()
            .map(|&i| individuals[i].age_in(year))
            .max()
            .unwrap_or(0);
        let income = &plan.desired_income;
        let target = income.amount
            * income.profile.factor(oldest)
            * inflation_factor
            * self.survivor_multiplier;

        // 8. Solve for the withdrawal that meets the target after tax
        let ctx = TaxYear {
            year,
            status: filing_status,
            seniors: living
                .iter()
                .filter(|&&i| individuals[i].age_in(year) >= plan.tax_tables.medicare_age)
                .count(),
            inflation_factor,
            irmaa_magi: match index {
                0 | 1 => plan.prior_magi,
                n => self.magi.get(n - 2).copied(),
            },
        };
        let taxes = self.taxes;
        let assess = |draw: &Draw| -> TaxAssessment {
            let components = IncomeComponents {
                wages,
                pension,
                social_security,
                tax_deferred_distributions: ordinary_distributions + taxable_portion(draw),
                roth_conversions: conversions,
            };
            taxes.compute_tax(&components, &ctx)
        };
        let net = |draw: &Draw| fixed_total + draw.total() - assess(draw).total();

        let mut deposits = 0.0;
        let mut draw = Draw::empty(owners);
        let surplus = net(&draw) - target;
        if surplus >= 0.0 {
            deposits = surplus;
            for &i in &living {
                let share = if fixed_total > 0.0 {
                    fixed[i].total() / fixed_total
                } else if i == living[0] {
                    1.0
                } else {
                    0.0
                };
                self.ledger.credit(i, TaxStatus::Taxable, surplus * share);
            }
        } else {
            let solution = self.withdrawals.solve(target, &self.ledger, &living, &net);
            self.withdrawals.commit(&solution.draw, &mut self.ledger);
            if solution.exhausted {
                shortfall += (target - net(&solution.draw)).max(0.0);
            }
            draw = solution.draw;
        }

        // 9. Tax on the realized components
        let tax = assess(&draw);
        let net_income = fixed_total + draw.total() - deposits - tax.total();
        self.magi.push(tax.adjusted_gross_income);
        let failed = shortfall >= SOLVE_TOLERANCE;

        // 10. Deaths at year end
        for &i in &living {
            if individuals[i].final_year() != year {
                continue;
            }
            observer.individual_died(year, i);
            let survivor = living
                .iter()
                .copied()
                .find(|&s| s != i && individuals[s].final_year() > year);
            if let Some(s) = survivor {
                let fractions = individuals[i].accounts.beneficiary_fractions();
                self.ledger.bequeath(i, s, &fractions);
                self.survivor_multiplier = income.survivor_fraction;
                tracing::debug!(year, deceased = i, survivor = s, "estate passed to survivor");
            }
        }

        self.inflation *= 1.0 + rates.inflation();

        let state = YearState {
            year,
            index,
            ages,
            filing_status,
            rates: *rates,
            weights,
            opening,
            closing: self.ledger.snapshot(),
            inflation_factor,
            wages,
            pension,
            social_security,
            rmd,
            roth_conversions,
            contributions,
            growth,
            withdrawals: draw.by_status(),
            deposits,
            big_ticket,
            big_ticket_draws: big_ticket_draws.by_status(),
            tax,
            target_income: target,
            net_income,
            shortfall,
            failed,
        };

        tracing::debug!(
            year,
            target,
            net_income,
            withdrawals = state.withdrawals.total(),
            tax = tax.total(),
            balance = self.ledger.total(),
            "year simulated"
        );
        if failed {
            observer.shortfall(year, shortfall);
        }
        observer.year_completed(&state);
        state
    }
}

// ============================================================================
// Scenario runner
// ============================================================================

/// Runs a plan across its full horizon
#[derive(Clone, Copy)]
pub struct ScenarioRunner<'a> {
    plan: &'a PlanConfig,
    observer: &'a dyn SimulationObserver,
}

impl<'a> ScenarioRunner<'a> {
    #[must_use]
    pub fn new(plan: &'a PlanConfig) -> Self {
        Self {
            plan,
            observer: &NullObserver,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn SimulationObserver) -> Self {
        self.observer = observer;
        self
    }

    /// One realization of the plan's rate mode, seeded
    #[must_use]
    pub fn run(&self, seed: u64) -> ScenarioOutcome {
        let mut rng = SmallRng::seed_from_u64(seed);
        self.run_with_rng(&mut rng)
    }

    pub fn run_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> ScenarioOutcome {
        let rates = self.plan.rates.generate(self.plan.horizon(), rng);
        self.run_rates(&rates)
    }

    /// Simulate against an explicit rate path. Simulates one year per rate
    /// set, up to the plan horizon.
    #[must_use]
    pub fn run_rates(&self, rates: &[RateSet]) -> ScenarioOutcome {
        let mut simulator = YearSimulator::new(self.plan);
        let years = rates
            .iter()
            .take(self.plan.horizon())
            .enumerate()
            .map(|(index, r)| simulator.step(index, r, self.observer))
            .collect();
        ScenarioOutcome {
            start_year: self.plan.start_year,
            years,
        }
    }
}

/// Run `plan` once. Deterministic rate modes ignore `seed`.
#[must_use]
pub fn run(plan: PlanConfig, seed: u64, observer: &dyn SimulationObserver) -> ScenarioOutcome {
    ScenarioRunner::new(&plan).with_observer(observer).run(seed)
}

