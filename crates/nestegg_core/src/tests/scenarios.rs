//! Reference scenario tests
//!
//! The four-percent retiree: age 63, simulated through 93, $1M tax-free held
//! half equity and half T-notes, drawing a flat $40k real.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::{START_YEAR, four_percent_plan, zero_rates};
use crate::config::{DesiredIncome, Individual, IncomeProfile, PlanBuilder, PlanConfig, SpousalSplit};
use crate::model::{FilingStatus, RateMode, RateSet, YearState};
use crate::observer::{NullObserver, SimulationObserver};
use crate::simulation::{ScenarioRunner, run};

#[test]
fn test_1966_retirement_fails_in_year_29() {
    let plan = four_percent_plan(RateMode::Historical {
        from: 1966,
        to: Some(1997),
    });
    assert_eq!(plan.horizon(), 31);
    let outcome = run(plan, 0, &NullObserver);

    assert_eq!(outcome.years.len(), 31);
    assert!(!outcome.succeeded());
    assert_eq!(outcome.first_failure(), Some(29));
    assert!(outcome.years[..29].iter().all(|y| !y.failed));
    assert!(outcome.years[29..].iter().all(|y| y.failed && y.shortfall > 0.0));
    assert!(outcome.total_shortfall() > 0.0);
    assert_eq!(outcome.estate(0.25).value, 0.0);
}

#[test]
fn test_tax_free_withdrawals_owe_no_tax() {
    let plan = four_percent_plan(RateMode::Historical {
        from: 1966,
        to: Some(1997),
    });
    let outcome = run(plan, 0, &NullObserver);
    for year in &outcome.years {
        assert_eq!(year.tax.total(), 0.0);
        assert_eq!(year.withdrawals.taxable, 0.0);
        assert_eq!(year.withdrawals.tax_deferred, 0.0);
    }
}

#[test]
fn test_generous_fixed_returns_succeed() {
    let plan = four_percent_plan(RateMode::Fixed {
        rates: RateSet::new(0.08, 0.05, 0.05, 0.02),
    });
    let outcome = run(plan, 0, &NullObserver);
    assert!(outcome.succeeded());
    assert_eq!(outcome.first_failure(), None);
    assert_eq!(outcome.total_shortfall(), 0.0);

    // 6.5% nominal against 2% inflation leaves more than was started with
    let estate = outcome.estate(0.25);
    assert!(estate.value > 1_000_000.0, "estate {}", estate.value);
    assert!((estate.inflation_factor - 1.02f64.powi(31)).abs() < 1e-9);
    assert!((estate.nominal / estate.inflation_factor - estate.value).abs() < 1e-6);
}

#[test]
fn test_deterministic_modes_ignore_seed() {
    for mode in [
        RateMode::Fixed {
            rates: RateSet::new(0.07, 0.04, 0.03, 0.025),
        },
        RateMode::Historical {
            from: 1966,
            to: Some(1997),
        },
        RateMode::Average {
            from: 1928,
            to: 2022,
        },
    ] {
        let plan = four_percent_plan(mode);
        let runner = ScenarioRunner::new(&plan);
        assert_eq!(runner.run(1), runner.run(1));
        assert_eq!(runner.run(1), runner.run(99));
    }
}

/// A, 65 at start with most of the savings, dies at the end of 2040. B keeps
/// a small balance and lives through 2052. No growth and no inflation.
fn uneven_couple(split: SpousalSplit) -> PlanConfig {
    PlanBuilder::new()
        .start_year(START_YEAR)
        .individual(
            Individual::new("A", 1960, 80)
                .taxable(600_000.0)
                .tax_deferred(400_000.0)
                .tax_free(200_000.0)
                .social_security(24_000.0, 67),
        )
        .individual(
            Individual::new("B", 1962, 90)
                .taxable(30_000.0)
                .tax_free(20_000.0)
                .social_security(12_000.0, 67),
        )
        .desired_income(DesiredIncome::flat(40_000.0))
        .spousal_split(split)
        .rate_mode(zero_rates())
        .build()
        .unwrap()
}

fn assert_income_identity(years: &[YearState]) {
    for year in years {
        assert!(
            (year.net_income - year.target_income).abs() < 0.02,
            "year {}: net {} target {}",
            year.year,
            year.net_income,
            year.target_income
        );
        let recomputed =
            year.fixed_income() + year.withdrawals.total() - year.deposits - year.tax.total();
        assert!((recomputed - year.net_income).abs() < 1e-6, "year {}", year.year);
    }
}

#[test]
fn test_auto_split_couple_keeps_both_spouses_funded() {
    let plan = uneven_couple(SpousalSplit::Auto);
    assert_eq!(plan.horizon(), 28);
    let outcome = ScenarioRunner::new(&plan).run(0);
    assert!(outcome.succeeded());
    assert_income_identity(&outcome.years);

    // Draws are shared in proportion to balances, so the small saver is
    // never emptied while the other spouse still holds taxable funds
    for year in outcome.years.iter().filter(|y| y.ages.iter().all(Option::is_some)) {
        assert_eq!(year.filing_status, FilingStatus::MarriedFilingJointly);
        assert!(year.closing[0].taxable > 0.0, "year {}", year.year);
        assert!(year.closing[1].taxable > 0.0, "year {}", year.year);
    }
    let first = &outcome.years[0];
    assert!((first.withdrawals.taxable - 40_000.0).abs() < 0.01);
    let b_draw = first.opening[1].taxable - first.closing[1].taxable;
    assert!((b_draw - 40_000.0 * 30_001.0 / 630_001.0).abs() < 1e-3, "B drew {b_draw}");
}

#[test]
fn test_survivor_receives_bequest_and_reduced_target() {
    let outcome = ScenarioRunner::new(&uneven_couple(SpousalSplit::Auto)).run(0);

    // A's final year is 2040, index 15
    let death = &outcome.years[15];
    assert_eq!(death.ages[0], Some(80));
    assert_eq!(death.closing[0].total(), 0.0);
    let inherited = death.opening[0].tax_deferred - death.rmd[0] - death.withdrawals.tax_deferred;
    assert!(inherited > 0.0);
    assert!((death.closing[1].tax_deferred - inherited).abs() < 1e-6);

    // Full beneficiary fractions: nothing leaves the household
    let opening: f64 = death.opening.iter().map(|b| b.total()).sum();
    let expected = opening - death.withdrawals.total() - death.total_rmd() + death.deposits;
    assert!((death.closing_balances().total() - expected).abs() < 1e-6);

    let after = &outcome.years[16];
    assert_eq!(after.ages[0], None);
    assert_eq!(after.filing_status, FilingStatus::Single);
    assert!((after.target_income - 24_000.0).abs() < 1e-9);
    assert_eq!(after.opening[1], death.closing[1]);
    assert_income_identity(&outcome.years[16..]);
}

#[test]
fn test_fixed_split_re_offers_an_emptied_spouse_share() {
    let outcome = ScenarioRunner::new(&uneven_couple(SpousalSplit::Fixed(0.5))).run(0);
    assert!(outcome.succeeded());
    assert_income_identity(&outcome.years);

    // Half of each year's draw empties B's 50k during 2028; A covers the rest
    let emptied = &outcome.years[3];
    assert_eq!(emptied.closing[1].total(), 0.0);
    assert!(emptied.closing[0].taxable > 0.0);
    // 40k target less A's 24k of social security, plus the year's tax
    let draw = 16_000.0 + emptied.tax.total();
    assert!((emptied.withdrawals.total() - draw).abs() < 0.02);
}

#[test]
fn test_smile_profile_shapes_the_target() {
    let plan = PlanBuilder::new()
        .start_year(START_YEAR)
        .individual(Individual::new("Retiree", 1960, 95).tax_free(2_000_000.0))
        .desired_income(DesiredIncome::smile(50_000.0))
        .rate_mode(zero_rates())
        .build()
        .unwrap();
    let outcome = ScenarioRunner::new(&plan).run(0);
    assert!(outcome.succeeded());
    assert_income_identity(&outcome.years);

    for year in &outcome.years {
        let age = year.ages[0].unwrap();
        let expected = 50_000.0 * IncomeProfile::Smile.factor(age);
        assert!((year.target_income - expected).abs() < 1e-9, "age {age}");
    }
    // Ages 65, 67, 84 and 95
    assert!((outcome.years[0].target_income - 50_000.0).abs() < 1e-9);
    assert!((outcome.years[2].target_income - 50_750.0).abs() < 1e-6);
    assert!((outcome.years[19].target_income - 37_200.0).abs() < 1e-6);
    assert!(outcome.years[30].target_income > outcome.years[19].target_income);
}

#[test]
fn test_stochastic_runs_reproduce_by_seed() {
    let plan = four_percent_plan(RateMode::Stochastic {
        from: 1928,
        to: None,
    });
    let runner = ScenarioRunner::new(&plan);
    let a = runner.run(3);
    let b = runner.run(3);
    let c = runner.run(4);
    assert_eq!(a, b);
    assert_ne!(a.years[0].rates, c.years[0].rates);
}

#[derive(Default)]
struct CountingObserver {
    years: AtomicUsize,
    shortfalls: AtomicUsize,
    deaths: AtomicUsize,
}

impl SimulationObserver for CountingObserver {
    fn year_completed(&self, _state: &YearState) {
        self.years.fetch_add(1, Ordering::Relaxed);
    }

    fn shortfall(&self, _year: i16, _amount: f64) {
        self.shortfalls.fetch_add(1, Ordering::Relaxed);
    }

    fn individual_died(&self, year: i16, individual: usize) {
        assert_eq!(year, 2055);
        assert_eq!(individual, 0);
        self.deaths.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn test_observer_sees_every_year() {
    let plan = four_percent_plan(RateMode::Historical {
        from: 1966,
        to: Some(1997),
    });
    let observer = CountingObserver::default();
    let outcome = run(plan, 0, &observer);

    assert_eq!(observer.years.load(Ordering::Relaxed), outcome.years.len());
    assert_eq!(observer.shortfalls.load(Ordering::Relaxed), 2);
    assert_eq!(observer.deaths.load(Ordering::Relaxed), 1);
}

#[test]
fn test_outcome_serializes() {
    let plan = four_percent_plan(RateMode::Average {
        from: 1928,
        to: 2022,
    });
    let outcome = ScenarioRunner::new(&plan).run(0);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["start_year"], 2025);
    assert_eq!(json["years"].as_array().unwrap().len(), 31);
    assert_eq!(json["years"][0]["filing_status"], "single");

    let plan_json = serde_json::to_value(&plan).unwrap();
    assert_eq!(plan_json["rate_mode"]["mode"], "average");
    assert_eq!(plan_json["individuals"][0]["life_expectancy"], 93);
}
