//! Roth conversion search tests

use super::START_YEAR;
use crate::config::{DesiredIncome, Individual, PlanBuilder, PlanConfig};
use crate::model::{RateMode, RateSet};
use crate::optimization::{RothOptimizerConfig, TerminationReason, optimize_roth};
use crate::simulation::ScenarioRunner;
use crate::sweep::SweepProgress;

const HEIRS_TAX_RATE: f64 = 0.40;

fn fixed_rates() -> RateMode {
    RateMode::Fixed {
        rates: RateSet::new(0.06, 0.04, 0.04, 0.02),
    }
}

/// Large tax-deferred balance that heirs would pay 40% on
fn pre_tax_heavy_plan() -> PlanConfig {
    PlanBuilder::new()
        .start_year(START_YEAR)
        .individual(
            Individual::new("Retiree", 1960, 85)
                .taxable(300_000.0)
                .tax_deferred(1_000_000.0)
                .social_security(30_000.0, 67),
        )
        .desired_income(DesiredIncome::flat(50_000.0))
        .heirs_tax_rate(HEIRS_TAX_RATE)
        .rate_mode(fixed_rates())
        .build()
        .unwrap()
}

fn settings() -> RothOptimizerConfig {
    RothOptimizerConfig::new(HEIRS_TAX_RATE, 64_000.0, 8_000.0)
}

#[test]
fn test_conversions_improve_estate() {
    let plan = pre_tax_heavy_plan();
    let result = optimize_roth(&plan, &settings(), None).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::Converged);
    assert!(result.estate >= result.baseline_estate);
    assert!(result.improvement() > 0.0, "no gain over {}", result.baseline_estate);
    assert!(result.total_converted() > 0.0);
    assert!(result.shortfall <= 0.01);
    assert!(result.conversions.iter().flatten().all(|c| *c >= 0.0));

    let history = &result.history;
    assert!(history.best_values.windows(2).all(|w| w[1] >= w[0]));
    assert!(!history.passes.is_empty());
    assert!(history.passes.last().unwrap().step >= 8_000.0);
}

#[test]
fn test_optimized_plan_reproduces_estate() {
    let plan = pre_tax_heavy_plan();
    let settings = settings();
    let result = optimize_roth(&plan, &settings, None).unwrap();

    assert_eq!(result.plan.roth_conversions(), result.conversions);
    let outcome = ScenarioRunner::new(&result.plan).run(settings.seed);
    let estate = outcome.estate(HEIRS_TAX_RATE).value;
    assert!((estate - result.estate).abs() < 1e-9, "{estate} vs {}", result.estate);

    // The input plan is left untouched
    assert!(plan.roth_conversions().iter().flatten().all(|c| *c == 0.0));
}

#[test]
fn test_nothing_to_convert_keeps_zero_schedule() {
    let plan = PlanBuilder::new()
        .start_year(START_YEAR)
        .individual(Individual::new("Roth", 1960, 80).tax_free(800_000.0))
        .desired_income(DesiredIncome::flat(30_000.0))
        .rate_mode(fixed_rates())
        .build()
        .unwrap();
    let result = optimize_roth(&plan, &settings(), None).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::Converged);
    assert_eq!(result.total_converted(), 0.0);
    assert_eq!(result.estate, result.baseline_estate);
    assert!(result.history.passes.iter().all(|p| p.improvements == 0));
}

#[test]
fn test_evaluation_budget_stops_search() {
    let plan = pre_tax_heavy_plan();
    let settings = RothOptimizerConfig {
        max_evaluations: 3,
        ..settings()
    };
    let result = optimize_roth(&plan, &settings, None).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::MaxEvaluationsReached);
    assert!(result.evaluations <= 3);
    assert!(result.estate >= result.baseline_estate);
}

#[test]
fn test_cancelled_search_returns_baseline() {
    let plan = pre_tax_heavy_plan();
    let progress = SweepProgress::new(0);
    progress.cancel();
    let result = optimize_roth(&plan, &settings(), Some(&progress)).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::UserCancelled);
    assert_eq!(result.evaluations, 1);
    assert_eq!(result.estate, result.baseline_estate);
    assert_eq!(result.total_converted(), 0.0);
}

#[test]
fn test_rejects_invalid_settings() {
    let plan = pre_tax_heavy_plan();
    let settings = RothOptimizerConfig::new(1.5, 64_000.0, 1_000.0);
    assert!(optimize_roth(&plan, &settings, None).is_err());

    let settings = RothOptimizerConfig::new(0.25, 0.0, 1_000.0);
    assert!(optimize_roth(&plan, &settings, None).is_err());
}
