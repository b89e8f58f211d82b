//! Federal tax and IRMAA tests against the default 2024 tables

use super::{START_YEAR, zero_rates};
use crate::config::{Individual, PlanBuilder};
use crate::model::{FilingStatus, TaxRegime, TaxTables};
use crate::simulation::ScenarioRunner;
use crate::taxes::{IncomeComponents, TaxEngine, TaxYear};

fn tax_year(year: i16, status: FilingStatus, seniors: usize) -> TaxYear {
    TaxYear {
        year,
        status,
        seniors,
        inflation_factor: 1.0,
        irmaa_magi: None,
    }
}

fn pension_of(amount: f64) -> IncomeComponents {
    IncomeComponents {
        pension: amount,
        ..Default::default()
    }
}

#[test]
fn test_single_filer_current_law() {
    let tables = TaxTables::default();
    let engine = TaxEngine::new(&tables);
    let ctx = tax_year(2025, FilingStatus::Single, 0);
    let assessment = engine.compute_tax(&pension_of(60_000.0), &ctx);

    // 45,400 taxable: 11,600 @ 10% + 33,800 @ 12%
    assert!((assessment.federal_tax - 5_216.0).abs() < 1e-6, "tax {}", assessment.federal_tax);
    assert!((assessment.taxable_income - 45_400.0).abs() < 1e-9);
    assert!((assessment.marginal_rate - 0.12).abs() < 1e-9);
    assert_eq!(assessment.irmaa, 0.0);
}

#[test]
fn test_sunset_switches_to_pre_tcja_tables() {
    let tables = TaxTables::default();
    let engine = TaxEngine::new(&tables);
    assert_eq!(engine.regime(2025), TaxRegime::CurrentLaw);
    assert_eq!(engine.regime(2026), TaxRegime::PreTcja);

    let ctx = tax_year(2026, FilingStatus::Single, 0);
    let assessment = engine.compute_tax(&pension_of(60_000.0), &ctx);
    // 51,750 taxable: 12,100 @ 10% + 37,200 @ 15% + 2,450 @ 25%
    assert!((assessment.federal_tax - 7_402.5).abs() < 1e-6, "tax {}", assessment.federal_tax);
}

#[test]
fn test_indexing_scales_tax_with_inflation() {
    let tables = TaxTables::default();
    let engine = TaxEngine::new(&tables);
    for status in [FilingStatus::Single, FilingStatus::MarriedFilingJointly] {
        let base = tax_year(2030, status, 1);
        let doubled = TaxYear {
            inflation_factor: 2.0,
            ..base
        };
        for agi in [25_000.0, 90_000.0, 400_000.0] {
            let t1 = engine.federal_tax(agi, &base);
            let t2 = engine.federal_tax(2.0 * agi, &doubled);
            assert!((t2 - 2.0 * t1).abs() < 1e-6, "{status:?} at {agi}: {t1} vs {t2}");
        }
    }
}

#[test]
fn test_senior_deduction_per_filer() {
    let tables = TaxTables::default();
    let engine = TaxEngine::new(&tables);
    let single = engine.standard_deduction(&tax_year(2025, FilingStatus::Single, 1));
    assert!((single - 16_550.0).abs() < 1e-9);

    let couple = engine.standard_deduction(&tax_year(2025, FilingStatus::MarriedFilingJointly, 2));
    assert!((couple - 32_300.0).abs() < 1e-9);

    let pre_tcja = engine.standard_deduction(&tax_year(2026, FilingStatus::Single, 0));
    assert!((pre_tcja - 8_250.0).abs() < 1e-9);
}

#[test]
fn test_irmaa_surcharge_per_enrolled_person() {
    let tables = TaxTables::default();
    let engine = TaxEngine::new(&tables);
    let ctx = TaxYear {
        irmaa_magi: Some(300_000.0),
        ..tax_year(2025, FilingStatus::MarriedFilingJointly, 2)
    };
    let assessment = engine.compute_tax(&pension_of(100_000.0), &ctx);
    assert!((assessment.irmaa - 4_192.80).abs() < 1e-6, "irmaa {}", assessment.irmaa);
    assert!((assessment.total() - assessment.federal_tax - 4_192.80).abs() < 1e-6);

    let below = TaxYear {
        irmaa_magi: Some(205_000.0),
        ..ctx
    };
    assert_eq!(engine.compute_tax(&pension_of(100_000.0), &below).irmaa, 0.0);

    let nobody_enrolled = TaxYear { seniors: 0, ..ctx };
    assert_eq!(engine.compute_tax(&pension_of(100_000.0), &nobody_enrolled).irmaa, 0.0);

    let no_history = TaxYear {
        irmaa_magi: None,
        ..ctx
    };
    assert_eq!(engine.compute_tax(&pension_of(100_000.0), &no_history).irmaa, 0.0);
}

#[test]
fn test_social_security_taxable_share() {
    let components = IncomeComponents {
        social_security: 20_000.0,
        ..Default::default()
    };
    let tables = TaxTables::default();
    let engine = TaxEngine::new(&tables);
    let assessment = engine.compute_tax(&components, &tax_year(2025, FilingStatus::Single, 1));
    assert!((assessment.adjusted_gross_income - 17_000.0).abs() < 1e-9);
    assert!((assessment.taxable_income - 450.0).abs() < 1e-9);
}

#[test]
fn test_irmaa_looks_back_two_years() {
    // Pension pushes MAGI over the first tier from the first year on
    let plan = PlanBuilder::new()
        .start_year(START_YEAR)
        .individual(Individual::new("Retiree", 1955, 95).pension(110_000.0, 65))
        .rate_mode(zero_rates())
        .build()
        .unwrap();
    let outcome = ScenarioRunner::new(&plan).run(0);
    // First-tier surcharge in 2025 dollars
    let surcharge = 838.80 * plan.tax_tables().index_factor(START_YEAR);

    assert_eq!(outcome.years[0].tax.irmaa, 0.0);
    assert_eq!(outcome.years[1].tax.irmaa, 0.0);
    assert!((outcome.years[2].tax.irmaa - surcharge).abs() < 1e-6);

    let with_prior = PlanBuilder::new()
        .start_year(START_YEAR)
        .individual(Individual::new("Retiree", 1955, 95).pension(110_000.0, 65))
        .rate_mode(zero_rates())
        .prior_magi(110_000.0)
        .build()
        .unwrap();
    let outcome = ScenarioRunner::new(&with_prior).run(0);
    assert!((outcome.years[0].tax.irmaa - surcharge).abs() < 1e-6);
}

#[test]
fn test_tables_carried_from_base_year_to_plan_start() {
    let plan_starting = |start: i16| {
        PlanBuilder::new()
            .start_year(start)
            .individual(Individual::new("Retiree", 1950, 99).pension(80_000.0, 65))
            .rate_mode(zero_rates())
            .build()
            .unwrap()
    };
    let early = plan_starting(2024);
    let late = plan_starting(2030);
    let first = &ScenarioRunner::new(&early).run(0).years[0];
    let later = &ScenarioRunner::new(&late).run(0).years[0];

    // 2024 is the tables' own year: 14,600 + 1,950, current law
    assert!((first.tax.deduction - 16_550.0).abs() < 1e-9);
    // 2030 uses pre-2017 tables carried six years forward
    let factor = 1.025f64.powi(6);
    assert!((later.tax.deduction - (8_250.0 + 1_950.0) * factor).abs() < 1e-6);

    // Same nominal pension, higher nominal brackets: 2030 pays the
    // pre-2017 schedule on thresholds scaled by the same factor
    let taxable = 80_000.0 - later.tax.deduction;
    let expected = 12_100.0 * factor * 0.10
        + (49_300.0 * factor - 12_100.0 * factor) * 0.15
        + (taxable - 49_300.0 * factor) * 0.25;
    assert!((later.tax.federal_tax - expected).abs() < 1e-6, "tax {}", later.tax.federal_tax);

    let tables = TaxTables::default();
    let base = tax_year(2030, FilingStatus::Single, 1);
    let unindexed = TaxEngine::new(&tables).federal_tax(80_000.0, &base);
    let indexed = TaxEngine::starting_in(&tables, 2030).federal_tax(80_000.0, &base);
    assert!(indexed < unindexed);
    assert!((indexed - later.tax.federal_tax).abs() < 1e-6);
}
