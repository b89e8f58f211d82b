//! Plain-text reports for the terminal

use std::fmt::Write;

use nestegg_core::model::{HistoricalSweep, MonteCarloSummary, ScenarioOutcome};
use nestegg_core::optimization::RothOptimization;

/// Format a currency value without cents, e.g. `-$12,345`
pub fn format_currency(value: f64) -> String {
    let dollars = value.abs().round() as i64;
    let digits = dollars.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if value < 0.0 && dollars > 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Year-by-year table of a single scenario
pub fn scenario_table(outcome: &ScenarioOutcome, heirs_tax_rate: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} {:>12} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "Year", "Target", "Net", "Withdrawn", "RMD", "Tax", "Balance"
    );
    for y in &outcome.years {
        let _ = writeln!(
            out,
            "{:>5} {:>12} {:>12} {:>12} {:>12} {:>12} {:>14}{}",
            y.year,
            format_currency(y.target_income),
            format_currency(y.net_income),
            format_currency(y.withdrawals.total()),
            format_currency(y.total_rmd()),
            format_currency(y.tax.total()),
            format_currency(y.closing_balances().total()),
            if y.failed { "  SHORT" } else { "" },
        );
    }

    let estate = outcome.estate(heirs_tax_rate);
    let _ = writeln!(out);
    match outcome.first_failure() {
        Some(n) => {
            let _ = writeln!(
                out,
                "Ran short in {} (year {}), total shortfall {}",
                outcome.start_year + n as i16,
                n + 1,
                format_currency(outcome.total_shortfall())
            );
        }
        None => {
            let _ = writeln!(out, "Every year funded");
        }
    }
    let _ = writeln!(
        out,
        "Estate after heirs' tax: {} ({} nominal)",
        format_currency(estate.value),
        format_currency(estate.nominal)
    );
    out
}

pub fn historical_summary(sweep: &HistoricalSweep) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>6} {:>10} {:>14}", "Start", "Result", "Estate");
    for o in &sweep.outcomes {
        let result = match o.first_failure {
            Some(n) => format!("fails y{}", n + 1),
            None => "ok".to_string(),
        };
        let _ = writeln!(
            out,
            "{:>6} {:>10} {:>14}",
            o.start_year,
            result,
            format_currency(o.estate.value)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Success rate {} over {} start years, mean estate {}",
        format_percentage(sweep.success_rate()),
        sweep.outcomes.len(),
        format_currency(sweep.mean_estate())
    );
    if sweep.cancelled {
        let _ = writeln!(out, "Cancelled after {} of {}", sweep.outcomes.len(), sweep.requested);
    }
    out
}

pub fn monte_carlo_summary(summary: &MonteCarloSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Success rate {} over {} scenarios",
        format_percentage(summary.success_rate()),
        summary.completed
    );
    let _ = writeln!(out, "Mean estate {}", format_currency(summary.mean_estate()));
    for p in [0.05, 0.25, 0.5, 0.75, 0.95] {
        if let Some(value) = summary.percentile(p) {
            let _ = writeln!(out, "  P{:<3} {}", (p * 100.0).round(), format_currency(value));
        }
    }
    if summary.cancelled {
        let _ = writeln!(out, "Cancelled after {} of {}", summary.completed, summary.requested);
    }
    out
}

pub fn roth_summary(result: &RothOptimization) -> String {
    let mut out = String::new();
    let start_year = result.plan.start_year();
    let names: Vec<&str> = result
        .plan
        .individuals()
        .iter()
        .map(|p| p.name.as_str())
        .collect();

    let _ = write!(out, "{:>5}", "Year");
    for name in &names {
        let _ = write!(out, " {name:>14}");
    }
    let _ = writeln!(out);
    let horizon = result.conversions.first().map_or(0, Vec::len);
    for n in 0..horizon {
        if result.conversions.iter().all(|row| row[n] == 0.0) {
            continue;
        }
        let _ = write!(out, "{:>5}", start_year + n as i16);
        for row in &result.conversions {
            let _ = write!(out, " {:>14}", format_currency(row[n]));
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Estate {} vs {} without conversions ({} gain)",
        format_currency(result.estate),
        format_currency(result.baseline_estate),
        format_currency(result.improvement())
    );
    let _ = writeln!(
        out,
        "{} simulations, stopped: {:?}",
        result.evaluations, result.termination_reason
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(1_234_567.8), "$1,234,568");
        assert_eq!(format_currency(-40_000.0), "-$40,000");
        assert_eq!(format_currency(-0.2), "$0");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.25), "25.0%");
        assert_eq!(format_percentage(1.0), "100.0%");
    }

    #[test]
    fn test_monte_carlo_summary_lists_percentiles() {
        let summary = MonteCarloSummary {
            requested: 4,
            completed: 4,
            successes: 3,
            estates: vec![0.0, 100.0, 200.0, 300.0],
            cancelled: false,
        };
        let text = monte_carlo_summary(&summary);
        assert!(text.contains("75.0%"));
        assert!(text.contains("P50"));
        assert!(!text.contains("Cancelled"));
    }
}
