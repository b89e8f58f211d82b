mod logging;
mod plan_file;
mod report;

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;

use nestegg_core::config::PlanConfig;
use nestegg_core::model::history;
use nestegg_core::observer::{NullObserver, SimulationObserver, TracingObserver};
use nestegg_core::optimization::{RothOptimizerConfig, optimize_roth};
use nestegg_core::sweep::{SweepProgress, run_historical, run_monte_carlo};

use crate::logging::init_logging;
use crate::plan_file::PlanFile;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(name = "nestegg")]
#[command(about = "Retirement savings simulator and Roth conversion planner")]
struct Args {
    /// Path to the YAML plan file
    #[arg(short, long)]
    plan: PathBuf,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write logs to nestegg.log in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate the plan once under its own rate assumptions
    Run {
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Log every simulated year
        #[arg(long)]
        trace: bool,

        /// Write the full year-by-year outcome as YAML
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replay history from every start year in a range
    Historical {
        #[arg(long, default_value_t = history::FIRST_YEAR)]
        from: i16,

        /// Last start year (default: the last one whose horizon fits in the data)
        #[arg(long)]
        to: Option<i16>,
    },

    /// Random scenarios drawn from a fit to a historical window
    MonteCarlo {
        #[arg(short = 'n', long, default_value_t = 1_000)]
        scenarios: usize,

        #[arg(long, default_value_t = history::FIRST_YEAR)]
        from: i16,

        #[arg(long, default_value_t = history::LAST_YEAR)]
        to: i16,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Search for the Roth conversion schedule that maximizes the estate
    OptimizeRoth {
        /// Defaults to the plan's heirs' tax rate
        #[arg(long)]
        heirs_tax_rate: Option<f64>,

        #[arg(long, default_value_t = 64_000.0)]
        start_conv: f64,

        #[arg(long, default_value_t = 1_000.0)]
        min_conv: f64,

        #[arg(long, default_value_t = 50_000)]
        max_evaluations: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

/// Run `work` while a watcher thread logs `progress`
fn with_progress<T>(label: &str, progress: &SweepProgress, work: impl FnOnce() -> T) -> T {
    let done = AtomicBool::new(false);
    thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Relaxed) {
                thread::sleep(PROGRESS_INTERVAL);
                tracing::info!(
                    task = label,
                    completed = progress.completed(),
                    total = progress.total(),
                    "progress"
                );
            }
        });
        let result = work();
        done.store(true, Ordering::Relaxed);
        result
    })
}

/// Last start year whose horizon is covered without wrapping
fn default_last_start(plan: &PlanConfig, from: i16) -> i16 {
    let horizon = i16::try_from(plan.horizon()).unwrap_or(i16::MAX);
    history::LAST_YEAR
        .saturating_sub(horizon)
        .saturating_add(1)
        .max(from)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _guard = init_logging(args.log_dir.as_deref(), &args.log_level)?;

    let plan = PlanFile::load(&args.plan)?.build()?;
    tracing::info!(
        plan = %args.plan.display(),
        start_year = plan.start_year(),
        horizon = plan.horizon(),
        "plan loaded"
    );

    match args.command {
        Command::Run {
            seed,
            trace,
            output,
        } => {
            let observer: &dyn SimulationObserver = if trace {
                &TracingObserver
            } else {
                &NullObserver
            };
            let heirs_tax_rate = plan.heirs_tax_rate();
            let outcome = nestegg_core::run(plan, seed, observer);
            print!("{}", report::scenario_table(&outcome, heirs_tax_rate));
            if let Some(path) = output {
                let yaml = serde_saphyr::to_string(&outcome)
                    .wrap_err("Failed to serialize scenario outcome")?;
                fs::write(&path, yaml)
                    .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            }
        }
        Command::Historical { from, to } => {
            let to = to.unwrap_or_else(|| default_last_start(&plan, from));
            let progress = SweepProgress::default();
            let sweep = with_progress("historical", &progress, || {
                run_historical(&plan, from, to, Some(&progress))
            })?;
            print!("{}", report::historical_summary(&sweep));
        }
        Command::MonteCarlo {
            scenarios,
            from,
            to,
            seed,
        } => {
            let progress = SweepProgress::default();
            let summary = with_progress("monte carlo", &progress, || {
                run_monte_carlo(&plan, scenarios, from, to, seed, Some(&progress))
            })?;
            print!("{}", report::monte_carlo_summary(&summary));
        }
        Command::OptimizeRoth {
            heirs_tax_rate,
            start_conv,
            min_conv,
            max_evaluations,
            seed,
        } => {
            let settings = RothOptimizerConfig {
                heirs_tax_rate: heirs_tax_rate.unwrap_or(plan.heirs_tax_rate()),
                start_conv,
                min_conv,
                max_evaluations,
                seed,
            };
            let progress = SweepProgress::default();
            let result = with_progress("roth search", &progress, || {
                optimize_roth(&plan, &settings, Some(&progress))
            })?;
            print!("{}", report::roth_summary(&result));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_monte_carlo() {
        let args = Args::try_parse_from([
            "nestegg", "--plan", "plan.yaml", "monte-carlo", "-n", "250", "--seed", "9",
        ])
        .unwrap();
        match args.command {
            Command::MonteCarlo {
                scenarios,
                from,
                to,
                seed,
            } => {
                assert_eq!(scenarios, 250);
                assert_eq!(seed, 9);
                assert_eq!(from, history::FIRST_YEAR);
                assert_eq!(to, history::LAST_YEAR);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_default_last_start_fits_horizon() {
        let yaml = r#"
start_year: 2025
individuals:
  - name: Solo
    birth_year: 1962
    life_expectancy: 93
income:
  amount: 40000
"#;
        let plan = PlanFile::from_yaml(yaml).unwrap().build().unwrap();
        assert_eq!(plan.horizon(), 31);
        assert_eq!(default_last_start(&plan, 1928), 1992);
        assert_eq!(default_last_start(&plan, 2000), 2000);
    }
}
