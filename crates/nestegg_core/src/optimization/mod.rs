//! Roth conversion optimization
//!
//! Searches the per-year conversion schedule for the one that leaves heirs
//! the most after-tax wealth without breaking any year's income target.
//!
//! # Example
//!
//! ```ignore
//! use nestegg_core::optimization::{RothOptimizerConfig, optimize_roth};
//!
//! let settings = RothOptimizerConfig::new(0.25, 64_000.0, 1_000.0);
//! let result = optimize_roth(&plan, &settings, None)?;
//! println!("Estate gain: ${:.0}", result.improvement());
//! ```

mod config;
mod result;
mod search;

pub use config::RothOptimizerConfig;
pub use result::{ConvergenceHistory, PassRecord, RothOptimization, TerminationReason};
pub use search::{Conversions, Evaluation, SearchState, optimize_roth};
