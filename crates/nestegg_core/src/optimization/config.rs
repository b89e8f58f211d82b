//! Roth conversion search settings

use serde::{Deserialize, Serialize};

use crate::config::PlanBuilder;
use crate::error::ConfigError;

/// Settings for [`optimize_roth`](super::optimize_roth)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RothOptimizerConfig {
    /// Rate heirs pay on inherited tax-deferred balances
    #[serde(default = "default_heirs_tax_rate")]
    pub heirs_tax_rate: f64,

    /// Initial perturbation applied to each year's conversion
    #[serde(default = "default_start_conv")]
    pub start_conv: f64,

    /// Search stops once the step is halved below this amount
    #[serde(default = "default_min_conv")]
    pub min_conv: f64,

    /// Upper bound on full-horizon simulations
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: usize,

    /// Seed shared by every trial so stochastic plans compare on one path
    #[serde(default)]
    pub seed: u64,
}

fn default_heirs_tax_rate() -> f64 {
    PlanBuilder::DEFAULT_HEIRS_TAX_RATE
}

fn default_start_conv() -> f64 {
    64_000.0
}

fn default_min_conv() -> f64 {
    1_000.0
}

fn default_max_evaluations() -> usize {
    50_000
}

impl Default for RothOptimizerConfig {
    fn default() -> Self {
        Self {
            heirs_tax_rate: default_heirs_tax_rate(),
            start_conv: default_start_conv(),
            min_conv: default_min_conv(),
            max_evaluations: default_max_evaluations(),
            seed: 0,
        }
    }
}

impl RothOptimizerConfig {
    #[must_use]
    pub fn new(heirs_tax_rate: f64, start_conv: f64, min_conv: f64) -> Self {
        Self {
            heirs_tax_rate,
            start_conv,
            min_conv,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.heirs_tax_rate) {
            return Err(ConfigError::FractionOutOfRange {
                field: "heirs tax rate",
                value: self.heirs_tax_rate,
            });
        }
        for (field, value) in [("start_conv", self.start_conv), ("min_conv", self.min_conv)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NegativeAmount { field, value });
            }
        }
        Ok(())
    }
}
