use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::history::{self, WindowStatistics};
use crate::error::RateDataRangeError;

// ============================================================================
// Asset classes and rate sets
// ============================================================================

/// The four asset classes every rate set and weight vector is indexed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    CorporateBonds,
    TreasuryNotes,
    /// Inflation-tracking holdings (e.g. TIPS), growing with CPI
    InflationTracking,
}

pub const ASSET_CLASSES: [AssetClass; 4] = [
    AssetClass::Equity,
    AssetClass::CorporateBonds,
    AssetClass::TreasuryNotes,
    AssetClass::InflationTracking,
];

impl AssetClass {
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            AssetClass::Equity => 0,
            AssetClass::CorporateBonds => 1,
            AssetClass::TreasuryNotes => 2,
            AssetClass::InflationTracking => 3,
        }
    }
}

/// One year's annual rates, as decimals (0.07 = 7%)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSet([f64; 4]);

impl RateSet {
    #[must_use]
    pub const fn new(equity: f64, corporate_bonds: f64, treasury_notes: f64, inflation: f64) -> Self {
        Self([equity, corporate_bonds, treasury_notes, inflation])
    }

    #[must_use]
    pub const fn from_values(values: [f64; 4]) -> Self {
        Self(values)
    }

    #[must_use]
    pub const fn values(&self) -> [f64; 4] {
        self.0
    }

    #[must_use]
    pub fn rate(&self, class: AssetClass) -> f64 {
        self.0[class.index()]
    }

    #[must_use]
    pub fn inflation(&self) -> f64 {
        self.0[AssetClass::InflationTracking.index()]
    }

    /// Weighted annual return of a portfolio holding `weights`.
    #[must_use]
    pub fn portfolio_return(&self, weights: &[f64; 4]) -> f64 {
        self.0.iter().zip(weights).map(|(r, w)| r * w).sum()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// Cumulative inflation factors: entry `n` is the growth of one dollar of
/// plan-start money through the end of year `n - 1` (entry 0 is 1.0).
#[must_use]
pub fn cumulative_inflation_factors(rates: &[RateSet]) -> Vec<f64> {
    let mut factors = Vec::with_capacity(rates.len() + 1);
    let mut acc = 1.0;
    factors.push(acc);
    for r in rates {
        acc *= 1.0 + r.inflation();
        factors.push(acc);
    }
    factors
}

// ============================================================================
// Rate generation modes
// ============================================================================

/// How annual rates are produced for a scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RateMode {
    /// The same rates every year
    Fixed { rates: RateSet },
    /// Arithmetic mean of the window, every year
    Average { from: i16, to: i16 },
    /// Replay history from `from`, wrapping back to `from` after `to`
    Historical { from: i16, to: Option<i16> },
    /// Independent multivariate-normal draws fit to the window
    Stochastic { from: i16, to: Option<i16> },
    /// Caller-supplied forward-looking outlook, constant every year
    Realistic { rates: RateSet },
}

impl RateMode {
    /// Only stochastic realizations vary between runs.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, RateMode::Stochastic { .. })
    }

    /// Validate parameters against the bundled dataset.
    pub fn validate(&self) -> Result<(), RateDataRangeError> {
        match *self {
            RateMode::Fixed { .. } | RateMode::Realistic { .. } => Ok(()),
            RateMode::Average { from, to } => history::check_window(from, to),
            RateMode::Historical { from, to } | RateMode::Stochastic { from, to } => {
                history::check_window(from, to.unwrap_or(history::LAST_YEAR))
            }
        }
    }
}

// ============================================================================
// Rate provider
// ============================================================================

/// Multivariate normal over the four asset classes, sampled as
/// `mean + L z` with `L` the Cholesky factor of the covariance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultivariateNormal {
    mean: [f64; 4],
    factor: [[f64; 4]; 4],
}

impl MultivariateNormal {
    #[must_use]
    pub fn from_statistics(stats: &WindowStatistics) -> Self {
        Self {
            mean: stats.mean,
            factor: cholesky(&stats.covariance),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RateSet {
        let z: [f64; 4] = std::array::from_fn(|_| StandardNormal.sample(rng));
        let mut out = self.mean;
        for (i, row) in self.factor.iter().enumerate() {
            out[i] += row.iter().zip(&z).map(|(l, z)| l * z).sum::<f64>();
        }
        RateSet(out)
    }
}

/// Lower-triangular Cholesky factor. Pivots that round to zero or below
/// (degenerate windows) are clamped so the factor stays finite.
fn cholesky(a: &[[f64; 4]; 4]) -> [[f64; 4]; 4] {
    let mut l = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                l[i][j] = (a[i][i] - dot).max(0.0).sqrt();
            } else if l[j][j] > 1e-12 {
                l[i][j] = (a[i][j] - dot) / l[j][j];
            }
        }
    }
    l
}

/// Validated generator for a [`RateMode`]
#[derive(Debug, Clone, PartialEq)]
pub struct RateProvider {
    source: RateSource,
}

#[derive(Debug, Clone, PartialEq)]
enum RateSource {
    Constant(RateSet),
    Replay(Vec<RateSet>),
    Normal(MultivariateNormal),
}

impl RateProvider {
    /// Resolve the mode against the bundled history. Window errors surface
    /// here, never during generation.
    pub fn new(mode: &RateMode) -> Result<Self, RateDataRangeError> {
        mode.validate()?;
        let source = match *mode {
            RateMode::Fixed { rates } | RateMode::Realistic { rates } => {
                RateSource::Constant(rates)
            }
            RateMode::Average { from, to } => {
                RateSource::Constant(RateSet(WindowStatistics::fit(from, to)?.mean))
            }
            RateMode::Historical { from, to } => {
                RateSource::Replay(history::window(from, to.unwrap_or(history::LAST_YEAR))?)
            }
            RateMode::Stochastic { from, to } => {
                let stats = WindowStatistics::fit(from, to.unwrap_or(history::LAST_YEAR))?;
                RateSource::Normal(MultivariateNormal::from_statistics(&stats))
            }
        };
        Ok(Self { source })
    }

    /// Produce one rate set per simulated year. Only the stochastic mode
    /// consumes randomness; every call yields a fresh realization.
    pub fn generate<R: Rng + ?Sized>(&self, horizon: usize, rng: &mut R) -> Vec<RateSet> {
        match &self.source {
            RateSource::Constant(rates) => vec![*rates; horizon],
            RateSource::Replay(window) => (0..horizon).map(|i| window[i % window.len()]).collect(),
            RateSource::Normal(mvn) => (0..horizon).map(|_| mvn.sample(rng)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cholesky_reproduces_matrix() {
        let a = [
            [4.0, 2.0, 0.4, 0.0],
            [2.0, 5.0, 1.0, 0.0],
            [0.4, 1.0, 3.0, 0.5],
            [0.0, 0.0, 0.5, 1.0],
        ];
        let l = cholesky(&a);
        for i in 0..4 {
            for j in 0..4 {
                let v: f64 = (0..4).map(|k| l[i][k] * l[j][k]).sum();
                assert!((v - a[i][j]).abs() < 1e-12, "entry ({i},{j}) = {v}");
            }
        }
    }

    #[test]
    fn portfolio_return_is_weighted_sum() {
        let r = RateSet::new(0.10, 0.05, 0.03, 0.02);
        let got = r.portfolio_return(&[0.5, 0.0, 0.5, 0.0]);
        assert!((got - 0.065).abs() < 1e-12);
    }

    #[test]
    fn inflation_factors_start_at_one() {
        let r = RateSet::new(0.0, 0.0, 0.0, 0.10);
        let f = cumulative_inflation_factors(&[r, r]);
        assert_eq!(f.len(), 3);
        assert!((f[2] - 1.21).abs() < 1e-12);
    }
}
