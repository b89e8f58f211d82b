//! Asset allocation across accounts and years
//!
//! Every account gets a four-class weight vector per simulated year. Glide
//! paths blend an initial vector into a final one over the horizon, either
//! linearly or along an s-curve. Coordinated plans specify an aggregate ratio
//! and pack classes into accounts by tax treatment, so the per-account weights
//! depend on balances and are recomputed each year.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{AccountLedger, AccountWeights, AssetClass, Balances, TaxStatus, slot};

/// Fractions of an account held in each asset class, summing to 1
pub type Weights = [f64; 4];

const WEIGHT_TOLERANCE: f64 = 1e-4;

/// Weights at the first and last simulated year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlidePath {
    pub initial: Weights,
    #[serde(rename = "final")]
    pub target: Weights,
}

impl GlidePath {
    #[must_use]
    pub const fn constant(weights: Weights) -> Self {
        Self {
            initial: weights,
            target: weights,
        }
    }

    #[must_use]
    pub const fn new(initial: Weights, target: Weights) -> Self {
        Self { initial, target }
    }

    /// Blend by `fraction` in [0, 1]
    #[must_use]
    pub fn at(&self, fraction: f64) -> Weights {
        std::array::from_fn(|k| self.initial[k] + (self.target[k] - self.initial[k]) * fraction)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_weights(&self.initial)?;
        validate_weights(&self.target)
    }
}

/// Glide paths for one individual's three accounts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountPaths {
    pub taxable: GlidePath,
    pub tax_deferred: GlidePath,
    pub tax_free: GlidePath,
}

impl AccountPaths {
    /// The same path for all three accounts
    #[must_use]
    pub const fn uniform(path: GlidePath) -> Self {
        Self {
            taxable: path,
            tax_deferred: path,
            tax_free: path,
        }
    }
}

/// How allocation targets relate to accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "coordination", rename_all = "snake_case")]
pub enum AllocationPlan {
    /// Each account independently follows its own path
    Accounts { paths: Vec<AccountPaths> },
    /// One aggregate path per individual, packed across that person's accounts
    Individual { paths: Vec<GlidePath> },
    /// One aggregate path packed across the whole household
    Household { path: GlidePath },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Interpolation {
    #[default]
    Linear,
    /// Sigmoid blend centered on the horizon midpoint; larger steepness
    /// keeps the ends flatter
    SCurve { steepness: f64 },
}

impl Interpolation {
    pub const DEFAULT_STEEPNESS: f64 = 6.0;

    /// Map elapsed fraction `t` of the horizon to a blend fraction. Both
    /// methods return exactly 0 at `t = 0` and 1 at `t = 1`.
    #[must_use]
    pub fn blend(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Interpolation::Linear => t,
            Interpolation::SCurve { steepness } => {
                let half = (steepness / 2.0).tanh();
                0.5 * (1.0 + (steepness * (t - 0.5)).tanh() / half)
            }
        }
    }
}

/// Produces per-account weights for every simulated year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    pub plan: AllocationPlan,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl AllocationPolicy {
    #[must_use]
    pub fn new(plan: AllocationPlan, interpolation: Interpolation) -> Self {
        Self {
            plan,
            interpolation,
        }
    }

    /// Every account of every individual held at constant `weights`
    #[must_use]
    pub fn constant(weights: Weights, individuals: usize) -> Self {
        Self::new(
            AllocationPlan::Accounts {
                paths: vec![AccountPaths::uniform(GlidePath::constant(weights)); individuals],
            },
            Interpolation::Linear,
        )
    }

    pub fn validate(&self, individuals: usize) -> Result<(), ConfigError> {
        if let Interpolation::SCurve { steepness } = self.interpolation
            && !(steepness.is_finite() && steepness > 0.0)
        {
            return Err(ConfigError::InvalidSteepness(steepness));
        }
        let shape = |found: usize| {
            if found == individuals {
                Ok(())
            } else {
                Err(ConfigError::AllocationShape {
                    expected: individuals,
                    found,
                })
            }
        };
        match &self.plan {
            AllocationPlan::Accounts { paths } => {
                shape(paths.len())?;
                for p in paths {
                    p.taxable.validate()?;
                    p.tax_deferred.validate()?;
                    p.tax_free.validate()?;
                }
            }
            AllocationPlan::Individual { paths } => {
                shape(paths.len())?;
                for p in paths {
                    p.validate()?;
                }
            }
            AllocationPlan::Household { path } => path.validate()?,
        }
        Ok(())
    }

    /// Blend fraction for year `index` of a `horizon`-year plan
    #[must_use]
    pub fn fraction(&self, index: usize, horizon: usize) -> f64 {
        if horizon <= 1 {
            return 0.0;
        }
        self.interpolation
            .blend(index as f64 / (horizon - 1) as f64)
    }

    /// Weights for every account in year `index`, given current balances
    #[must_use]
    pub fn weights(&self, index: usize, horizon: usize, ledger: &AccountLedger) -> Vec<AccountWeights> {
        let t = self.fraction(index, horizon);
        let owners = ledger.owners();
        match &self.plan {
            AllocationPlan::Accounts { paths } => paths
                .iter()
                .take(owners)
                .map(|p| [p.taxable.at(t), p.tax_deferred.at(t), p.tax_free.at(t)])
                .collect(),
            AllocationPlan::Individual { paths } => paths
                .iter()
                .take(owners)
                .enumerate()
                .map(|(owner, p)| pack(&p.at(t), &[ledger.balances(owner)])[0])
                .collect(),
            AllocationPlan::Household { path } => pack(&path.at(t), &ledger.snapshot()),
        }
    }
}

fn validate_weights(w: &Weights) -> Result<(), ConfigError> {
    let sum: f64 = w.iter().sum();
    if w.iter().any(|v| !v.is_finite() || *v < 0.0) || (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ConfigError::AllocationWeights { sum });
    }
    Ok(())
}

// ============================================================================
// Coordinated packing
// ============================================================================

/// Classes filled tax-free first, highest expected return first
const GROWTH_ORDER: [AssetClass; 3] = [
    AssetClass::Equity,
    AssetClass::CorporateBonds,
    AssetClass::TreasuryNotes,
];
const SHELTER_ORDER: [TaxStatus; 3] = [TaxStatus::TaxFree, TaxStatus::TaxDeferred, TaxStatus::Taxable];

/// Split an aggregate `target` ratio across the accounts of `owners` so the
/// dollar-weighted aggregate matches it. Growth classes fill tax-free, then
/// tax-deferred, then taxable balances; the inflation-tracking class fills in
/// the reverse order. Empty accounts take the target ratio itself.
#[must_use]
pub fn pack(target: &Weights, owners: &[Balances]) -> Vec<AccountWeights> {
    let total: f64 = owners.iter().map(Balances::total).sum();
    let mut dollars = vec![[[0.0; 4]; 3]; owners.len()];
    let mut room: Vec<Balances> = owners.to_vec();

    let mut fill = |class: AssetClass, order: &[TaxStatus]| {
        let mut need = target[class.index()] * total;
        for &status in order {
            for (owner, left) in room.iter_mut().enumerate() {
                if need <= 0.0 {
                    return;
                }
                let take = need.min(left[status]);
                if take > 0.0 {
                    dollars[owner][slot(status)][class.index()] += take;
                    left[status] -= take;
                    need -= take;
                }
            }
        }
    };

    let mut reversed = SHELTER_ORDER;
    reversed.reverse();
    fill(AssetClass::InflationTracking, &reversed[..]);
    for class in GROWTH_ORDER {
        fill(class, &SHELTER_ORDER[..]);
    }

    owners
        .iter()
        .zip(&dollars)
        .map(|(balances, held)| {
            let mut out = [[0.0; 4]; 3];
            for status in SHELTER_ORDER {
                let s = slot(status);
                let balance = balances[status];
                let sum: f64 = held[s].iter().sum();
                out[s] = if balance > 0.0 && sum > 0.0 {
                    held[s].map(|d| d / sum)
                } else {
                    *target
                };
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_blend_endpoints() {
        let path = GlidePath::new([1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(path.at(0.0), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(path.at(1.0), [0.0, 0.0, 1.0, 0.0]);
        let mid = path.at(0.5);
        assert!((mid[0] - 0.5).abs() < 1e-12 && (mid[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_s_curve_shape() {
        let s = Interpolation::SCurve {
            steepness: Interpolation::DEFAULT_STEEPNESS,
        };
        assert!(s.blend(0.0).abs() < 1e-12);
        assert!((s.blend(1.0) - 1.0).abs() < 1e-12);
        assert!((s.blend(0.5) - 0.5).abs() < 1e-12);
        // Flatter than linear near the ends
        assert!(s.blend(0.1) < 0.1);
        assert!(s.blend(0.9) > 0.9);
    }

    #[test]
    fn test_pack_puts_equity_in_tax_free_first() {
        let balances = [Balances::new(100.0, 100.0, 100.0)];
        let w = pack(&[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.0], &balances);
        let tf = w[0][slot(TaxStatus::TaxFree)];
        let tx = w[0][slot(TaxStatus::Taxable)];
        assert!((tf[0] - 1.0).abs() < 1e-9, "tax-free equity {}", tf[0]);
        assert!((tx[2] - 1.0).abs() < 1e-9, "taxable t-notes {}", tx[2]);
    }

    #[test]
    fn test_pack_puts_inflation_in_taxable_first() {
        let balances = [Balances::new(100.0, 100.0, 200.0)];
        let w = pack(&[0.75, 0.0, 0.0, 0.25], &balances);
        let tx = w[0][slot(TaxStatus::Taxable)];
        assert!((tx[3] - 1.0).abs() < 1e-9);
        assert!((w[0][slot(TaxStatus::TaxFree)][0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pack_preserves_aggregate_and_sums() {
        let balances = [Balances::new(50.0, 300.0, 20.0), Balances::new(0.0, 80.0, 150.0)];
        let target = [0.55, 0.15, 0.2, 0.1];
        let w = pack(&target, &balances);
        let total: f64 = balances.iter().map(Balances::total).sum();
        for k in 0..4 {
            let mut held = 0.0;
            for (owner, b) in balances.iter().enumerate() {
                for status in SHELTER_ORDER {
                    let row = w[owner][slot(status)];
                    held += row[k] * b[status];
                }
            }
            assert!((held / total - target[k]).abs() < 1e-9, "class {k}: {}", held / total);
        }
        for row in w.iter().flatten() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert!(row.iter().all(|v| *v >= 0.0));
        }
    }

    #[test]
    fn test_rejects_bad_weights() {
        let policy = AllocationPolicy::constant([0.5, 0.2, 0.2, 0.0], 1);
        assert!(matches!(
            policy.validate(1),
            Err(ConfigError::AllocationWeights { .. })
        ));
    }
}
