//! Required Minimum Distribution (RMD) tables and calculations
//!
//! The IRS requires minimum withdrawals from tax-deferred accounts once the
//! owner reaches an age set by birth cohort (72, 73 or 75 under SECURE 2.0).

use serde::{Deserialize, Serialize};

/// IRS Uniform Lifetime Table for calculating Required Minimum Distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmdTable {
    pub entries: Vec<RmdTableEntry>,
}

/// Single entry in the RMD table mapping age to IRS divisor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RmdTableEntry {
    pub age: u16,
    pub divisor: f64,
}

/// Uniform Lifetime divisors for ages 72 through 120
const UNIFORM_LIFETIME_DIVISORS: [f64; 49] = [
    27.4, 26.5, 25.5, 24.6, 23.7, 22.9, 22.0, 21.1, 20.2, 19.4, // 72-81
    18.5, 17.7, 16.8, 16.0, 15.2, 14.4, 13.7, 12.9, 12.2, 11.5, // 82-91
    10.8, 10.1, 9.5, 8.9, 8.4, 7.8, 7.3, 6.8, 6.4, 6.0, // 92-101
    5.6, 5.2, 4.9, 4.6, 4.3, 4.1, 3.9, 3.7, 3.5, 3.4, // 102-111
    3.3, 3.1, 3.0, 2.9, 2.8, 2.7, 2.5, 2.3, 2.0, // 112-120
];

impl Default for RmdTable {
    fn default() -> Self {
        Self::irs_uniform_lifetime_2024()
    }
}

impl RmdTable {
    /// IRS Uniform Lifetime Table (2022 revision, in force for 2024)
    #[must_use]
    pub fn irs_uniform_lifetime_2024() -> Self {
        RmdTable {
            entries: UNIFORM_LIFETIME_DIVISORS
                .iter()
                .zip(72u16..)
                .map(|(&divisor, age)| RmdTableEntry { age, divisor })
                .collect(),
        }
    }

    /// Divisor for a specific age. Ages past the end of the table reuse the
    /// last entry ("120 and over").
    #[must_use]
    pub fn divisor_for_age(&self, age: u16) -> Option<f64> {
        let first = self.entries.first()?;
        if age < first.age {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.age == age)
            .or(self.entries.last())
            .map(|e| e.divisor)
    }

    /// Distribution due this year given the prior year-end balance.
    #[must_use]
    pub fn required_distribution(&self, birth_year: i16, age: u16, prior_balance: f64) -> f64 {
        if age < rmd_start_age(birth_year) || prior_balance <= 0.0 {
            return 0.0;
        }
        self.divisor_for_age(age)
            .map_or(0.0, |divisor| prior_balance / divisor)
    }
}

/// First age at which distributions are required, by birth cohort.
#[must_use]
pub fn rmd_start_age(birth_year: i16) -> u16 {
    match birth_year {
        ..=1950 => 72,
        1951..=1959 => 73,
        _ => 75,
    }
}
