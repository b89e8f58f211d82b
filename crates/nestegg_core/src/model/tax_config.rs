//! Federal tax tables: brackets by filing status and regime, standard
//! deductions, and Medicare IRMAA tiers. All amounts are 2024 figures. They
//! are carried to the plan start year at an assumed inflation rate, then
//! indexed by the inflation realized along the simulated path.

use serde::{Deserialize, Serialize};

/// A single federal income tax bracket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Income threshold where this bracket begins
    pub threshold: f64,
    /// Marginal tax rate for income in this bracket (e.g., 0.22 for 22%)
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    MarriedFilingJointly,
}

/// Which body of tax law applies in a calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxRegime {
    /// TCJA brackets, in force through 2025
    CurrentLaw,
    /// 2017 brackets (inflated to 2024), from the sunset year on
    PreTcja,
}

/// Amounts that differ between single and joint filers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByStatus<T> {
    pub single: T,
    pub married_filing_jointly: T,
}

impl<T> ByStatus<T> {
    #[must_use]
    pub fn get(&self, status: FilingStatus) -> &T {
        match status {
            FilingStatus::Single => &self.single,
            FilingStatus::MarriedFilingJointly => &self.married_filing_jointly,
        }
    }
}

/// One IRMAA tier: surcharge owed per enrolled person when MAGI reaches
/// `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrmaaTier {
    pub threshold: f64,
    pub annual_surcharge: f64,
}

/// Brackets and deduction for one regime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeTables {
    pub brackets: ByStatus<Vec<TaxBracket>>,
    pub standard_deduction: ByStatus<f64>,
}

/// Complete federal tax assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxTables {
    /// Year the amounts were legislated for
    pub base_year: i16,
    /// Annual inflation assumed between `base_year` and the plan start
    pub assumed_inflation: f64,
    /// First calendar year taxed under the pre-TCJA tables
    pub sunset_year: i16,
    pub current_law: RegimeTables,
    pub pre_tcja: RegimeTables,
    /// Extra deduction per filer aged 65 or older
    pub senior_deduction: ByStatus<f64>,
    /// Tiers ascending by threshold; the first tier carries no surcharge
    pub irmaa: ByStatus<Vec<IrmaaTier>>,
    /// Share of social security benefits included in taxable income
    pub social_security_taxable_share: f64,
    /// Age at which IRMAA and the senior deduction apply
    pub medicare_age: u16,
}

fn brackets(rows: &[(f64, f64)]) -> Vec<TaxBracket> {
    rows.iter()
        .map(|&(threshold, rate)| TaxBracket { threshold, rate })
        .collect()
}

fn irmaa_tiers(thresholds: [f64; 5]) -> Vec<IrmaaTier> {
    const SURCHARGES: [f64; 5] = [838.80, 2_096.40, 3_354.00, 4_611.60, 5_031.60];
    std::iter::once(IrmaaTier {
        threshold: 0.0,
        annual_surcharge: 0.0,
    })
    .chain(
        thresholds
            .into_iter()
            .zip(SURCHARGES)
            .map(|(threshold, annual_surcharge)| IrmaaTier {
                threshold,
                annual_surcharge,
            }),
    )
    .collect()
}

impl Default for TaxTables {
    /// 2024 federal tables, with the 2017 tables inflated to 2024 for the
    /// post-2025 sunset
    fn default() -> Self {
        Self {
            base_year: 2024,
            assumed_inflation: 0.025,
            sunset_year: 2026,
            current_law: RegimeTables {
                brackets: ByStatus {
                    single: brackets(&[
                        (0.0, 0.10),
                        (11_600.0, 0.12),
                        (47_150.0, 0.22),
                        (100_525.0, 0.24),
                        (191_950.0, 0.32),
                        (243_725.0, 0.35),
                        (609_350.0, 0.37),
                    ]),
                    married_filing_jointly: brackets(&[
                        (0.0, 0.10),
                        (23_200.0, 0.12),
                        (94_300.0, 0.22),
                        (201_050.0, 0.24),
                        (383_900.0, 0.32),
                        (487_450.0, 0.35),
                        (731_200.0, 0.37),
                    ]),
                },
                standard_deduction: ByStatus {
                    single: 14_600.0,
                    married_filing_jointly: 29_200.0,
                },
            },
            pre_tcja: RegimeTables {
                brackets: ByStatus {
                    single: brackets(&[
                        (0.0, 0.10),
                        (12_100.0, 0.15),
                        (49_300.0, 0.25),
                        (119_500.0, 0.28),
                        (249_100.0, 0.33),
                        (541_700.0, 0.35),
                        (543_900.0, 0.396),
                    ]),
                    married_filing_jointly: brackets(&[
                        (0.0, 0.10),
                        (24_200.0, 0.15),
                        (98_700.0, 0.25),
                        (199_000.0, 0.28),
                        (303_350.0, 0.33),
                        (541_700.0, 0.35),
                        (611_900.0, 0.396),
                    ]),
                },
                standard_deduction: ByStatus {
                    single: 8_250.0,
                    married_filing_jointly: 16_500.0,
                },
            },
            senior_deduction: ByStatus {
                single: 1_950.0,
                married_filing_jointly: 1_550.0,
            },
            irmaa: ByStatus {
                single: irmaa_tiers([103_000.0, 129_000.0, 161_000.0, 193_000.0, 500_000.0]),
                married_filing_jointly: irmaa_tiers([
                    206_000.0, 258_000.0, 322_000.0, 386_000.0, 750_000.0,
                ]),
            },
            social_security_taxable_share: 0.85,
            medicare_age: 65,
        }
    }
}

impl TaxTables {
    /// Factor carrying base-year amounts into `year` dollars. Years before
    /// the base year deflate.
    #[must_use]
    pub fn index_factor(&self, year: i16) -> f64 {
        (1.0 + self.assumed_inflation).powi(i32::from(year) - i32::from(self.base_year))
    }

    #[must_use]
    pub fn regime(&self, year: i16) -> TaxRegime {
        if year < self.sunset_year {
            TaxRegime::CurrentLaw
        } else {
            TaxRegime::PreTcja
        }
    }

    #[must_use]
    pub fn regime_tables(&self, regime: TaxRegime) -> &RegimeTables {
        match regime {
            TaxRegime::CurrentLaw => &self.current_law,
            TaxRegime::PreTcja => &self.pre_tcja,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_factor_from_base_year() {
        let tables = TaxTables::default();
        assert_eq!(tables.index_factor(2024), 1.0);
        assert!((tables.index_factor(2026) - 1.025f64.powi(2)).abs() < 1e-12);
        assert!((tables.index_factor(2023) - 1.0 / 1.025).abs() < 1e-12);
    }
}
