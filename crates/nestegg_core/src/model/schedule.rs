use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One individual's planned flows for one calendar year. Every field
/// defaults to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContributionRecord {
    /// Anticipated wages, net of tax-deferred contributions
    pub wages: f64,
    pub taxable: f64,
    pub traditional_401k: f64,
    pub roth_401k: f64,
    pub traditional_ira: f64,
    pub roth_ira: f64,
    /// Requested tax-deferred to tax-free conversion
    pub roth_conversion: f64,
    /// Positive: one-off inflow (inheritance, house sale). Negative: one-off
    /// expense funded from savings.
    pub big_ticket_item: f64,
}

impl ContributionRecord {
    #[must_use]
    pub fn tax_deferred_contributions(&self) -> f64 {
        self.traditional_401k + self.traditional_ira
    }

    #[must_use]
    pub fn tax_free_contributions(&self) -> f64 {
        self.roth_401k + self.roth_ira
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("wages", self.wages),
            ("taxable contribution", self.taxable),
            ("401k contribution", self.traditional_401k),
            ("Roth 401k contribution", self.roth_401k),
            ("IRA contribution", self.traditional_ira),
            ("Roth IRA contribution", self.roth_ira),
            ("Roth conversion", self.roth_conversion),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeAmount { field, value });
            }
        }
        if !self.big_ticket_item.is_finite() {
            return Err(ConfigError::NegativeAmount {
                field: "big-ticket item",
                value: self.big_ticket_item,
            });
        }
        Ok(())
    }
}

/// Year-ordered records for one individual
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionSchedule {
    pub records: BTreeMap<i16, ContributionRecord>,
}

impl ContributionSchedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `year`; absent years read as all-zero.
    #[must_use]
    pub fn get(&self, year: i16) -> ContributionRecord {
        self.records.get(&year).copied().unwrap_or_default()
    }

    pub fn set(&mut self, year: i16, record: ContributionRecord) {
        self.records.insert(year, record);
    }

    /// Replace the conversion request of `year`, keeping its other fields.
    pub fn set_roth_conversion(&mut self, year: i16, amount: f64) {
        self.records.entry(year).or_default().roth_conversion = amount;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.records.values().try_for_each(ContributionRecord::validate)
    }
}
