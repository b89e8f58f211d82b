mod accounts;
pub mod history;
mod market;
mod results;
mod rmd;
mod schedule;
mod tax_config;

pub(crate) use accounts::slot;
pub use accounts::{AccountLedger, AccountWeights, Balances, TAX_STATUSES, TaxStatus};
pub use history::WindowStatistics;
pub use market::{
    ASSET_CLASSES, AssetClass, MultivariateNormal, RateMode, RateProvider, RateSet,
    cumulative_inflation_factors,
};
pub use results::{
    Estate, HistoricalSweep, MonteCarloSummary, ScenarioOutcome, SweepOutcome, YearState,
};
pub use rmd::{RmdTable, RmdTableEntry, rmd_start_age};
pub use schedule::{ContributionRecord, ContributionSchedule};
pub use tax_config::{
    ByStatus, FilingStatus, IrmaaTier, RegimeTables, TaxBracket, TaxRegime, TaxTables,
};
