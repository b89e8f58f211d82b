use std::fmt;

/// A historical window was requested outside the bundled dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDataRangeError {
    pub from: i16,
    pub to: i16,
    pub available_from: i16,
    pub available_to: i16,
}

impl fmt::Display for RateDataRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rate window {}-{} outside available data {}-{}",
            self.from, self.to, self.available_from, self.available_to
        )
    }
}

impl std::error::Error for RateDataRangeError {}

/// Errors raised while validating a plan, before any simulation runs
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoIndividuals,
    TooManyIndividuals(usize),
    BirthYearAfterStart {
        name: String,
        birth_year: i16,
        start_year: i16,
    },
    PastLifeExpectancy {
        name: String,
        life_expectancy: u16,
        start_year: i16,
    },
    NegativeAmount {
        field: &'static str,
        value: f64,
    },
    FractionOutOfRange {
        field: &'static str,
        value: f64,
    },
    AllocationWeights {
        sum: f64,
    },
    AllocationShape {
        expected: usize,
        found: usize,
    },
    UnknownScheduleOwner(usize),
    InvalidSteepness(f64),
    NonFiniteRates,
    RateRange(RateDataRangeError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoIndividuals => write!(f, "plan has no individuals"),
            ConfigError::TooManyIndividuals(n) => {
                write!(f, "plan supports at most two individuals, got {n}")
            }
            ConfigError::BirthYearAfterStart {
                name,
                birth_year,
                start_year,
            } => write!(
                f,
                "{name} born in {birth_year}, after plan start {start_year}"
            ),
            ConfigError::PastLifeExpectancy {
                name,
                life_expectancy,
                start_year,
            } => write!(
                f,
                "{name} is already past life expectancy {life_expectancy} in {start_year}"
            ),
            ConfigError::NegativeAmount { field, value } => {
                write!(f, "{field} must be a non-negative amount, got {value}")
            }
            ConfigError::FractionOutOfRange { field, value } => {
                write!(f, "{field} must lie in [0, 1], got {value}")
            }
            ConfigError::AllocationWeights { sum } => {
                write!(
                    f,
                    "allocation weights must be non-negative and sum to 100%, got {:.4}%",
                    sum * 100.0
                )
            }
            ConfigError::AllocationShape { expected, found } => write!(
                f,
                "allocation plan covers {found} individual(s), household has {expected}"
            ),
            ConfigError::UnknownScheduleOwner(index) => {
                write!(f, "contribution schedule for unknown individual #{index}")
            }
            ConfigError::InvalidSteepness(k) => {
                write!(f, "s-curve steepness must be positive and finite, got {k}")
            }
            ConfigError::NonFiniteRates => write!(f, "fixed rates must be finite"),
            ConfigError::RateRange(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::RateRange(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RateDataRangeError> for ConfigError {
    fn from(e: RateDataRangeError) -> Self {
        ConfigError::RateRange(e)
    }
}

/// Errors from sweep entry points that take a rate window at call time
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Config(ConfigError),
    RateRange(RateDataRangeError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "configuration error: {e}"),
            SimulationError::RateRange(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::RateRange(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

impl From<RateDataRangeError> for SimulationError {
    fn from(e: RateDataRangeError) -> Self {
        SimulationError::RateRange(e)
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
