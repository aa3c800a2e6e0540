//! Statistical validation of strategy returns
//!
//! One-sample t-test of the mean return, annualized Sharpe ratio, effect
//! size and a normal-approximation power analysis.

mod signal;

pub use signal::{SignalValidationResult, SignalValidator};

use crate::error::{RiskError, RiskResult, MIN_OBSERVATIONS};
use serde::{Deserialize, Serialize};

/// Sample size below which the normal power approximation is flagged
pub const POWER_APPROXIMATION_MIN_SAMPLE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Two-sided test size
    #[serde(default = "default_significance_level")]
    pub significance_level: f64,

    /// Power used for the required sample size
    #[serde(default = "default_target_power")]
    pub target_power: f64,

    #[serde(default = "default_min_observations")]
    pub min_observations: usize,

    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,

    /// Annual rate subtracted from returns before testing
    #[serde(default)]
    pub risk_free_rate: f64,
}

fn default_significance_level() -> f64 {
    0.05
}
fn default_target_power() -> f64 {
    0.8
}
fn default_min_observations() -> usize {
    MIN_OBSERVATIONS
}
fn default_periods_per_year() -> f64 {
    crate::stats::TRADING_DAYS
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            significance_level: default_significance_level(),
            target_power: default_target_power(),
            min_observations: default_min_observations(),
            periods_per_year: default_periods_per_year(),
            risk_free_rate: 0.0,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if !(self.significance_level > 0.0 && self.significance_level < 0.5) {
            return Err(RiskError::config("significance_level must be in (0, 0.5)"));
        }
        if !(self.target_power > 0.0 && self.target_power < 1.0) {
            return Err(RiskError::config("target_power must be in (0, 1)"));
        }
        if self.min_observations < 3 {
            return Err(RiskError::config("min_observations must be at least 3"));
        }
        if self.periods_per_year <= 0.0 {
            return Err(RiskError::config("periods_per_year must be positive"));
        }
        Ok(())
    }
}
