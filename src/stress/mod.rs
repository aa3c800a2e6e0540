//! Stress testing
//!
//! Replays historical crises and synthetic shocks against current holdings,
//! and measures volatility and liquidity stress. Money is `Decimal`
//! throughout so replayed losses are exact.

mod catalog;
mod engine;
mod types;

pub use catalog::StressCatalog;
pub use engine::StressTestEngine;
pub use types::{
    AssetClass, AssetImpact, FailedTest, HistoricalEvent, Portfolio, ScenarioTemplate,
    StressTestKind, StressTestReport, StressTestResult,
};

use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

/// Stress engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressConfig {
    /// Seed for scenario repricing noise
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Noise standard deviation before the scenario volatility multiplier
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f64,

    /// Volatility multiplier for the volatility shock test
    #[serde(default = "default_volatility_multiplier")]
    pub volatility_multiplier: f64,

    /// Pairwise correlation assumed between distinct assets
    #[serde(default = "default_base_correlation")]
    pub base_correlation: f64,

    /// Fraction of the gap to perfect correlation closed under stress
    #[serde(default = "default_correlation_stress")]
    pub correlation_stress: f64,

    /// Loss horizon in trading days for the volatility shock
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    /// Quoted bid/ask spread as a fraction of price
    #[serde(default = "default_bid_ask_spread")]
    pub bid_ask_spread: f64,

    /// Spread multiplier under stress
    #[serde(default = "default_spread_widening")]
    pub spread_widening: f64,

    /// Square-root market impact coefficient
    #[serde(default = "default_impact_coefficient")]
    pub impact_coefficient: f64,

    /// Share of daily volume sold when no volume is on record
    #[serde(default = "default_participation_rate")]
    pub participation_rate: f64,

    /// Fraction of market volume that disappears under stress
    #[serde(default = "default_volume_reduction")]
    pub volume_reduction: f64,

    /// Cost per unit of volume reduction
    #[serde(default = "default_volume_penalty")]
    pub volume_penalty: f64,
}

fn default_seed() -> u64 {
    42
}
fn default_noise_scale() -> f64 {
    0.005
}
fn default_volatility_multiplier() -> f64 {
    2.0
}
fn default_base_correlation() -> f64 {
    0.3
}
fn default_correlation_stress() -> f64 {
    0.5
}
fn default_horizon_days() -> u32 {
    10
}
fn default_bid_ask_spread() -> f64 {
    0.001
}
fn default_spread_widening() -> f64 {
    5.0
}
fn default_impact_coefficient() -> f64 {
    0.1
}
fn default_participation_rate() -> f64 {
    0.10
}
fn default_volume_reduction() -> f64 {
    0.5
}
fn default_volume_penalty() -> f64 {
    0.02
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            noise_scale: default_noise_scale(),
            volatility_multiplier: default_volatility_multiplier(),
            base_correlation: default_base_correlation(),
            correlation_stress: default_correlation_stress(),
            horizon_days: default_horizon_days(),
            bid_ask_spread: default_bid_ask_spread(),
            spread_widening: default_spread_widening(),
            impact_coefficient: default_impact_coefficient(),
            participation_rate: default_participation_rate(),
            volume_reduction: default_volume_reduction(),
            volume_penalty: default_volume_penalty(),
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if !(self.noise_scale >= 0.0 && self.noise_scale.is_finite()) {
            return Err(RiskError::config("noise_scale must be non-negative"));
        }
        if self.volatility_multiplier < 1.0 {
            return Err(RiskError::config("volatility_multiplier must be at least 1"));
        }
        if !(-1.0..=1.0).contains(&self.base_correlation) {
            return Err(RiskError::config("base_correlation must be in [-1, 1]"));
        }
        if !(0.0..=1.0).contains(&self.correlation_stress) {
            return Err(RiskError::config("correlation_stress must be in [0, 1]"));
        }
        if self.horizon_days == 0 {
            return Err(RiskError::config("horizon_days must be positive"));
        }
        if !(0.0..1.0).contains(&self.bid_ask_spread) || self.spread_widening < 1.0 {
            return Err(RiskError::config(
                "bid_ask_spread must be in [0, 1) and spread_widening at least 1",
            ));
        }
        if self.impact_coefficient < 0.0 || self.volume_penalty < 0.0 {
            return Err(RiskError::config("liquidity cost coefficients must be non-negative"));
        }
        if !(self.participation_rate > 0.0 && self.participation_rate <= 1.0) {
            return Err(RiskError::config("participation_rate must be in (0, 1]"));
        }
        if !(0.0..1.0).contains(&self.volume_reduction) {
            return Err(RiskError::config("volume_reduction must be in [0, 1)"));
        }
        Ok(())
    }
}
