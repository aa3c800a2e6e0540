//! Position sizing
//!
//! Turns an expected-return/volatility estimate into a recommended position.
//! Every method goes through [`PositionSizingEngine`], which clips the final
//! weight to `[0, max_position]` and records why.

mod engine;
mod kelly;
mod sizers;
mod types;

pub use engine::PositionSizingEngine;
pub use kelly::{KellySizer, KELLY_DISCOUNT};
pub use sizers::{
    DrawdownConstrainedSizer, EqualWeightSizer, MeanVarianceSizer, RiskParityApproxSizer,
    VolatilityAdjustedSizer,
};
pub use types::{PositionSizingResult, SizingDecision, SizingRequest};

use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

/// Sizing rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    #[default]
    Kelly,
    MeanVariance,
    VolatilityAdjusted,
    MaxDrawdownConstrained,
    EqualWeight,
    RiskParityApprox,
}

impl std::fmt::Display for SizingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SizingMethod::Kelly => "kelly",
            SizingMethod::MeanVariance => "mean_variance",
            SizingMethod::VolatilityAdjusted => "volatility_adjusted",
            SizingMethod::MaxDrawdownConstrained => "max_drawdown_constrained",
            SizingMethod::EqualWeight => "equal_weight",
            SizingMethod::RiskParityApprox => "risk_parity_approx",
        })
    }
}

impl std::str::FromStr for SizingMethod {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "kelly" => Ok(SizingMethod::Kelly),
            "mean_variance" => Ok(SizingMethod::MeanVariance),
            "volatility_adjusted" => Ok(SizingMethod::VolatilityAdjusted),
            "max_drawdown_constrained" => Ok(SizingMethod::MaxDrawdownConstrained),
            "equal_weight" => Ok(SizingMethod::EqualWeight),
            "risk_parity_approx" => Ok(SizingMethod::RiskParityApprox),
            other => Err(RiskError::config(format!("unknown sizing method {}", other))),
        }
    }
}

/// Trait for position sizing rules
pub trait PositionSizer: Send + Sync {
    /// Unclipped target weight for a request
    fn target_weight(&self, request: &SizingRequest) -> RiskResult<SizingDecision>;

    /// The rule implemented
    fn method(&self) -> SizingMethod;
}

/// Position sizing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Annualized volatility the mean-variance and volatility rules target
    #[serde(default = "default_target_volatility")]
    pub target_volatility: f64,

    /// Lower edge of the volatility-adjusted band
    #[serde(default = "default_vol_band_min")]
    pub vol_band_min: f64,

    /// Upper edge of the volatility-adjusted band
    #[serde(default = "default_vol_band_max")]
    pub vol_band_max: f64,

    /// Cap on target_vol / current_vol scaling
    #[serde(default = "default_vol_scale_cap")]
    pub vol_scale_cap: f64,

    /// Maximum tolerated drawdown for the drawdown-constrained rule
    #[serde(default = "default_max_drawdown_limit")]
    pub max_drawdown_limit: f64,

    /// Estimated max drawdown = multiplier * volatility
    #[serde(default = "default_drawdown_multiplier")]
    pub drawdown_multiplier: f64,

    /// Position cap used when the request does not give one
    #[serde(default = "default_max_position")]
    pub default_max_position: f64,

    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

fn default_target_volatility() -> f64 {
    0.15
}
fn default_vol_band_min() -> f64 {
    0.01
}
fn default_vol_band_max() -> f64 {
    0.10
}
fn default_vol_scale_cap() -> f64 {
    2.0
}
fn default_max_drawdown_limit() -> f64 {
    0.20
}
fn default_drawdown_multiplier() -> f64 {
    2.5
}
fn default_max_position() -> f64 {
    0.10
}
fn default_risk_free_rate() -> f64 {
    0.02
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            target_volatility: default_target_volatility(),
            vol_band_min: default_vol_band_min(),
            vol_band_max: default_vol_band_max(),
            vol_scale_cap: default_vol_scale_cap(),
            max_drawdown_limit: default_max_drawdown_limit(),
            drawdown_multiplier: default_drawdown_multiplier(),
            default_max_position: default_max_position(),
            risk_free_rate: default_risk_free_rate(),
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if self.target_volatility <= 0.0 {
            return Err(RiskError::config("target_volatility must be positive"));
        }
        if !(0.0 <= self.vol_band_min && self.vol_band_min < self.vol_band_max && self.vol_band_max <= 1.0) {
            return Err(RiskError::config(format!(
                "volatility band [{}, {}] must satisfy 0 <= min < max <= 1",
                self.vol_band_min, self.vol_band_max
            )));
        }
        if self.vol_scale_cap <= 0.0 {
            return Err(RiskError::config("vol_scale_cap must be positive"));
        }
        if !(self.max_drawdown_limit > 0.0 && self.max_drawdown_limit <= 1.0) {
            return Err(RiskError::config("max_drawdown_limit must be in (0, 1]"));
        }
        if self.drawdown_multiplier <= 0.0 {
            return Err(RiskError::config("drawdown_multiplier must be positive"));
        }
        if !(self.default_max_position > 0.0 && self.default_max_position <= 1.0) {
            return Err(RiskError::config("default_max_position must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Create a position sizer for a method
pub fn create_sizer(method: SizingMethod, config: &SizingConfig) -> Box<dyn PositionSizer> {
    match method {
        SizingMethod::Kelly => Box::new(KellySizer),
        SizingMethod::MeanVariance => Box::new(MeanVarianceSizer::from_config(config)),
        SizingMethod::VolatilityAdjusted => Box::new(VolatilityAdjustedSizer::from_config(config)),
        SizingMethod::MaxDrawdownConstrained => {
            Box::new(DrawdownConstrainedSizer::from_config(config))
        }
        SizingMethod::EqualWeight => Box::new(EqualWeightSizer),
        SizingMethod::RiskParityApprox => Box::new(RiskParityApproxSizer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sizer_methods() {
        let config = SizingConfig::default();
        for method in [
            SizingMethod::Kelly,
            SizingMethod::MeanVariance,
            SizingMethod::VolatilityAdjusted,
            SizingMethod::MaxDrawdownConstrained,
            SizingMethod::EqualWeight,
            SizingMethod::RiskParityApprox,
        ] {
            assert_eq!(create_sizer(method, &config).method(), method);
        }
    }

    #[test]
    fn test_method_names() {
        assert_eq!(SizingMethod::MeanVariance.to_string(), "mean_variance");
        assert_eq!(
            "max-drawdown-constrained".parse::<SizingMethod>().unwrap(),
            SizingMethod::MaxDrawdownConstrained
        );
        assert!("martingale".parse::<SizingMethod>().is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(SizingConfig::default().validate().is_ok());
        let bad = SizingConfig {
            vol_band_min: 0.2,
            vol_band_max: 0.1,
            ..SizingConfig::default()
        };
        assert!(matches!(bad.validate(), Err(RiskError::Configuration(_))));
        let bad = SizingConfig {
            default_max_position: 0.0,
            ..SizingConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
