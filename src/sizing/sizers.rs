//! Volatility-aware sizing rules

use super::{PositionSizer, SizingConfig, SizingDecision, SizingMethod, SizingRequest};
use crate::error::{RiskError, RiskResult};
use crate::stats::VOLATILITY_EPSILON;

/// Mean-variance optimal weight rescaled to a volatility target
///
/// w = (mu - r_f) / sigma^2 * (target_vol / sigma)
#[derive(Debug, Clone)]
pub struct MeanVarianceSizer {
    pub target_volatility: f64,
}

impl MeanVarianceSizer {
    pub fn from_config(config: &SizingConfig) -> Self {
        Self {
            target_volatility: config.target_volatility,
        }
    }
}

impl PositionSizer for MeanVarianceSizer {
    fn target_weight(&self, request: &SizingRequest) -> RiskResult<SizingDecision> {
        let sigma = request.volatility;
        if sigma <= VOLATILITY_EPSILON {
            return Ok(SizingDecision::zero("non-positive volatility"));
        }
        let excess = request.excess_return();
        if excess <= 0.0 {
            return Ok(SizingDecision::zero("no positive excess return"));
        }
        let optimal = excess / (sigma * sigma);
        let scale = self.target_volatility / sigma;
        Ok(SizingDecision::new(
            optimal * scale,
            format!(
                "mean-variance weight {:.4} scaled by target vol ratio {:.3}",
                optimal, scale
            ),
        ))
    }

    fn method(&self) -> SizingMethod {
        SizingMethod::MeanVariance
    }
}

/// Sharpe-style weight scaled toward a volatility target, held in a band
#[derive(Debug, Clone)]
pub struct VolatilityAdjustedSizer {
    pub target_volatility: f64,
    pub scale_cap: f64,
    pub band_min: f64,
    pub band_max: f64,
}

impl VolatilityAdjustedSizer {
    pub fn from_config(config: &SizingConfig) -> Self {
        Self {
            target_volatility: config.target_volatility,
            scale_cap: config.vol_scale_cap,
            band_min: config.vol_band_min,
            band_max: config.vol_band_max,
        }
    }
}

impl PositionSizer for VolatilityAdjustedSizer {
    fn target_weight(&self, request: &SizingRequest) -> RiskResult<SizingDecision> {
        let sigma = request.volatility;
        if sigma <= VOLATILITY_EPSILON {
            return Ok(SizingDecision::zero("non-positive volatility"));
        }
        if request.expected_return == 0.0 {
            return Ok(SizingDecision::zero("zero expected return"));
        }
        let base = request.expected_return.abs() / sigma;
        let scale = (self.target_volatility / sigma).min(self.scale_cap);
        let raw = base * scale;
        let banded = raw.clamp(self.band_min, self.band_max);
        let reason = if banded != raw {
            format!(
                "volatility-adjusted weight {:.4} held to band [{:.2}, {:.2}]",
                raw, self.band_min, self.band_max
            )
        } else {
            format!("volatility-adjusted weight {:.4} (scale {:.3})", raw, scale)
        };
        Ok(SizingDecision::new(banded, reason))
    }

    fn method(&self) -> SizingMethod {
        SizingMethod::VolatilityAdjusted
    }
}

/// Volatility-target weight, cut when the estimated drawdown breaches a limit
///
/// Estimated max drawdown is `multiplier * sigma`.
#[derive(Debug, Clone)]
pub struct DrawdownConstrainedSizer {
    pub target_volatility: f64,
    pub max_drawdown_limit: f64,
    pub drawdown_multiplier: f64,
}

impl DrawdownConstrainedSizer {
    pub fn from_config(config: &SizingConfig) -> Self {
        Self {
            target_volatility: config.target_volatility,
            max_drawdown_limit: config.max_drawdown_limit,
            drawdown_multiplier: config.drawdown_multiplier,
        }
    }
}

impl PositionSizer for DrawdownConstrainedSizer {
    fn target_weight(&self, request: &SizingRequest) -> RiskResult<SizingDecision> {
        let sigma = request.volatility;
        if sigma <= VOLATILITY_EPSILON {
            return Ok(SizingDecision::zero("non-positive volatility"));
        }
        if request.excess_return() <= 0.0 {
            return Ok(SizingDecision::zero("no positive excess return"));
        }
        let base = (self.target_volatility / sigma).min(1.0);
        let estimated_drawdown = self.drawdown_multiplier * sigma;
        if estimated_drawdown > self.max_drawdown_limit {
            let cut = self.max_drawdown_limit / estimated_drawdown;
            return Ok(SizingDecision::new(
                base * cut,
                format!(
                    "estimated drawdown {:.1}% exceeds limit {:.1}%; weight scaled by {:.3}",
                    estimated_drawdown * 100.0,
                    self.max_drawdown_limit * 100.0,
                    cut
                ),
            ));
        }
        Ok(SizingDecision::new(
            base,
            format!(
                "estimated drawdown {:.1}% within limit",
                estimated_drawdown * 100.0
            ),
        ))
    }

    fn method(&self) -> SizingMethod {
        SizingMethod::MaxDrawdownConstrained
    }
}

/// 1/N of the universe
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualWeightSizer;

impl PositionSizer for EqualWeightSizer {
    fn target_weight(&self, request: &SizingRequest) -> RiskResult<SizingDecision> {
        let n = request.universe_volatilities.len();
        if n == 0 {
            return Err(RiskError::config("equal-weight sizing needs a non-empty universe"));
        }
        Ok(SizingDecision::new(
            1.0 / n as f64,
            format!("equal weight across {} assets", n),
        ))
    }

    fn method(&self) -> SizingMethod {
        SizingMethod::EqualWeight
    }
}

/// Inverse-volatility share of the universe
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskParityApproxSizer;

impl PositionSizer for RiskParityApproxSizer {
    fn target_weight(&self, request: &SizingRequest) -> RiskResult<SizingDecision> {
        let universe = &request.universe_volatilities;
        if universe.is_empty() {
            return Err(RiskError::config(
                "risk-parity approximation needs a non-empty universe",
            ));
        }
        if request.volatility <= VOLATILITY_EPSILON {
            return Ok(SizingDecision::zero("non-positive volatility"));
        }
        if universe.iter().any(|v| *v <= VOLATILITY_EPSILON) {
            return Ok(SizingDecision::new(
                1.0 / universe.len() as f64,
                "universe volatility missing; equal weight used",
            ));
        }
        let total: f64 = universe.iter().map(|v| 1.0 / v).sum();
        let weight = (1.0 / request.volatility) / total;
        Ok(SizingDecision::new(
            weight,
            format!("inverse-volatility share across {} assets", universe.len()),
        ))
    }

    fn method(&self) -> SizingMethod {
        SizingMethod::RiskParityApprox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config() -> SizingConfig {
        SizingConfig::default()
    }

    #[test]
    fn test_mean_variance() {
        // excess 0.06, vol 0.30: 0.06 / 0.09 = 0.6667, scale 0.15 / 0.30 = 0.5
        let request = SizingRequest::new(SizingMethod::MeanVariance, 0.08, 0.30, dec!(1000))
            .with_risk_free_rate(0.02);
        let d = MeanVarianceSizer::from_config(&config())
            .target_weight(&request)
            .unwrap();
        assert!((d.weight - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_mean_variance_negative_excess() {
        let request = SizingRequest::new(SizingMethod::MeanVariance, 0.01, 0.30, dec!(1000))
            .with_risk_free_rate(0.02);
        let d = MeanVarianceSizer::from_config(&config())
            .target_weight(&request)
            .unwrap();
        assert_eq!(d.weight, 0.0);
    }

    #[test]
    fn test_volatility_adjusted_band() {
        let sizer = VolatilityAdjustedSizer::from_config(&config());
        // base 0.5, scale min(0.15/0.2, 2) = 0.75 -> 0.375, banded to 0.10
        let request = SizingRequest::new(SizingMethod::VolatilityAdjusted, 0.10, 0.20, dec!(1000));
        let d = sizer.target_weight(&request).unwrap();
        assert_eq!(d.weight, 0.10);
        assert!(d.reason.contains("band"));

        // base 0.002 / 0.5 = 0.004, scale 0.3 -> 0.0012, banded up to 0.01
        let request = SizingRequest::new(SizingMethod::VolatilityAdjusted, -0.002, 0.50, dec!(1000));
        let d = sizer.target_weight(&request).unwrap();
        assert_eq!(d.weight, 0.01);
    }

    #[test]
    fn test_volatility_adjusted_scale_cap() {
        let sizer = VolatilityAdjustedSizer {
            band_max: 1.0,
            ..VolatilityAdjustedSizer::from_config(&config())
        };
        // scale min(0.15 / 0.05, 2) = 2; base 0.001 / 0.05 = 0.02 -> 0.04
        let request = SizingRequest::new(SizingMethod::VolatilityAdjusted, 0.001, 0.05, dec!(1000));
        let d = sizer.target_weight(&request).unwrap();
        assert!((d.weight - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_constrained_cut() {
        let sizer = DrawdownConstrainedSizer::from_config(&config());
        // sigma 0.30: est dd 0.75 > 0.20; base 0.5; cut 0.2667 -> 0.1333
        let request = SizingRequest::new(SizingMethod::MaxDrawdownConstrained, 0.10, 0.30, dec!(1000));
        let d = sizer.target_weight(&request).unwrap();
        assert!((d.weight - 0.5 * 0.20 / 0.75).abs() < 1e-12);
        assert!(d.reason.contains("exceeds limit"));
    }

    #[test]
    fn test_drawdown_constrained_within_limit() {
        let sizer = DrawdownConstrainedSizer::from_config(&config());
        // sigma 0.05: est dd 0.125 <= 0.20; base min(3, 1) = 1
        let request = SizingRequest::new(SizingMethod::MaxDrawdownConstrained, 0.10, 0.05, dec!(1000));
        let d = sizer.target_weight(&request).unwrap();
        assert_eq!(d.weight, 1.0);
    }

    #[test]
    fn test_equal_weight() {
        let request = SizingRequest::new(SizingMethod::EqualWeight, 0.1, 0.2, dec!(1000))
            .with_universe(vec![0.2, 0.3, 0.4, 0.5]);
        let d = EqualWeightSizer.target_weight(&request).unwrap();
        assert_eq!(d.weight, 0.25);

        let empty = SizingRequest::new(SizingMethod::EqualWeight, 0.1, 0.2, dec!(1000));
        assert!(EqualWeightSizer.target_weight(&empty).is_err());
    }

    #[test]
    fn test_risk_parity_approx() {
        let request = SizingRequest::new(SizingMethod::RiskParityApprox, 0.1, 0.10, dec!(1000))
            .with_universe(vec![0.10, 0.20]);
        let d = RiskParityApproxSizer.target_weight(&request).unwrap();
        // (1/0.1) / (10 + 5) = 2/3
        assert!((d.weight - 2.0 / 3.0).abs() < 1e-12);
    }
}
