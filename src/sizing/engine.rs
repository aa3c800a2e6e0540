//! Position sizing engine

use super::{create_sizer, PositionSizingResult, SizingConfig, SizingRequest};
use crate::error::{RiskError, RiskResult};
use crate::telemetry::{record_latency, CalculationMetric};
use rust_decimal::Decimal;
use std::time::Instant;
use tracing::{debug, Span};

/// Sizes positions with any [`SizingMethod`](super::SizingMethod)
///
/// Whatever the rule proposes, the final weight lands in `[0, max_position]`
/// and the result explains any clipping.
#[derive(Debug, Clone)]
pub struct PositionSizingEngine {
    config: SizingConfig,
    span: Span,
}

impl PositionSizingEngine {
    pub fn new(config: SizingConfig) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            span: tracing::info_span!("position_sizing"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Request pre-filled with the configured risk-free rate and position cap
    pub fn request(
        &self,
        method: super::SizingMethod,
        expected_return: f64,
        volatility: f64,
        portfolio_value: Decimal,
    ) -> SizingRequest {
        SizingRequest::new(method, expected_return, volatility, portfolio_value)
            .with_risk_free_rate(self.config.risk_free_rate)
            .with_max_position(self.config.default_max_position)
    }

    /// Recommend a position
    pub fn size(&self, request: &SizingRequest) -> RiskResult<PositionSizingResult> {
        let _guard = self.span.enter();
        let started = Instant::now();
        validate_request(request)?;

        let sizer = create_sizer(request.method, &self.config);
        let decision = sizer.target_weight(request)?;
        let raw_weight = if decision.weight.is_finite() {
            decision.weight
        } else {
            0.0
        };

        let mut reason = decision.reason;
        let recommended_weight = if raw_weight > request.max_position {
            reason.push_str(&format!(
                "; clipped to max position {:.2}%",
                request.max_position * 100.0
            ));
            request.max_position
        } else if raw_weight < 0.0 {
            reason.push_str("; negative weight clipped to zero");
            0.0
        } else {
            raw_weight
        };
        if reason.is_empty() {
            reason = "within limits".to_string();
        }

        let weight_dec = Decimal::try_from(recommended_weight).unwrap_or(Decimal::ZERO);
        let recommended_value = (request.portfolio_value * weight_dec).round_dp(2);
        let shares = request
            .price
            .filter(|p| *p > Decimal::ZERO)
            .map(|p| (recommended_value / p).floor());

        record_latency(CalculationMetric::PositionSizing, started.elapsed());
        debug!(
            method = %request.method,
            raw_weight,
            recommended_weight,
            "Position sized"
        );

        Ok(PositionSizingResult {
            method: request.method,
            recommended_weight,
            recommended_value,
            shares,
            raw_weight,
            risk_contribution: recommended_weight * request.volatility.max(0.0),
            max_position: request.max_position,
            adjusted_reason: reason,
        })
    }
}

fn validate_request(request: &SizingRequest) -> RiskResult<()> {
    if !(request.max_position > 0.0 && request.max_position <= 1.0) {
        return Err(RiskError::config(format!(
            "max_position {} must be in (0, 1]",
            request.max_position
        )));
    }
    if request.portfolio_value < Decimal::ZERO {
        return Err(RiskError::config("portfolio_value must be non-negative"));
    }
    if !request.expected_return.is_finite()
        || !request.volatility.is_finite()
        || !request.risk_free_rate.is_finite()
    {
        return Err(RiskError::config("sizing inputs must be finite"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::SizingMethod;
    use rust_decimal_macros::dec;

    fn engine() -> PositionSizingEngine {
        PositionSizingEngine::new(SizingConfig::default()).unwrap()
    }

    #[test]
    fn test_kelly_clipped_to_max() {
        let request = SizingRequest::new(SizingMethod::Kelly, 0.10, 0.20, dec!(100000))
            .with_risk_free_rate(0.02)
            .with_max_position(0.10)
            .with_price(dec!(50));
        let result = engine().size(&request).unwrap();
        assert_eq!(result.recommended_weight, 0.10);
        assert_eq!(result.recommended_value, dec!(10000));
        assert_eq!(result.shares, Some(dec!(200)));
        assert!(result.adjusted_reason.contains("clipped"));
        assert!((result.raw_weight - 0.5).abs() < 1e-12);
        assert!((result.risk_contribution - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_kelly_zero_when_no_edge() {
        let request = SizingRequest::new(SizingMethod::Kelly, 0.02, 0.25, dec!(100000))
            .with_risk_free_rate(0.02)
            .with_max_position(0.2);
        let result = engine().size(&request).unwrap();
        assert_eq!(result.recommended_weight, 0.0);
        assert_eq!(result.recommended_value, dec!(0));
        assert!(!result.adjusted_reason.is_empty());
    }

    #[test]
    fn test_weight_always_within_bounds() {
        let engine = engine();
        let methods = [
            SizingMethod::Kelly,
            SizingMethod::MeanVariance,
            SizingMethod::VolatilityAdjusted,
            SizingMethod::MaxDrawdownConstrained,
            SizingMethod::EqualWeight,
            SizingMethod::RiskParityApprox,
        ];
        for method in methods {
            for (er, vol) in [(0.3, 0.05), (-0.1, 0.2), (0.05, 0.0), (0.12, 0.6)] {
                let request = SizingRequest::new(method, er, vol, dec!(50000))
                    .with_max_position(0.15)
                    .with_universe(vec![0.2, 0.3]);
                let result = engine.size(&request).unwrap();
                assert!(result.recommended_weight >= 0.0);
                assert!(result.recommended_weight <= 0.15);
                assert!(!result.adjusted_reason.is_empty());
            }
        }
    }

    #[test]
    fn test_invalid_request() {
        let request = SizingRequest::new(SizingMethod::Kelly, 0.1, 0.2, dec!(1000)).with_max_position(1.5);
        assert!(matches!(engine().size(&request), Err(RiskError::Configuration(_))));
        let request = SizingRequest::new(SizingMethod::Kelly, 0.1, 0.2, dec!(-1));
        assert!(engine().size(&request).is_err());
        let request = SizingRequest::new(SizingMethod::Kelly, f64::NAN, 0.2, dec!(1000));
        assert!(engine().size(&request).is_err());
    }

    #[test]
    fn test_request_uses_config_defaults() {
        let e = engine();
        let request = e.request(SizingMethod::Kelly, 0.1, 0.2, dec!(1000));
        assert_eq!(request.risk_free_rate, 0.02);
        assert_eq!(request.max_position, 0.10);
    }
}
