//! Kelly criterion position sizing

use super::{PositionSizer, SizingDecision, SizingMethod, SizingRequest};
use crate::error::RiskResult;
use crate::stats::VOLATILITY_EPSILON;

/// Fractional-Kelly discount (quarter Kelly)
pub const KELLY_DISCOUNT: f64 = 0.25;

/// Kelly criterion for a continuous return distribution
///
/// f* = (mu - r_f) / sigma^2, scaled by [`KELLY_DISCOUNT`]. Non-positive
/// edge or volatility sizes to zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct KellySizer;

impl KellySizer {
    /// Quarter-Kelly fraction, or None when there is no edge to size
    pub fn fraction(excess_return: f64, volatility: f64) -> Option<f64> {
        if volatility <= VOLATILITY_EPSILON || excess_return <= 0.0 {
            return None;
        }
        Some(KELLY_DISCOUNT * excess_return / (volatility * volatility))
    }
}

impl PositionSizer for KellySizer {
    fn target_weight(&self, request: &SizingRequest) -> RiskResult<SizingDecision> {
        if request.volatility <= VOLATILITY_EPSILON {
            return Ok(SizingDecision::zero("non-positive volatility; Kelly undefined"));
        }
        let excess = request.excess_return();
        match Self::fraction(excess, request.volatility) {
            Some(f) => Ok(SizingDecision::new(
                f,
                format!(
                    "quarter Kelly: 0.25 * {:.4} / {:.4}^2 = {:.4}",
                    excess, request.volatility, f
                ),
            )),
            None => Ok(SizingDecision::zero(
                "expected return does not exceed risk-free rate",
            )),
        }
    }

    fn method(&self) -> SizingMethod {
        SizingMethod::Kelly
    }
}
