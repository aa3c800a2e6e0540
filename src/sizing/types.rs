//! Position sizing request and result types

use super::SizingMethod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inputs to a sizing decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingRequest {
    /// Annualized expected return
    pub expected_return: f64,
    /// Annualized volatility
    pub volatility: f64,
    pub portfolio_value: Decimal,
    pub risk_free_rate: f64,
    /// Cap on the final weight, in (0, 1]
    pub max_position: f64,
    pub method: SizingMethod,
    /// Current price, for a share count
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Annualized volatilities of every asset in the universe (equal-weight
    /// and risk-parity approximation)
    #[serde(default)]
    pub universe_volatilities: Vec<f64>,
}

impl SizingRequest {
    pub fn new(
        method: SizingMethod,
        expected_return: f64,
        volatility: f64,
        portfolio_value: Decimal,
    ) -> Self {
        Self {
            expected_return,
            volatility,
            portfolio_value,
            risk_free_rate: 0.0,
            max_position: 1.0,
            method,
            price: None,
            universe_volatilities: Vec::new(),
        }
    }

    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    pub fn with_max_position(mut self, max_position: f64) -> Self {
        self.max_position = max_position;
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_universe(mut self, volatilities: Vec<f64>) -> Self {
        self.universe_volatilities = volatilities;
        self
    }

    /// Expected return in excess of the risk-free rate
    pub fn excess_return(&self) -> f64 {
        self.expected_return - self.risk_free_rate
    }
}

/// Unclipped weight proposed by a sizer
#[derive(Debug, Clone, PartialEq)]
pub struct SizingDecision {
    pub weight: f64,
    pub reason: String,
}

impl SizingDecision {
    pub fn new(weight: f64, reason: impl Into<String>) -> Self {
        Self {
            weight,
            reason: reason.into(),
        }
    }

    pub fn zero(reason: impl Into<String>) -> Self {
        Self::new(0.0, reason)
    }
}

/// Recommended position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizingResult {
    pub method: SizingMethod,
    /// Final weight, within [0, max_position]
    pub recommended_weight: f64,
    pub recommended_value: Decimal,
    /// Whole shares at the supplied price
    pub shares: Option<Decimal>,
    /// Weight before the final clip
    pub raw_weight: f64,
    /// weight * volatility
    pub risk_contribution: f64,
    pub max_position: f64,
    /// Why the size is what it is; never empty
    pub adjusted_reason: String,
}

impl PositionSizingResult {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               POSITION SIZE: {}
══════════════════════════════════════════════════════
Weight:           {:.4}% (raw {:.4}%, cap {:.2}%)
Value:            {:.2}
Shares:           {}
Risk contrib.:    {:.4}%
Reason:           {}
══════════════════════════════════════════════════════
"#,
            self.method,
            self.recommended_weight * 100.0,
            self.raw_weight * 100.0,
            self.max_position * 100.0,
            self.recommended_value,
            self.shares
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.risk_contribution * 100.0,
            self.adjusted_reason,
        )
    }
}
