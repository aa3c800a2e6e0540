//! Risk parity portfolio construction
//!
//! Weights that equalize (or hit a target budget of) each asset's share of
//! portfolio volatility, solved over the bounded simplex by a pluggable
//! [`ConstrainedSolver`](crate::optimize::ConstrainedSolver).

mod engine;
mod rebalance;
mod types;

pub use engine::RiskParityEngine;
pub use rebalance::{DriftReport, RebalanceAction, TradeDirection};
pub use types::RiskParityResult;

use crate::error::{RiskError, RiskResult, MIN_OBSERVATIONS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weighting scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParityMethod {
    #[default]
    EqualRiskContribution,
    InverseVolatility,
    RiskBudget,
    DiversifiedRiskParity,
}

impl ParityMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParityMethod::EqualRiskContribution => "equal_risk_contribution",
            ParityMethod::InverseVolatility => "inverse_volatility",
            ParityMethod::RiskBudget => "risk_budget",
            ParityMethod::DiversifiedRiskParity => "diversified_risk_parity",
        }
    }
}

impl std::fmt::Display for ParityMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ParityMethod {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "equal_risk_contribution" | "erc" => Ok(ParityMethod::EqualRiskContribution),
            "inverse_volatility" => Ok(ParityMethod::InverseVolatility),
            "risk_budget" => Ok(ParityMethod::RiskBudget),
            "diversified_risk_parity" => Ok(ParityMethod::DiversifiedRiskParity),
            other => Err(RiskError::config(format!("unknown parity method {}", other))),
        }
    }
}

/// Risk parity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParityConfig {
    #[serde(default)]
    pub method: ParityMethod,

    #[serde(default = "default_min_weight")]
    pub min_weight: f64,

    #[serde(default = "default_max_weight")]
    pub max_weight: f64,

    /// Target share of risk per asset, required by `risk_budget`
    #[serde(default)]
    pub risk_budgets: Option<BTreeMap<String, f64>>,

    /// Weight drift that triggers a rebalancing action
    #[serde(default = "default_rebalance_threshold")]
    pub rebalance_threshold: f64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Weight of the contribution-dispersion penalty in diversified risk parity
    #[serde(default = "default_diversification_penalty")]
    pub diversification_penalty: f64,

    #[serde(default = "default_min_observations")]
    pub min_observations: usize,
}

fn default_min_weight() -> f64 {
    0.0
}
fn default_max_weight() -> f64 {
    1.0
}
fn default_rebalance_threshold() -> f64 {
    0.02
}
fn default_max_iterations() -> usize {
    1000
}
fn default_tolerance() -> f64 {
    1e-12
}
fn default_diversification_penalty() -> f64 {
    10.0
}
fn default_min_observations() -> usize {
    MIN_OBSERVATIONS
}

impl Default for ParityConfig {
    fn default() -> Self {
        Self {
            method: ParityMethod::default(),
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            risk_budgets: None,
            rebalance_threshold: default_rebalance_threshold(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            diversification_penalty: default_diversification_penalty(),
            min_observations: default_min_observations(),
        }
    }
}

impl ParityConfig {
    pub fn validate(&self) -> RiskResult<()> {
        if !(0.0..=1.0).contains(&self.min_weight)
            || !(0.0..=1.0).contains(&self.max_weight)
            || self.min_weight > self.max_weight
        {
            return Err(RiskError::config(format!(
                "weight bounds must satisfy 0 <= min <= max <= 1, got [{}, {}]",
                self.min_weight, self.max_weight
            )));
        }
        if !(self.rebalance_threshold > 0.0 && self.rebalance_threshold < 1.0) {
            return Err(RiskError::config("rebalance_threshold must be in (0, 1)"));
        }
        if self.max_iterations == 0 {
            return Err(RiskError::config("max_iterations must be positive"));
        }
        if self.tolerance <= 0.0 {
            return Err(RiskError::config("tolerance must be positive"));
        }
        if self.diversification_penalty < 0.0 {
            return Err(RiskError::config("diversification_penalty must be non-negative"));
        }
        if self.min_observations < 2 {
            return Err(RiskError::config("min_observations must be at least 2"));
        }
        if self.method == ParityMethod::RiskBudget && self.risk_budgets.is_none() {
            return Err(RiskError::config("risk_budget method requires risk_budgets"));
        }
        if let Some(budgets) = &self.risk_budgets {
            if budgets.values().any(|b| !b.is_finite() || *b < 0.0) {
                return Err(RiskError::config("risk budgets must be finite and non-negative"));
            }
        }
        Ok(())
    }

    /// Budgets normalized to sum to 1, in `assets` order
    pub fn normalized_budgets(&self, assets: &[String]) -> RiskResult<Vec<f64>> {
        let budgets = self
            .risk_budgets
            .as_ref()
            .ok_or_else(|| RiskError::config("risk_budget method requires risk_budgets"))?;
        let raw = assets
            .iter()
            .map(|a| {
                budgets
                    .get(a)
                    .copied()
                    .ok_or_else(|| RiskError::config(format!("no risk budget for {}", a)))
            })
            .collect::<RiskResult<Vec<_>>>()?;
        let total: f64 = raw.iter().sum();
        if total <= 0.0 {
            return Err(RiskError::config("risk budgets must have a positive total"));
        }
        Ok(raw.into_iter().map(|b| b / total).collect())
    }
}
