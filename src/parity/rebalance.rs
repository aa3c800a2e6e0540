//! Rebalancing actions and drift monitoring

use super::RiskParityEngine;
use crate::error::{RiskError, RiskResult};
use crate::series::ReturnMatrix;
use crate::stats::{self, TRADING_DAYS};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

/// Trade that moves one asset back to its target weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub asset: String,
    pub current_weight: f64,
    pub target_weight: f64,
    /// current - target
    pub drift: f64,
    pub direction: TradeDirection,
    /// Absolute notional to trade
    pub trade_value: Decimal,
}

/// Current vs target portfolio risk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Annualized volatility at the current weights
    pub current_volatility: f64,
    /// Annualized volatility at the target weights
    pub target_volatility: f64,
    /// current - target
    pub volatility_drift: f64,
    /// volatility_drift / target_volatility, 0 when the target has no risk
    pub relative_volatility_drift: f64,
    pub max_weight_drift: f64,
    pub max_drift_asset: Option<String>,
    pub rebalance_required: bool,
}

impl RiskParityEngine {
    /// Trades for every asset whose weight drifted past the threshold
    ///
    /// Assets absent from one side count as weight 0 there.
    pub fn rebalancing_actions(
        &self,
        current: &BTreeMap<String, f64>,
        target: &BTreeMap<String, f64>,
        portfolio_value: Decimal,
    ) -> RiskResult<Vec<RebalanceAction>> {
        if portfolio_value < Decimal::ZERO {
            return Err(RiskError::config("portfolio_value must be non-negative"));
        }
        let threshold = self.config().rebalance_threshold;
        let assets: BTreeSet<&String> = current.keys().chain(target.keys()).collect();

        let mut actions = Vec::new();
        for asset in assets {
            let current_weight = current.get(asset).copied().unwrap_or(0.0);
            let target_weight = target.get(asset).copied().unwrap_or(0.0);
            let drift = current_weight - target_weight;
            if drift.abs() <= threshold {
                continue;
            }
            let fraction = Decimal::try_from(drift.abs()).map_err(|e| {
                RiskError::config(format!("weight drift for {} not representable: {}", asset, e))
            })?;
            actions.push(RebalanceAction {
                asset: asset.clone(),
                current_weight,
                target_weight,
                drift,
                direction: if drift < 0.0 {
                    TradeDirection::Buy
                } else {
                    TradeDirection::Sell
                },
                trade_value: (portfolio_value * fraction).round_dp(2),
            });
        }

        debug!(actions = actions.len(), threshold, "Rebalancing actions computed");
        Ok(actions)
    }

    /// Compare portfolio volatility at current and target weights
    pub fn monitor_drift(
        &self,
        returns: &ReturnMatrix,
        current: &BTreeMap<String, f64>,
        target: &BTreeMap<String, f64>,
    ) -> RiskResult<DriftReport> {
        RiskError::require_observations(self.config().min_observations, returns.observations())?;
        let current_w = weights_for(returns, current)?;
        let target_w = weights_for(returns, target)?;
        let covariance = returns.covariance(TRADING_DAYS);

        let current_volatility = stats::portfolio_volatility(&current_w, &covariance);
        let target_volatility = stats::portfolio_volatility(&target_w, &covariance);
        let volatility_drift = current_volatility - target_volatility;
        let relative_volatility_drift = if target_volatility > 0.0 {
            volatility_drift / target_volatility
        } else {
            0.0
        };

        let (max_drift_asset, max_weight_drift) = returns
            .assets()
            .iter()
            .zip(current_w.iter().zip(&target_w))
            .map(|(a, (c, t))| (a, (c - t).abs()))
            .fold((None, 0.0), |(best, max), (a, d)| {
                if d > max {
                    (Some(a.clone()), d)
                } else {
                    (best, max)
                }
            });

        let report = DriftReport {
            current_volatility,
            target_volatility,
            volatility_drift,
            relative_volatility_drift,
            max_weight_drift,
            max_drift_asset,
            rebalance_required: max_weight_drift > self.config().rebalance_threshold,
        };
        info!(
            current_volatility,
            target_volatility,
            max_weight_drift,
            rebalance_required = report.rebalance_required,
            "Portfolio drift assessed"
        );
        Ok(report)
    }
}

/// Weights in matrix order; unknown assets are an error, missing ones are 0
fn weights_for(returns: &ReturnMatrix, weights: &BTreeMap<String, f64>) -> RiskResult<Vec<f64>> {
    if let Some(unknown) = weights.keys().find(|a| returns.asset_index(a).is_none()) {
        return Err(RiskError::config(format!("weight given for unknown asset {}", unknown)));
    }
    Ok(returns
        .assets()
        .iter()
        .map(|a| weights.get(a).copied().unwrap_or(0.0))
        .collect())
}
