//! Portfolio VaR with marginal and component attribution

use super::calculator::historical_estimates;
use super::types::ConfidenceEstimate;
use super::VarCalculator;
use crate::error::{RiskError, RiskResult};
use crate::series::ReturnMatrix;
use crate::stats::{self, VOLATILITY_EPSILON};
use crate::telemetry::{record_latency, CalculationMetric};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Tolerance on the weight sum
const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

/// Portfolio VaR/CVaR at one confidence level with per-asset attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioLevel {
    pub confidence: f64,
    pub var: f64,
    pub cvar: f64,
    /// d(VaR)/d(w_i) under the covariance-scaling approximation
    pub marginal_var: BTreeMap<String, f64>,
    /// w_i * marginal VaR; sums to `var`
    pub component_var: BTreeMap<String, f64>,
    pub marginal_cvar: BTreeMap<String, f64>,
    /// w_i * marginal CVaR; sums to `cvar`
    pub component_cvar: BTreeMap<String, f64>,
}

/// Portfolio-level risk estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRiskResult {
    pub weights: BTreeMap<String, f64>,
    /// One entry per confidence level, ascending
    pub levels: Vec<PortfolioLevel>,
    /// Daily portfolio volatility
    pub portfolio_volatility: f64,
    /// sum(|w_i| * sigma_i) / sigma_p; at least 1
    pub diversification_ratio: f64,
    pub sample_size: usize,
    pub degenerate: bool,
}

impl PortfolioRiskResult {
    pub fn level(&self, confidence: f64) -> Option<&PortfolioLevel> {
        self.levels
            .iter()
            .find(|l| (l.confidence - confidence).abs() < 1e-9)
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut rows = String::new();
        for level in &self.levels {
            rows.push_str(&format!(
                "{:>5.1}%        {:>+9.4}%     {:>+9.4}%\n",
                level.confidence * 100.0,
                level.var * 100.0,
                level.cvar * 100.0
            ));
        }
        let mut components = String::new();
        if let Some(top) = self.levels.last() {
            for (asset, weight) in &self.weights {
                components.push_str(&format!(
                    "{:<12} {:>7.2}%   {:>+9.4}%\n",
                    asset,
                    weight * 100.0,
                    top.component_var.get(asset).copied().unwrap_or(0.0) * 100.0
                ));
            }
        }
        format!(
            r#"
══════════════════════════════════════════════════════
               PORTFOLIO VALUE AT RISK
══════════════════════════════════════════════════════
Observations:     {}
Daily vol:        {:.4}%
Divers. ratio:    {:.3}{}

CONFIDENCE    VaR            CVaR
──────────────────────────────────────────────────────
{}
ASSET        WEIGHT     COMPONENT VaR (highest level)
──────────────────────────────────────────────────────
{}══════════════════════════════════════════════════════
"#,
            self.sample_size,
            self.portfolio_volatility * 100.0,
            self.diversification_ratio,
            if self.degenerate { " (degenerate)" } else { "" },
            rows,
            components,
        )
    }
}

impl VarCalculator {
    /// Historical portfolio VaR/CVaR with marginal and component contributions
    ///
    /// `weights` must name exactly the matrix assets and sum to 1.
    pub fn portfolio(
        &self,
        returns: &ReturnMatrix,
        weights: &BTreeMap<String, f64>,
    ) -> RiskResult<PortfolioRiskResult> {
        let _guard = self.span().enter();
        let started = Instant::now();
        RiskError::require_observations(self.config().min_observations, returns.observations())?;

        let w = aligned_weights(returns, weights)?;
        let portfolio_returns = returns.portfolio_returns(&w)?;
        let levels = self.config().sorted_levels();
        let estimates = historical_estimates(&portfolio_returns, &levels);

        let covariance = returns.covariance(1.0);
        let sigma_p = stats::portfolio_volatility(&w, &covariance);
        let asset_vols = returns.volatilities(1.0);
        let assets = returns.assets();

        if sigma_p <= VOLATILITY_EPSILON {
            warn!("Zero portfolio volatility; returning degenerate portfolio VaR");
            let mean = stats::mean(&portfolio_returns);
            let zeros: BTreeMap<String, f64> = assets.iter().map(|a| (a.clone(), 0.0)).collect();
            let levels = levels
                .iter()
                .map(|&confidence| PortfolioLevel {
                    confidence,
                    var: mean,
                    cvar: mean,
                    marginal_var: zeros.clone(),
                    component_var: zeros.clone(),
                    marginal_cvar: zeros.clone(),
                    component_cvar: zeros.clone(),
                })
                .collect();
            return Ok(PortfolioRiskResult {
                weights: weights.clone(),
                levels,
                portfolio_volatility: 0.0,
                diversification_ratio: 1.0,
                sample_size: returns.observations(),
                degenerate: true,
            });
        }

        let wv = DVector::from_column_slice(&w);
        let sigma_w = &covariance * &wv;
        let variance = sigma_p * sigma_p;

        let levels = estimates
            .iter()
            .map(|&ConfidenceEstimate { confidence, var, cvar }| {
                let mut level = PortfolioLevel {
                    confidence,
                    var,
                    cvar,
                    marginal_var: BTreeMap::new(),
                    component_var: BTreeMap::new(),
                    marginal_cvar: BTreeMap::new(),
                    component_cvar: BTreeMap::new(),
                };
                for (i, asset) in assets.iter().enumerate() {
                    let beta = sigma_w[i] / variance;
                    level.marginal_var.insert(asset.clone(), var * beta);
                    level.component_var.insert(asset.clone(), w[i] * var * beta);
                    level.marginal_cvar.insert(asset.clone(), cvar * beta);
                    level.component_cvar.insert(asset.clone(), w[i] * cvar * beta);
                }
                level
            })
            .collect();

        let undiversified: f64 = w.iter().zip(&asset_vols).map(|(wi, s)| wi.abs() * s).sum();
        let diversification_ratio = (undiversified / sigma_p).max(1.0);

        record_latency(CalculationMetric::PortfolioVar, started.elapsed());
        debug!(
            assets = assets.len(),
            sigma_p, diversification_ratio, "Portfolio VaR calculated"
        );

        Ok(PortfolioRiskResult {
            weights: weights.clone(),
            levels,
            portfolio_volatility: sigma_p,
            diversification_ratio,
            sample_size: returns.observations(),
            degenerate: false,
        })
    }
}

/// Weights in matrix column order; rejects missing, unknown or unnormalized weights
fn aligned_weights(returns: &ReturnMatrix, weights: &BTreeMap<String, f64>) -> RiskResult<Vec<f64>> {
    if let Some(unknown) = weights.keys().find(|a| returns.asset_index(a).is_none()) {
        return Err(RiskError::config(format!(
            "weight given for asset {} not in return matrix",
            unknown
        )));
    }
    let w = returns
        .assets()
        .iter()
        .map(|a| {
            weights
                .get(a)
                .copied()
                .ok_or_else(|| RiskError::config(format!("missing weight for asset {}", a)))
        })
        .collect::<RiskResult<Vec<_>>>()?;
    let sum: f64 = w.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(RiskError::config(format!(
            "portfolio weights sum to {:.6}, expected 1",
            sum
        )));
    }
    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarConfig;
    use chrono::{TimeZone, Utc};

    fn matrix() -> ReturnMatrix {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let a: Vec<f64> = (0..60)
            .map(|i| ((i * 17 % 23) as f64 - 11.0) / 500.0)
            .collect();
        let b: Vec<f64> = (0..60)
            .map(|i| ((i * 7 % 19) as f64 - 9.0) / 400.0)
            .collect();
        ReturnMatrix::from_columns(vec!["A".into(), "B".into()], start, &[a, b]).unwrap()
    }

    fn weights(a: f64, b: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([("A".to_string(), a), ("B".to_string(), b)])
    }

    #[test]
    fn test_components_sum_to_portfolio() {
        let calc = VarCalculator::new(VarConfig::default()).unwrap();
        let result = calc.portfolio(&matrix(), &weights(0.6, 0.4)).unwrap();
        for level in &result.levels {
            let var_sum: f64 = level.component_var.values().sum();
            let cvar_sum: f64 = level.component_cvar.values().sum();
            assert!((var_sum - level.var).abs() < 1e-10);
            assert!((cvar_sum - level.cvar).abs() < 1e-10);
            assert!(level.cvar <= level.var);
        }
        assert!(result.diversification_ratio >= 1.0);
        assert!(!result.degenerate);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let calc = VarCalculator::new(VarConfig::default()).unwrap();
        assert!(matches!(
            calc.portfolio(&matrix(), &weights(0.6, 0.6)),
            Err(RiskError::Configuration(_))
        ));
        let partial = BTreeMap::from([("A".to_string(), 1.0)]);
        assert!(calc.portfolio(&matrix(), &partial).is_err());
        let mut extra = weights(0.5, 0.5);
        extra.insert("C".to_string(), 0.0);
        assert!(calc.portfolio(&matrix(), &extra).is_err());
    }

    #[test]
    fn test_zero_volatility_is_degenerate() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let flat = ReturnMatrix::from_columns(
            vec!["A".into(), "B".into()],
            start,
            &[vec![0.001; 40], vec![0.001; 40]],
        )
        .unwrap();
        let calc = VarCalculator::new(VarConfig::default()).unwrap();
        let result = calc.portfolio(&flat, &weights(0.5, 0.5)).unwrap();
        assert!(result.degenerate);
        assert_eq!(result.diversification_ratio, 1.0);
        let level = result.level(0.95).unwrap();
        assert!((level.var - 0.001).abs() < 1e-15);
    }

    #[test]
    fn test_insufficient_observations() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let short = ReturnMatrix::from_columns(
            vec!["A".into(), "B".into()],
            start,
            &[vec![0.01, -0.01], vec![0.02, -0.02]],
        )
        .unwrap();
        let calc = VarCalculator::new(VarConfig::default()).unwrap();
        assert!(matches!(
            calc.portfolio(&short, &weights(0.5, 0.5)),
            Err(RiskError::InsufficientData { .. })
        ));
    }
}
