//! Risk parity result

use super::ParityMethod;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Optimized weights with their risk decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParityResult {
    pub method: ParityMethod,
    pub weights: BTreeMap<String, f64>,
    /// w_i * (S w)_i / sigma_p; sums to `portfolio_volatility`
    pub risk_contributions: BTreeMap<String, f64>,
    /// (S w)_i / sigma_p
    pub marginal_contributions: BTreeMap<String, f64>,
    /// Annualized
    pub portfolio_volatility: f64,
    pub diversification_ratio: f64,
    /// 1 / sum(w_i^2)
    pub effective_n: f64,
    pub iterations: usize,
    pub converged: bool,
    /// Equal weights were used because the solver did not converge
    pub fallback_used: bool,
}

impl RiskParityResult {
    /// Risk contributions as shares of portfolio volatility
    pub fn relative_contributions(&self) -> BTreeMap<String, f64> {
        if self.portfolio_volatility <= 0.0 {
            return self.risk_contributions.keys().map(|k| (k.clone(), 0.0)).collect();
        }
        self.risk_contributions
            .iter()
            .map(|(k, rc)| (k.clone(), rc / self.portfolio_volatility))
            .collect()
    }

    pub fn format_table(&self) -> String {
        let mut out = String::new();
        out.push_str("╔══════════════════════════════════════════════════════╗\n");
        out.push_str(&format!("║  RISK PARITY ({:<38})║\n", self.method.as_str()));
        out.push_str("╠══════════════════════════════════════════════════════╣\n");
        out.push_str("║  Asset            Weight      Risk share             ║\n");
        let shares = self.relative_contributions();
        for (asset, weight) in &self.weights {
            let share = shares.get(asset).copied().unwrap_or(0.0);
            out.push_str(&format!(
                "║  {:<14} {:>8.2}%   {:>8.2}%              ║\n",
                asset,
                weight * 100.0,
                share * 100.0
            ));
        }
        out.push_str("╠══════════════════════════════════════════════════════╣\n");
        out.push_str(&format!(
            "║  Portfolio vol:       {:>8.2}%                       ║\n",
            self.portfolio_volatility * 100.0
        ));
        out.push_str(&format!(
            "║  Diversification:     {:>8.3}                        ║\n",
            self.diversification_ratio
        ));
        out.push_str(&format!(
            "║  Effective N:         {:>8.3}                        ║\n",
            self.effective_n
        ));
        out.push_str(&format!(
            "║  Iterations:          {:>8}  converged: {:<5}      ║\n",
            self.iterations, self.converged
        ));
        if self.fallback_used {
            out.push_str("║  Solver did not converge; equal weights used         ║\n");
        }
        out.push_str("╚══════════════════════════════════════════════════════╝\n");
        out
    }
}
