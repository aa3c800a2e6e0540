//! VaR result types

use super::VarMethod;
use serde::{Deserialize, Serialize};

/// VaR and CVaR at one confidence level, in return units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEstimate {
    pub confidence: f64,
    pub var: f64,
    pub cvar: f64,
}

/// Bootstrap confidence interval around a VaR estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Confidence of the VaR the interval brackets
    pub var_confidence: f64,
    pub lower: f64,
    pub upper: f64,
    pub resamples: usize,
}

/// Parameters the estimate was computed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct DistributionParameters {
    pub mean: f64,
    pub std_dev: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skewness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excess_kurtosis: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulations: Option<usize>,
}

/// Single-asset VaR/CVaR estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEstimateResult {
    pub asset: String,
    pub method: VarMethod,
    /// One entry per confidence level, ascending by confidence
    pub estimates: Vec<ConfidenceEstimate>,
    pub sample_size: usize,
    pub parameters: DistributionParameters,
    pub confidence_interval: Option<ConfidenceInterval>,
    /// Zero volatility: VaR and CVaR collapse to the mean
    pub degenerate: bool,
}

impl RiskEstimateResult {
    fn estimate_at(&self, confidence: f64) -> Option<&ConfidenceEstimate> {
        self.estimates
            .iter()
            .find(|e| (e.confidence - confidence).abs() < 1e-9)
    }

    /// VaR at the given confidence, if it was computed
    pub fn var_at(&self, confidence: f64) -> Option<f64> {
        self.estimate_at(confidence).map(|e| e.var)
    }

    /// CVaR at the given confidence, if it was computed
    pub fn cvar_at(&self, confidence: f64) -> Option<f64> {
        self.estimate_at(confidence).map(|e| e.cvar)
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut rows = String::new();
        for e in &self.estimates {
            rows.push_str(&format!(
                "{:>5.1}%        {:>+9.4}%     {:>+9.4}%\n",
                e.confidence * 100.0,
                e.var * 100.0,
                e.cvar * 100.0
            ));
        }
        let interval = match &self.confidence_interval {
            Some(ci) => format!(
                "{:.0}% VaR CI:    [{:+.4}%, {:+.4}%] ({} resamples)\n",
                ci.var_confidence * 100.0,
                ci.lower * 100.0,
                ci.upper * 100.0,
                ci.resamples
            ),
            None => String::new(),
        };
        format!(
            r#"
══════════════════════════════════════════════════════
               VALUE AT RISK: {}
══════════════════════════════════════════════════════
Method:           {}
Observations:     {}
Mean:             {:+.4}%
Std Dev:          {:.4}%
Degenerate:       {}

CONFIDENCE    VaR            CVaR
───────────────────────────────────────────────────────
{}{}══════════════════════════════════════════════════════
"#,
            self.asset,
            self.method,
            self.sample_size,
            self.parameters.mean * 100.0,
            self.parameters.std_dev * 100.0,
            self.degenerate,
            rows,
            interval,
        )
    }
}
