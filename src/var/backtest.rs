//! Kupiec proportion-of-failures backtest

use super::calculator::historical_estimates;
use super::VarCalculator;
use crate::error::{RiskError, RiskResult};
use crate::series::ReturnSeries;
use crate::stats;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outcome of a Kupiec POF test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KupiecTestResult {
    pub confidence: f64,
    pub observations: usize,
    pub violations: usize,
    pub expected_violations: f64,
    pub violation_rate: f64,
    pub expected_rate: f64,
    /// LR_pof, asymptotically chi-squared with one degree of freedom
    pub likelihood_ratio: f64,
    pub p_value: f64,
    /// False when p_value <= significance level
    pub acceptable: bool,
}

impl KupiecTestResult {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               KUPIEC VaR BACKTEST
══════════════════════════════════════════════════════
Confidence:       {:.1}%
Observations:     {}
Violations:       {} (expected {:.1})
Violation rate:   {:.3}% (expected {:.3}%)
LR statistic:     {:.4}
p-value:          {:.4}
Model:            {}
══════════════════════════════════════════════════════
"#,
            self.confidence * 100.0,
            self.observations,
            self.violations,
            self.expected_violations,
            self.violation_rate * 100.0,
            self.expected_rate * 100.0,
            self.likelihood_ratio,
            self.p_value,
            if self.acceptable { "ACCEPTED" } else { "REJECTED" },
        )
    }
}

/// x * ln(p), with 0 * ln(0) = 0
fn xlogy(x: f64, p: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * p.ln()
    }
}

impl VarCalculator {
    /// Compare realized returns against VaR forecasts
    ///
    /// A violation is a realized return below its forecast VaR.
    pub fn kupiec_test(
        &self,
        realized: &[f64],
        var_forecasts: &[f64],
        confidence: f64,
    ) -> RiskResult<KupiecTestResult> {
        if realized.len() != var_forecasts.len() {
            return Err(RiskError::InvalidSeries(format!(
                "{} realized returns for {} VaR forecasts",
                realized.len(),
                var_forecasts.len()
            )));
        }
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(RiskError::config(format!(
                "confidence level {} outside (0, 1)",
                confidence
            )));
        }
        RiskError::require_observations(self.config().min_observations, realized.len())?;

        let n = realized.len();
        let violations = realized
            .iter()
            .zip(var_forecasts)
            .filter(|(r, v)| r < v)
            .count();

        let p = 1.0 - confidence;
        let nf = n as f64;
        let x = violations as f64;
        let pi = x / nf;

        let ll_null = xlogy(nf - x, 1.0 - p) + xlogy(x, p);
        let ll_alt = xlogy(nf - x, 1.0 - pi) + xlogy(x, pi);
        let likelihood_ratio = (-2.0 * (ll_null - ll_alt)).max(0.0);
        let p_value = stats::chi_squared_sf(likelihood_ratio, 1.0)?;
        let acceptable = p_value > self.config().significance_level;

        debug!(
            violations,
            observations = n,
            likelihood_ratio,
            p_value,
            "Kupiec test evaluated"
        );

        Ok(KupiecTestResult {
            confidence,
            observations: n,
            violations,
            expected_violations: p * nf,
            violation_rate: pi,
            expected_rate: p,
            likelihood_ratio,
            p_value,
            acceptable,
        })
    }

    /// Rolling historical-VaR backtest
    ///
    /// Forecasts each day's VaR from the preceding `window` returns and runs
    /// the Kupiec test on the out-of-sample days.
    pub fn rolling_backtest(
        &self,
        series: &ReturnSeries,
        window: usize,
        confidence: f64,
    ) -> RiskResult<KupiecTestResult> {
        let _guard = self.span().enter();
        RiskError::require_observations(self.config().min_observations, window)?;
        let values = series.values();
        let required = window + self.config().min_observations;
        RiskError::require_observations(required, values.len())?;

        let (realized, forecasts): (Vec<f64>, Vec<f64>) = (window..values.len())
            .map(|t| {
                let est = historical_estimates(&values[t - window..t], &[confidence]);
                (values[t], est[0].var)
            })
            .unzip();

        let result = self.kupiec_test(&realized, &forecasts, confidence)?;
        info!(
            asset = series.asset(),
            window,
            violations = result.violations,
            acceptable = result.acceptable,
            "Rolling VaR backtest complete"
        );
        Ok(result)
    }
}
