//! Signal significance testing

use super::{ValidationConfig, POWER_APPROXIMATION_MIN_SAMPLE};
use crate::error::{RiskError, RiskResult};
use crate::series::ReturnSeries;
use crate::stats::{self, VOLATILITY_EPSILON};
use crate::telemetry::{record_latency, CalculationMetric};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn, Span};

/// Significance of a return series' mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalValidationResult {
    pub asset: String,
    pub observations: usize,
    /// Mean per-period excess return
    pub mean_return: f64,
    pub std_dev: f64,
    pub t_statistic: f64,
    /// Two-sided
    pub p_value: f64,
    pub significant: bool,
    /// Annualized
    pub sharpe_ratio: f64,
    /// Cohen's d: mean / std
    pub effect_size: f64,
    /// Probability of detecting `effect_size` at this sample size
    pub power: f64,
    /// Observations needed to reach the target power; None without an effect
    pub required_sample_size: Option<usize>,
    /// Confidence interval for the mean at 1 - significance
    pub mean_confidence_interval: (f64, f64),
    /// Caveat on the power figure, when one applies
    pub power_note: Option<String>,
}

impl SignalValidationResult {
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               SIGNAL VALIDATION: {}
══════════════════════════════════════════════════════
Observations:     {}
Mean return:      {:+.5}%
Std Dev:          {:.5}%
t-statistic:      {:.4}
p-value:          {:.5}
Significant:      {}
Sharpe (ann.):    {:.3}
Effect size:      {:.4}
Power:            {:.3}
Required n:       {}
Mean CI:          [{:+.5}%, {:+.5}%]
{}══════════════════════════════════════════════════════
"#,
            self.asset,
            self.observations,
            self.mean_return * 100.0,
            self.std_dev * 100.0,
            self.t_statistic,
            self.p_value,
            self.significant,
            self.sharpe_ratio,
            self.effect_size,
            self.power,
            self.required_sample_size
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.mean_confidence_interval.0 * 100.0,
            self.mean_confidence_interval.1 * 100.0,
            self.power_note
                .as_ref()
                .map(|n| format!("Note:             {}\n", n))
                .unwrap_or_default(),
        )
    }
}

/// Tests whether a strategy's mean return differs from zero
#[derive(Debug, Clone)]
pub struct SignalValidator {
    config: ValidationConfig,
    span: Span,
}

impl SignalValidator {
    pub fn new(config: ValidationConfig) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            span: tracing::info_span!("signal_validation"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn validate(&self, series: &ReturnSeries) -> RiskResult<SignalValidationResult> {
        let _guard = self.span.enter();
        let started = Instant::now();
        let n = series.len();
        RiskError::require_observations(self.config.min_observations, n)?;

        let per_period_rf = self.config.risk_free_rate / self.config.periods_per_year;
        let excess: Vec<f64> = series.values().iter().map(|r| r - per_period_rf).collect();
        let mean = stats::mean(&excess);
        let std_dev = stats::std_dev(&excess);
        let alpha = self.config.significance_level;
        let df = (n - 1) as f64;
        let se = std_dev / (n as f64).sqrt();

        if std_dev <= VOLATILITY_EPSILON {
            warn!(asset = series.asset(), "Zero return variance; signal not testable");
            return Ok(SignalValidationResult {
                asset: series.asset().to_string(),
                observations: n,
                mean_return: mean,
                std_dev,
                t_statistic: 0.0,
                p_value: 1.0,
                significant: false,
                sharpe_ratio: 0.0,
                effect_size: 0.0,
                power: alpha,
                required_sample_size: None,
                mean_confidence_interval: (mean, mean),
                power_note: Some("zero variance; power undefined".to_string()),
            });
        }

        let t_statistic = mean / se;
        let p_value = (2.0 * (1.0 - stats::student_t_cdf(t_statistic.abs(), df)?)).clamp(0.0, 1.0);
        let t_crit = stats::student_t_ppf(1.0 - alpha / 2.0, df)?;
        let effect_size = mean / std_dev;
        let sharpe_ratio = effect_size * self.config.periods_per_year.sqrt();

        let power = normal_power(effect_size, n, alpha)?;
        let required_sample_size = required_sample_size(effect_size, alpha, self.config.target_power)?;
        let power_note = power_note(n, effect_size, required_sample_size);

        let result = SignalValidationResult {
            asset: series.asset().to_string(),
            observations: n,
            mean_return: mean,
            std_dev,
            t_statistic,
            p_value,
            significant: p_value < alpha,
            sharpe_ratio,
            effect_size,
            power,
            required_sample_size,
            mean_confidence_interval: (mean - t_crit * se, mean + t_crit * se),
            power_note,
        };

        record_latency(CalculationMetric::SignalValidation, started.elapsed());
        debug!(
            asset = series.asset(),
            t = result.t_statistic,
            p = result.p_value,
            power = result.power,
            "Signal validated"
        );
        Ok(result)
    }
}

/// Two-sided z-test power for standardized effect `d` with `n` observations
fn normal_power(d: f64, n: usize, alpha: f64) -> RiskResult<f64> {
    let z_crit = stats::normal_ppf(1.0 - alpha / 2.0)?;
    let shift = d.abs() * (n as f64).sqrt();
    Ok(stats::normal_cdf(shift - z_crit)? + stats::normal_cdf(-shift - z_crit)?)
}

/// n = ((z_{1-a/2} + z_{power}) / d)^2, rounded up
fn required_sample_size(d: f64, alpha: f64, power: f64) -> RiskResult<Option<usize>> {
    if d.abs() <= f64::EPSILON {
        return Ok(None);
    }
    let z_alpha = stats::normal_ppf(1.0 - alpha / 2.0)?;
    let z_power = stats::normal_ppf(power)?;
    let n = ((z_alpha + z_power) / d.abs()).powi(2).ceil();
    if !n.is_finite() || n > usize::MAX as f64 {
        return Ok(None);
    }
    Ok(Some(n as usize))
}

fn power_note(n: usize, d: f64, required: Option<usize>) -> Option<String> {
    if n < POWER_APPROXIMATION_MIN_SAMPLE {
        return Some(format!(
            "normal approximation with {} observations overstates the exact noncentral-t power",
            n
        ));
    }
    match required {
        Some(req) if req > 100 * n => Some(format!(
            "effect size {:.4} needs about {} observations; power estimate is unstable",
            d, req
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn validator() -> SignalValidator {
        SignalValidator::new(ValidationConfig::default()).unwrap()
    }

    fn series(values: &[f64]) -> ReturnSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        ReturnSeries::from_values("STRAT", start, values).unwrap()
    }

    #[test]
    fn test_strong_signal_significant() {
        // mean 0.01, alternating +/-0.005 around it
        let values: Vec<f64> = (0..120)
            .map(|i| if i % 2 == 0 { 0.015 } else { 0.005 })
            .collect();
        let result = validator().validate(&series(&values)).unwrap();
        assert!(result.significant);
        assert!(result.p_value < 1e-10);
        assert!(result.power > 0.99);
        assert!(result.effect_size > 1.9);
        assert!(result.mean_confidence_interval.0 > 0.0);
        assert!(result.power_note.is_none());
    }

    #[test]
    fn test_zero_mean_not_significant() {
        let values: Vec<f64> = (0..60).map(|i| if i % 2 == 0 { 0.01 } else { -0.01 }).collect();
        let result = validator().validate(&series(&values)).unwrap();
        assert!(!result.significant);
        assert!(result.t_statistic.abs() < 1e-9);
        assert!((result.p_value - 1.0).abs() < 1e-9);
        assert!(result.required_sample_size.is_none());
        assert!(result.power_note.is_some());
    }

    #[test]
    fn test_required_sample_size() {
        // d = 0.5 at alpha 0.05, power 0.8: ((1.96 + 0.8416) / 0.5)^2 = 31.4
        assert_eq!(required_sample_size(0.5, 0.05, 0.8).unwrap(), Some(32));
        assert_eq!(required_sample_size(0.0, 0.05, 0.8).unwrap(), None);
    }

    #[test]
    fn test_power_at_required_n() {
        let power = normal_power(0.5, 32, 0.05).unwrap();
        assert!(power >= 0.8 && power < 0.85);
        // no effect: power equals the test size
        assert!((normal_power(0.0, 50, 0.05).unwrap() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_zero_variance() {
        let result = validator().validate(&series(&[0.001; 40])).unwrap();
        assert!(!result.significant);
        assert_eq!(result.p_value, 1.0);
        assert!(result.power_note.is_some());
    }

    #[test]
    fn test_insufficient_data() {
        assert!(matches!(
            validator().validate(&series(&[0.01; 10])),
            Err(RiskError::InsufficientData { required: 30, actual: 10 })
        ));
    }
}
