//! Single-asset VaR/CVaR calculator

use super::types::{ConfidenceEstimate, ConfidenceInterval, DistributionParameters, RiskEstimateResult};
use super::{ParametricDistribution, VarConfig, VarMethod};
use crate::error::{RiskError, RiskResult};
use crate::series::ReturnSeries;
use crate::stats::{self, VOLATILITY_EPSILON};
use crate::telemetry::{record_latency, CalculationMetric};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StudentT};
use std::time::Instant;
use tracing::{debug, warn, Span};

/// Grid size for integrating the Cornish-Fisher tail
const CORNISH_FISHER_TAIL_POINTS: usize = 256;

/// Confidence bracketed by the bootstrap interval
const BOOTSTRAP_VAR_CONFIDENCE: f64 = 0.95;

/// VaR/CVaR calculator
///
/// Holds only configuration; every call is independent and seeds its own RNG.
#[derive(Debug, Clone)]
pub struct VarCalculator {
    config: VarConfig,
    span: Span,
}

impl VarCalculator {
    /// Create a calculator, validating the configuration
    pub fn new(config: VarConfig) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            span: tracing::info_span!("var_calculator"),
        })
    }

    /// Log under the given span instead of the default one
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &VarConfig {
        &self.config
    }

    pub(super) fn span(&self) -> &Span {
        &self.span
    }

    /// Estimate with the configured method
    pub fn calculate(&self, series: &ReturnSeries) -> RiskResult<RiskEstimateResult> {
        match self.config.method {
            VarMethod::Historical => self.historical(series),
            VarMethod::Parametric => self.parametric(series),
            VarMethod::CornishFisher => self.cornish_fisher(series),
            VarMethod::MonteCarlo => self.monte_carlo(series),
        }
    }

    /// Historical simulation with a bootstrap interval on the 95% VaR
    pub fn historical(&self, series: &ReturnSeries) -> RiskResult<RiskEstimateResult> {
        let _guard = self.span.enter();
        let started = Instant::now();
        let values = self.checked_values(series)?;
        let parameters = base_parameters(values);

        if let Some(result) = self.degenerate(series, VarMethod::Historical, parameters) {
            return Ok(result);
        }

        let estimates = historical_estimates(values, &self.config.sorted_levels());
        let confidence_interval = Some(self.bootstrap_interval(values, self.config.seed));

        record_latency(CalculationMetric::VarEstimate, started.elapsed());
        debug!(
            asset = series.asset(),
            observations = values.len(),
            "Historical VaR calculated"
        );

        Ok(RiskEstimateResult {
            asset: series.asset().to_string(),
            method: VarMethod::Historical,
            estimates,
            sample_size: values.len(),
            parameters,
            confidence_interval,
            degenerate: false,
        })
    }

    /// Closed-form VaR/CVaR under a normal or unit-variance Student-t fit
    pub fn parametric(&self, series: &ReturnSeries) -> RiskResult<RiskEstimateResult> {
        let _guard = self.span.enter();
        let started = Instant::now();
        let values = self.checked_values(series)?;
        let mut parameters = base_parameters(values);

        if let ParametricDistribution::StudentT { degrees_of_freedom } = self.config.distribution {
            parameters.degrees_of_freedom = Some(degrees_of_freedom);
        }
        if let Some(result) = self.degenerate(series, VarMethod::Parametric, parameters) {
            return Ok(result);
        }

        let (mu, sigma) = (parameters.mean, parameters.std_dev);
        let estimates = self
            .config
            .sorted_levels()
            .into_iter()
            .map(|confidence| {
                let alpha = 1.0 - confidence;
                let (var, cvar) = match self.config.distribution {
                    ParametricDistribution::Normal => {
                        let z = stats::normal_ppf(alpha)?;
                        let tail = stats::normal_pdf(z)? / alpha;
                        (mu + sigma * z, mu - sigma * tail)
                    }
                    ParametricDistribution::StudentT { degrees_of_freedom: nu } => {
                        let scale = ((nu - 2.0) / nu).sqrt();
                        let q = stats::student_t_ppf(alpha, nu)?;
                        let tail = (nu + q * q) / (nu - 1.0) * stats::student_t_pdf(q, nu)? / alpha;
                        (mu + sigma * scale * q, mu - sigma * scale * tail)
                    }
                };
                Ok(ConfidenceEstimate {
                    confidence,
                    var,
                    cvar,
                })
            })
            .collect::<RiskResult<Vec<_>>>()?;

        record_latency(CalculationMetric::VarEstimate, started.elapsed());
        debug!(asset = series.asset(), mu, sigma, "Parametric VaR calculated");

        Ok(RiskEstimateResult {
            asset: series.asset().to_string(),
            method: VarMethod::Parametric,
            estimates,
            sample_size: values.len(),
            parameters,
            confidence_interval: None,
            degenerate: false,
        })
    }

    /// Normal quantile corrected for sample skewness and excess kurtosis
    ///
    /// CVaR averages the corrected quantile function over the tail. The
    /// expansion loses monotonicity for extreme moments, so estimates are
    /// clamped to keep VaR ordered across confidences and CVaR beyond VaR.
    pub fn cornish_fisher(&self, series: &ReturnSeries) -> RiskResult<RiskEstimateResult> {
        let _guard = self.span.enter();
        let started = Instant::now();
        let values = self.checked_values(series)?;
        let mut parameters = base_parameters(values);
        let skew = stats::skewness(values);
        let kurt = stats::excess_kurtosis(values);
        parameters.skewness = Some(skew);
        parameters.excess_kurtosis = Some(kurt);

        if let Some(result) = self.degenerate(series, VarMethod::CornishFisher, parameters) {
            return Ok(result);
        }

        let (mu, sigma) = (parameters.mean, parameters.std_dev);
        let mut estimates = Vec::with_capacity(self.config.confidence_levels.len());
        for confidence in self.config.sorted_levels() {
            let alpha = 1.0 - confidence;
            let z = cornish_fisher_quantile(stats::normal_ppf(alpha)?, skew, kurt);

            let mut tail_sum = 0.0;
            for k in 0..CORNISH_FISHER_TAIL_POINTS {
                let u = alpha * (k as f64 + 0.5) / CORNISH_FISHER_TAIL_POINTS as f64;
                tail_sum += cornish_fisher_quantile(stats::normal_ppf(u)?, skew, kurt);
            }
            let tail_z = tail_sum / CORNISH_FISHER_TAIL_POINTS as f64;

            estimates.push(ConfidenceEstimate {
                confidence,
                var: mu + sigma * z,
                cvar: mu + sigma * tail_z,
            });
        }

        if enforce_ordering(&mut estimates) {
            warn!(
                asset = series.asset(),
                skew, kurt, "Cornish-Fisher expansion non-monotone; estimates clamped"
            );
        }

        record_latency(CalculationMetric::VarEstimate, started.elapsed());
        debug!(asset = series.asset(), skew, kurt, "Cornish-Fisher VaR calculated");

        Ok(RiskEstimateResult {
            asset: series.asset().to_string(),
            method: VarMethod::CornishFisher,
            estimates,
            sample_size: values.len(),
            parameters,
            confidence_interval: None,
            degenerate: false,
        })
    }

    /// Monte Carlo with the configured seed
    pub fn monte_carlo(&self, series: &ReturnSeries) -> RiskResult<RiskEstimateResult> {
        self.monte_carlo_with_seed(series, self.config.seed)
    }

    /// Simulate Student-t returns scaled to the sample moments, then apply
    /// historical simulation to the draws
    pub fn monte_carlo_with_seed(
        &self,
        series: &ReturnSeries,
        seed: u64,
    ) -> RiskResult<RiskEstimateResult> {
        let _guard = self.span.enter();
        let started = Instant::now();
        let values = self.checked_values(series)?;
        let nu = self.config.monte_carlo_df;
        let simulations = self.config.monte_carlo_simulations;

        let mut parameters = base_parameters(values);
        parameters.degrees_of_freedom = Some(nu);
        parameters.simulations = Some(simulations);

        if let Some(result) = self.degenerate(series, VarMethod::MonteCarlo, parameters) {
            return Ok(result);
        }

        let dist = StudentT::new(nu).map_err(|e| RiskError::Distribution(e.to_string()))?;
        let scale = parameters.std_dev * ((nu - 2.0) / nu).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);
        let simulated: Vec<f64> = (0..simulations)
            .map(|_| parameters.mean + scale * dist.sample(&mut rng))
            .collect();

        let estimates = historical_estimates(&simulated, &self.config.sorted_levels());

        record_latency(CalculationMetric::MonteCarlo, started.elapsed());
        debug!(
            asset = series.asset(),
            simulations,
            seed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Monte Carlo VaR calculated"
        );

        Ok(RiskEstimateResult {
            asset: series.asset().to_string(),
            method: VarMethod::MonteCarlo,
            estimates,
            sample_size: values.len(),
            parameters,
            confidence_interval: None,
            degenerate: false,
        })
    }

    /// Run Monte Carlo on the blocking thread pool
    pub async fn spawn_monte_carlo(&self, series: ReturnSeries) -> RiskResult<RiskEstimateResult> {
        let calculator = self.clone();
        tokio::task::spawn_blocking(move || calculator.monte_carlo(&series))
            .await
            .map_err(|e| RiskError::Offload(e.to_string()))?
    }

    pub(super) fn checked_values<'a>(&self, series: &'a ReturnSeries) -> RiskResult<&'a [f64]> {
        RiskError::require_observations(self.config.min_observations, series.len())?;
        Ok(series.values())
    }

    /// Flagged result with VaR = CVaR = mean when volatility vanishes
    fn degenerate(
        &self,
        series: &ReturnSeries,
        method: VarMethod,
        parameters: DistributionParameters,
    ) -> Option<RiskEstimateResult> {
        if parameters.std_dev > VOLATILITY_EPSILON {
            return None;
        }
        warn!(
            asset = series.asset(),
            method = method.as_str(),
            "Zero volatility; returning degenerate VaR"
        );
        let estimates = self
            .config
            .sorted_levels()
            .into_iter()
            .map(|confidence| ConfidenceEstimate {
                confidence,
                var: parameters.mean,
                cvar: parameters.mean,
            })
            .collect();
        Some(RiskEstimateResult {
            asset: series.asset().to_string(),
            method,
            estimates,
            sample_size: series.len(),
            parameters,
            confidence_interval: None,
            degenerate: true,
        })
    }

    fn bootstrap_interval(&self, values: &[f64], seed: u64) -> ConfidenceInterval {
        let n = values.len();
        let resamples = self.config.bootstrap_resamples;
        let q = (1.0 - BOOTSTRAP_VAR_CONFIDENCE) * 100.0;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sample = vec![0.0; n];

        let mut boot: Vec<f64> = (0..resamples)
            .map(|_| {
                for slot in sample.iter_mut() {
                    *slot = values[rng.random_range(0..n)];
                }
                stats::percentile(&sample, q)
            })
            .collect();
        boot.sort_by(f64::total_cmp);

        ConfidenceInterval {
            var_confidence: BOOTSTRAP_VAR_CONFIDENCE,
            lower: stats::percentile_sorted(&boot, 2.5),
            upper: stats::percentile_sorted(&boot, 97.5),
            resamples,
        }
    }
}

pub(super) fn base_parameters(values: &[f64]) -> DistributionParameters {
    DistributionParameters {
        mean: stats::mean(values),
        std_dev: stats::std_dev(values),
        ..DistributionParameters::default()
    }
}

/// Empirical percentile VaR and tail-mean CVaR for each level
pub(super) fn historical_estimates(values: &[f64], levels: &[f64]) -> Vec<ConfidenceEstimate> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    levels
        .iter()
        .map(|&confidence| {
            let var = stats::percentile_sorted(&sorted, (1.0 - confidence) * 100.0);
            let tail: Vec<f64> = sorted.iter().copied().take_while(|r| *r <= var).collect();
            let cvar = if tail.is_empty() { var } else { stats::mean(&tail) };
            ConfidenceEstimate {
                confidence,
                var,
                cvar: cvar.min(var),
            }
        })
        .collect()
}

/// Cornish-Fisher adjusted standard quantile
pub(super) fn cornish_fisher_quantile(z: f64, skew: f64, kurt: f64) -> f64 {
    let z2 = z * z;
    let z3 = z2 * z;
    z + (z2 - 1.0) * skew / 6.0 + (z3 - 3.0 * z) * kurt / 24.0
        - (2.0 * z3 - 5.0 * z) * skew * skew / 36.0
}

/// Clamp estimates (ascending confidence) so VaR never becomes less extreme
/// at higher confidence and CVaR never sits above VaR. Returns true if any
/// value moved.
fn enforce_ordering(estimates: &mut [ConfidenceEstimate]) -> bool {
    let mut adjusted = false;
    let mut prev_var = f64::INFINITY;
    let mut prev_cvar = f64::INFINITY;
    for e in estimates.iter_mut() {
        if e.var > prev_var {
            e.var = prev_var;
            adjusted = true;
        }
        if e.cvar > e.var {
            e.cvar = e.var;
            adjusted = true;
        }
        if e.cvar > prev_cvar {
            e.cvar = prev_cvar;
            adjusted = true;
        }
        prev_var = e.var;
        prev_cvar = e.cvar;
    }
    adjusted
}
