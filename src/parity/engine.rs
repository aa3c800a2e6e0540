//! Risk parity engine

use super::{ParityConfig, ParityMethod, RiskParityResult};
use crate::error::{RiskError, RiskResult};
use crate::optimize::{ConstrainedSolver, ProjectedGradientSolver, SimplexBounds, SolverOutcome};
use crate::series::{ReturnMatrix, ReturnSeries};
use crate::stats::{self, TRADING_DAYS, VOLATILITY_EPSILON};
use crate::telemetry::{record_latency, set_gauge, CalculationMetric, GaugeMetric};
use nalgebra::{DMatrix, DVector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Span};

/// Builds risk parity portfolios from return histories
#[derive(Clone)]
pub struct RiskParityEngine {
    config: ParityConfig,
    solver: Arc<dyn ConstrainedSolver>,
    span: Span,
}

impl std::fmt::Debug for RiskParityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskParityEngine")
            .field("config", &self.config)
            .field("solver", &self.solver.name())
            .finish()
    }
}

/// Volatility decomposition of one weight vector
struct Decomposition {
    volatility: f64,
    marginal: Vec<f64>,
    contributions: Vec<f64>,
}

impl RiskParityEngine {
    /// Engine with the projected-gradient solver
    pub fn new(config: ParityConfig) -> RiskResult<Self> {
        config.validate()?;
        let solver = ProjectedGradientSolver::new(config.max_iterations, config.tolerance);
        Ok(Self {
            config,
            solver: Arc::new(solver),
            span: tracing::info_span!("risk_parity"),
        })
    }

    pub fn with_solver(mut self, solver: Arc<dyn ConstrainedSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ParityConfig {
        &self.config
    }

    /// Optimize over series inner-joined on their timestamps
    pub fn optimize(&self, series: &[ReturnSeries]) -> RiskResult<RiskParityResult> {
        let matrix = ReturnMatrix::from_series(series)?;
        self.optimize_matrix(&matrix)
    }

    /// Run [`optimize`](Self::optimize) on the blocking pool
    pub async fn spawn_optimize(&self, series: Vec<ReturnSeries>) -> RiskResult<RiskParityResult> {
        let engine = self.clone();
        tokio::task::spawn_blocking(move || engine.optimize(&series))
            .await
            .map_err(|e| RiskError::Offload(e.to_string()))?
    }

    pub fn optimize_matrix(&self, returns: &ReturnMatrix) -> RiskResult<RiskParityResult> {
        let _guard = self.span.enter();
        let started = Instant::now();
        RiskError::require_observations(self.config.min_observations, returns.observations())?;

        let assets = returns.assets();
        let n = assets.len();
        let bounds = SimplexBounds::new(self.config.min_weight, self.config.max_weight, n)?;
        let covariance = returns.covariance(TRADING_DAYS);
        let vols: Vec<f64> = (0..n).map(|i| covariance[(i, i)].max(0.0).sqrt()).collect();

        // budgets are checked before any degenerate shortcut
        let budgets = match self.config.method {
            ParityMethod::RiskBudget => Some(self.config.normalized_budgets(assets)?),
            _ => None,
        };

        let outcome = if vols.iter().any(|v| *v <= VOLATILITY_EPSILON) {
            warn!(
                method = %self.config.method,
                "Asset with zero volatility; using equal weights"
            );
            None
        } else {
            let inverse_vol = inverse_volatility_weights(&vols, &bounds);
            Some(match self.config.method {
                ParityMethod::InverseVolatility => SolverOutcome {
                    objective: 0.0,
                    weights: inverse_vol,
                    iterations: 0,
                    converged: true,
                },
                ParityMethod::EqualRiskContribution => {
                    let targets = vec![1.0 / n as f64; n];
                    self.solve_budget(&covariance, &targets, &inverse_vol, &bounds)
                }
                ParityMethod::RiskBudget => {
                    let targets = budgets.unwrap_or_else(|| vec![1.0 / n as f64; n]);
                    self.solve_budget(&covariance, &targets, &inverse_vol, &bounds)
                }
                ParityMethod::DiversifiedRiskParity => {
                    self.solve_diversified(&covariance, &vols, &inverse_vol, &bounds)
                }
            })
        };

        let (weights, iterations, converged, fallback_used) = match outcome {
            Some(o) if o.converged => (o.weights, o.iterations, true, false),
            Some(o) => {
                warn!(
                    solver = self.solver.name(),
                    iterations = o.iterations,
                    "Parity solver did not converge; falling back to equal weights"
                );
                (bounds.equal_weights(), o.iterations, false, true)
            }
            None => (bounds.equal_weights(), 0, false, true),
        };

        let decomposition = decompose(&weights, &covariance);
        let diversification_ratio = diversification_ratio(&weights, &vols, decomposition.volatility);
        let effective_n = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let to_map = |values: &[f64]| -> BTreeMap<String, f64> {
            assets.iter().cloned().zip(values.iter().copied()).collect()
        };

        let result = RiskParityResult {
            method: self.config.method,
            weights: to_map(&weights),
            risk_contributions: to_map(&decomposition.contributions),
            marginal_contributions: to_map(&decomposition.marginal),
            portfolio_volatility: decomposition.volatility,
            diversification_ratio,
            effective_n,
            iterations,
            converged,
            fallback_used,
        };

        record_latency(CalculationMetric::ParityOptimization, started.elapsed());
        set_gauge(GaugeMetric::PortfolioVolatility, result.portfolio_volatility);
        info!(
            method = %result.method,
            assets = n,
            volatility = result.portfolio_volatility,
            effective_n = result.effective_n,
            iterations,
            fallback_used,
            "Risk parity weights computed"
        );
        Ok(result)
    }

    fn solve_budget(
        &self,
        covariance: &DMatrix<f64>,
        targets: &[f64],
        x0: &[f64],
        bounds: &SimplexBounds,
    ) -> SolverOutcome {
        let objective = |w: &[f64]| -> f64 {
            match relative_contributions(w, covariance) {
                Some(rc) => rc.iter().zip(targets).map(|(r, b)| (r - b).powi(2)).sum(),
                None => f64::INFINITY,
            }
        };
        let outcome = self.solver.minimize(&objective, x0, bounds);
        debug!(
            solver = self.solver.name(),
            objective = outcome.objective,
            iterations = outcome.iterations,
            "Budget objective minimized"
        );
        outcome
    }

    fn solve_diversified(
        &self,
        covariance: &DMatrix<f64>,
        vols: &[f64],
        x0: &[f64],
        bounds: &SimplexBounds,
    ) -> SolverOutcome {
        let n = vols.len() as f64;
        let penalty = self.config.diversification_penalty;
        let objective = |w: &[f64]| -> f64 {
            let sigma_p = stats::portfolio_volatility(w, covariance);
            let Some(rc) = relative_contributions(w, covariance) else {
                return f64::INFINITY;
            };
            let dispersion: f64 = rc.iter().map(|r| (r - 1.0 / n).powi(2)).sum();
            let weighted_vol: f64 = w.iter().zip(vols).map(|(wi, v)| wi * v).sum();
            -(weighted_vol / sigma_p) + penalty * dispersion
        };
        self.solver.minimize(&objective, x0, bounds)
    }
}

/// w_i * (S w)_i / sigma_p^2, or None when the portfolio has no variance
fn relative_contributions(weights: &[f64], covariance: &DMatrix<f64>) -> Option<Vec<f64>> {
    let w = DVector::from_column_slice(weights);
    let sw = covariance * &w;
    let variance = w.dot(&sw);
    if variance <= VOLATILITY_EPSILON * VOLATILITY_EPSILON {
        return None;
    }
    Some(weights.iter().zip(sw.iter()).map(|(wi, s)| wi * s / variance).collect())
}

fn decompose(weights: &[f64], covariance: &DMatrix<f64>) -> Decomposition {
    let w = DVector::from_column_slice(weights);
    let sw = covariance * &w;
    let volatility = w.dot(&sw).max(0.0).sqrt();
    if volatility <= VOLATILITY_EPSILON {
        return Decomposition {
            volatility: 0.0,
            marginal: vec![0.0; weights.len()],
            contributions: vec![0.0; weights.len()],
        };
    }
    let marginal: Vec<f64> = sw.iter().map(|s| s / volatility).collect();
    let contributions = weights.iter().zip(&marginal).map(|(wi, m)| wi * m).collect();
    Decomposition {
        volatility,
        marginal,
        contributions,
    }
}

fn inverse_volatility_weights(vols: &[f64], bounds: &SimplexBounds) -> Vec<f64> {
    let total: f64 = vols.iter().map(|v| 1.0 / v).sum();
    let raw: Vec<f64> = vols.iter().map(|v| (1.0 / v) / total).collect();
    bounds.project(&raw)
}

/// sum(w_i * sigma_i) / sigma_p, floored at 1
fn diversification_ratio(weights: &[f64], vols: &[f64], sigma_p: f64) -> f64 {
    if sigma_p <= VOLATILITY_EPSILON {
        return 1.0;
    }
    let weighted: f64 = weights.iter().zip(vols).map(|(w, v)| w.abs() * v).sum();
    (weighted / sigma_p).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pattern(p: [f64; 4], scale: f64) -> Vec<f64> {
        p.iter().cycle().take(40).map(|x| x * scale).collect()
    }

    fn series(columns: &[(&str, Vec<f64>)]) -> Vec<ReturnSeries> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        columns
            .iter()
            .map(|(name, values)| ReturnSeries::from_values(*name, start, values).unwrap())
            .collect()
    }

    const P1: [f64; 4] = [1.0, -1.0, 1.0, -1.0];
    const P2: [f64; 4] = [1.0, 1.0, -1.0, -1.0];
    const P3: [f64; 4] = [1.0, -1.0, -1.0, 1.0];

    fn engine(method: ParityMethod) -> RiskParityEngine {
        RiskParityEngine::new(ParityConfig {
            method,
            ..ParityConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_identical_vol_uncorrelated_pair() {
        let data = series(&[("A", pattern(P1, 0.01)), ("B", pattern(P2, 0.01))]);
        for method in [ParityMethod::EqualRiskContribution, ParityMethod::InverseVolatility] {
            let result = engine(method).optimize(&data).unwrap();
            assert!((result.weights["A"] - 0.5).abs() < 1e-3);
            assert!((result.weights["B"] - 0.5).abs() < 1e-3);
            assert!(!result.fallback_used);
            assert!((result.effective_n - 2.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_erc_equalizes_correlated_contributions() {
        let a = pattern(P1, 0.01);
        let b = pattern(P2, 0.02);
        let c: Vec<f64> = a
            .iter()
            .zip(pattern(P3, 0.01))
            .map(|(x, y)| 0.5 * x + 0.5 * y)
            .collect();
        let data = series(&[("A", a), ("B", b), ("C", c)]);
        let result = engine(ParityMethod::EqualRiskContribution).optimize(&data).unwrap();

        assert!(result.converged);
        let total: f64 = result.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        for share in result.relative_contributions().values() {
            assert!((share - 1.0 / 3.0).abs() < 1e-3, "share {}", share);
        }
        let rc_sum: f64 = result.risk_contributions.values().sum();
        assert!((rc_sum - result.portfolio_volatility).abs() < 1e-9);
        assert!(result.diversification_ratio >= 1.0);
    }

    #[test]
    fn test_inverse_volatility_respects_bounds() {
        let data = series(&[("A", pattern(P1, 0.01)), ("B", pattern(P2, 0.02))]);
        let result = engine(ParityMethod::InverseVolatility).optimize(&data).unwrap();
        assert!((result.weights["A"] - 2.0 / 3.0).abs() < 1e-6);

        let capped = RiskParityEngine::new(ParityConfig {
            method: ParityMethod::InverseVolatility,
            max_weight: 0.6,
            ..ParityConfig::default()
        })
        .unwrap()
        .optimize(&data)
        .unwrap();
        assert!((capped.weights["A"] - 0.6).abs() < 1e-6);
        assert!((capped.weights["B"] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_risk_budget() {
        let data = series(&[("A", pattern(P1, 0.01)), ("B", pattern(P2, 0.01))]);
        let engine = RiskParityEngine::new(ParityConfig {
            method: ParityMethod::RiskBudget,
            risk_budgets: Some(BTreeMap::from([("A".to_string(), 0.8), ("B".to_string(), 0.2)])),
            ..ParityConfig::default()
        })
        .unwrap();
        let result = engine.optimize(&data).unwrap();
        // uncorrelated equal vols: w_i proportional to sqrt(b_i)
        assert!((result.weights["A"] - 2.0 / 3.0).abs() < 1e-3);
        let shares = result.relative_contributions();
        assert!((shares["A"] - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_risk_budget_requires_budgets() {
        let result = RiskParityEngine::new(ParityConfig {
            method: ParityMethod::RiskBudget,
            ..ParityConfig::default()
        });
        assert!(matches!(result, Err(RiskError::Configuration(_))));
    }

    #[test]
    fn test_diversified_risk_parity() {
        let a = pattern(P1, 0.01);
        let b = pattern(P2, 0.02);
        let c: Vec<f64> = a.iter().zip(&b).map(|(x, y)| 0.7 * x + 0.3 * y).collect();
        let data = series(&[("A", a), ("B", b), ("C", c)]);
        let result = engine(ParityMethod::DiversifiedRiskParity).optimize(&data).unwrap();
        let total: f64 = result.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(result.weights.values().all(|w| (0.0..=1.0).contains(w)));
        assert!(result.diversification_ratio >= 1.0);
    }

    #[test]
    fn test_infeasible_bounds() {
        let data = series(&[
            ("A", pattern(P1, 0.01)),
            ("B", pattern(P2, 0.01)),
            ("C", pattern(P3, 0.01)),
        ]);
        let engine = RiskParityEngine::new(ParityConfig {
            min_weight: 0.4,
            ..ParityConfig::default()
        })
        .unwrap();
        assert!(matches!(engine.optimize(&data), Err(RiskError::Configuration(_))));
    }

    #[test]
    fn test_insufficient_data() {
        let short: Vec<f64> = pattern(P1, 0.01).into_iter().take(10).collect();
        let data = series(&[("A", short.clone()), ("B", short)]);
        assert!(matches!(
            engine(ParityMethod::EqualRiskContribution).optimize(&data),
            Err(RiskError::InsufficientData { required: 30, actual: 10 })
        ));
    }

    struct StalledSolver;

    impl ConstrainedSolver for StalledSolver {
        fn minimize(
            &self,
            _objective: &dyn Fn(&[f64]) -> f64,
            x0: &[f64],
            bounds: &SimplexBounds,
        ) -> SolverOutcome {
            SolverOutcome {
                weights: bounds.project(x0),
                objective: 1.0,
                iterations: 1000,
                converged: false,
            }
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[test]
    fn test_non_convergence_falls_back_to_equal_weights() {
        let data = series(&[("A", pattern(P1, 0.01)), ("B", pattern(P2, 0.03))]);
        let result = engine(ParityMethod::EqualRiskContribution)
            .with_solver(Arc::new(StalledSolver))
            .optimize(&data)
            .unwrap();
        assert!(result.fallback_used);
        assert!(!result.converged);
        assert_eq!(result.weights["A"], 0.5);
        assert_eq!(result.weights["B"], 0.5);
    }

    #[test]
    fn test_zero_volatility_uses_equal_weights() {
        let data = series(&[("A", vec![0.0; 40]), ("B", pattern(P2, 0.01))]);
        let result = engine(ParityMethod::InverseVolatility).optimize(&data).unwrap();
        assert!(result.fallback_used);
        assert_eq!(result.weights["A"], 0.5);
    }

    #[tokio::test]
    async fn test_spawn_optimize() {
        let data = series(&[("A", pattern(P1, 0.01)), ("B", pattern(P2, 0.01))]);
        let result = engine(ParityMethod::EqualRiskContribution)
            .spawn_optimize(data)
            .await
            .unwrap();
        assert!((result.weights["A"] - 0.5).abs() < 1e-3);
    }
}
