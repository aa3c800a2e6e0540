//! Stress test engine

use super::types::{
    loss_percentage, AssetImpact, FailedTest, HistoricalEvent, Portfolio, ScenarioTemplate,
    StressTestKind, StressTestReport, StressTestResult,
};
use super::{StressCatalog, StressConfig};
use crate::error::{RiskError, RiskResult};
use crate::stats::{self, TRADING_DAYS};
use crate::telemetry::{record_latency, set_gauge, CalculationMetric, GaugeMetric};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Span};
use uuid::Uuid;

/// Confidence of the volatility-shock loss quantile
const VOLATILITY_SHOCK_CONFIDENCE: f64 = 0.99;

/// Runs stress tests from an injected catalog
///
/// Read-only: no call mutates the catalog or the portfolio.
#[derive(Debug, Clone)]
pub struct StressTestEngine {
    config: StressConfig,
    catalog: Arc<StressCatalog>,
    span: Span,
}

impl StressTestEngine {
    pub fn new(config: StressConfig, catalog: StressCatalog) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            span: tracing::info_span!("stress_test"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    pub fn catalog(&self) -> &StressCatalog {
        &self.catalog
    }

    /// Replay a catalog event by name
    pub fn replay_event(&self, portfolio: &Portfolio, name: &str) -> RiskResult<StressTestResult> {
        let event = self
            .catalog
            .event(name)
            .ok_or_else(|| RiskError::config(format!("unknown stress event {}", name)))?;
        self.historical_replay(portfolio, event)
    }

    /// Reprice holdings with an event's per-class shocks
    ///
    /// Holdings whose class the event does not cover take the event's
    /// average shock.
    pub fn historical_replay(
        &self,
        portfolio: &Portfolio,
        event: &HistoricalEvent,
    ) -> RiskResult<StressTestResult> {
        let _guard = self.span.enter();
        let average = event.average_shock();

        let mut impacts = BTreeMap::new();
        for (asset, exposure) in portfolio.exposures() {
            let class = portfolio.asset_classes.get(&asset).copied();
            let shock = class
                .and_then(|c| event.market_impact.get(&c).copied())
                .or(average)
                .ok_or_else(|| {
                    RiskError::config(format!("event {} has no market impact", event.name))
                })?;
            impacts.insert(asset, shocked(exposure, class, shock));
        }

        let survival = 1.0 - f64::from(event.duration_days) / 365.0;
        let result = StressTestResult::from_impacts(
            event.name.clone(),
            StressTestKind::HistoricalReplay,
            impacts,
            survival,
        );
        debug!(
            event = %event.name,
            loss = %result.absolute_loss,
            loss_pct = result.percentage_loss,
            "Historical event replayed"
        );
        Ok(result)
    }

    /// Run a catalog scenario by name with the configured seed
    pub fn run_scenario(&self, portfolio: &Portfolio, name: &str) -> RiskResult<StressTestResult> {
        let template = self
            .catalog
            .scenario(name)
            .ok_or_else(|| RiskError::config(format!("unknown stress scenario {}", name)))?;
        self.scenario(portfolio, template, self.config.seed)
    }

    /// Per-class shocks plus seeded Gaussian noise
    ///
    /// Noise has standard deviation `noise_scale * volatility_multiplier`.
    /// Classes the scenario does not shock only receive noise.
    pub fn scenario(
        &self,
        portfolio: &Portfolio,
        template: &ScenarioTemplate,
        seed: u64,
    ) -> RiskResult<StressTestResult> {
        let _guard = self.span.enter();
        let sigma = self.config.noise_scale * template.volatility_multiplier;
        let noise = Normal::new(0.0, sigma).map_err(|e| RiskError::Distribution(e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut impacts = BTreeMap::new();
        for (asset, exposure) in portfolio.exposures() {
            let class = portfolio.asset_classes.get(&asset).copied();
            let base = class
                .and_then(|c| template.shocks.get(&c).copied())
                .unwrap_or(Decimal::ZERO);
            let draw = noise.sample(&mut rng);
            let jitter = Decimal::try_from(draw)
                .map_err(|e| RiskError::Distribution(e.to_string()))?
                .round_dp(6);
            impacts.insert(asset, shocked(exposure, class, base + jitter));
        }

        let survival = 1.0 - template.probability.to_f64().unwrap_or(0.0);
        let result = StressTestResult::from_impacts(
            template.name.clone(),
            StressTestKind::Scenario,
            impacts,
            survival,
        );
        debug!(
            scenario = %template.name,
            seed,
            loss_pct = result.percentage_loss,
            "Scenario applied"
        );
        Ok(result)
    }

    /// Portfolio volatility before and after scaling volatilities and pushing
    /// correlations toward 1
    ///
    /// Loss is the 99% normal quantile of the stressed volatility over the
    /// configured horizon, allocated to assets by risk contribution. Survival
    /// is the share of value retained.
    pub fn volatility_shock(&self, portfolio: &Portfolio) -> RiskResult<StressTestResult> {
        let _guard = self.span.enter();
        let exposures = portfolio.exposures();
        let gross_f = portfolio.gross_exposure().to_f64().unwrap_or(0.0);

        // Signed weights over gross exposure so hedges offset
        let assets: Vec<&String> = exposures.keys().collect();
        let weights: Vec<f64> = exposures
            .values()
            .map(|e| {
                if gross_f == 0.0 {
                    0.0
                } else {
                    e.to_f64().unwrap_or(0.0) / gross_f
                }
            })
            .collect();
        let vols: Vec<f64> = assets.iter().map(|a| portfolio.volatility_of(a)).collect();

        let base_rho = self.config.base_correlation;
        let stressed_rho = base_rho + (1.0 - base_rho) * self.config.correlation_stress;
        let multiplier = self.config.volatility_multiplier;
        let stressed_vols: Vec<f64> = vols.iter().map(|v| v * multiplier).collect();

        let before = correlated_volatility(&weights, &vols, base_rho);
        let after = correlated_volatility(&weights, &stressed_vols, stressed_rho);

        let z = stats::normal_ppf(VOLATILITY_SHOCK_CONFIDENCE)?;
        let horizon = (f64::from(self.config.horizon_days) / TRADING_DAYS).sqrt();
        let loss_fraction = (z * after * horizon).min(1.0);

        let contributions = risk_shares(&weights, &stressed_vols, stressed_rho);
        let mut impacts = BTreeMap::new();
        for ((asset, exposure), share) in exposures.iter().zip(&contributions) {
            let loss = to_decimal(gross_f * loss_fraction * share)?;
            let shock = if exposure.is_zero() {
                Decimal::ZERO
            } else {
                -(loss / exposure)
            };
            impacts.insert(
                asset.clone(),
                AssetImpact {
                    asset_class: portfolio.asset_classes.get(asset).copied(),
                    original_value: *exposure,
                    stressed_value: exposure - loss,
                    shock,
                },
            );
        }

        let mut result = StressTestResult::from_impacts(
            "volatility_shock",
            StressTestKind::VolatilityShock,
            impacts,
            1.0 - loss_fraction,
        );
        result.volatility_before = Some(before);
        result.volatility_after = Some(after);
        debug!(before, after, loss_pct = result.percentage_loss, "Volatility shock applied");
        Ok(result)
    }

    /// Cost of liquidating every holding into a thinned, wider market
    ///
    /// Per asset: half-spread * widening + impact * sqrt(participation /
    /// (1 - volume_reduction)) + volume_reduction * penalty. Participation
    /// is quantity over average daily volume when one is on record.
    pub fn liquidity_stress(&self, portfolio: &Portfolio) -> RiskResult<StressTestResult> {
        let _guard = self.span.enter();
        let c = &self.config;
        let mut impacts = BTreeMap::new();
        let mut liquidation_cost = Decimal::ZERO;

        for (asset, exposure) in portfolio.exposures() {
            let participation = match (
                portfolio.holdings.get(&asset),
                portfolio.average_daily_volume.get(&asset),
            ) {
                (Some(q), Some(adv)) if *adv > Decimal::ZERO => {
                    (q.abs() / adv).to_f64().unwrap_or(c.participation_rate)
                }
                _ => c.participation_rate,
            };
            let effective = participation / (1.0 - c.volume_reduction);
            let cost_fraction = (c.bid_ask_spread / 2.0 * c.spread_widening
                + c.impact_coefficient * effective.sqrt()
                + c.volume_reduction * c.volume_penalty)
                .min(1.0);
            let fraction = to_decimal(cost_fraction)?;
            let cost = (exposure.abs() * fraction).round_dp(2);
            liquidation_cost += cost;
            impacts.insert(
                asset.clone(),
                AssetImpact {
                    asset_class: portfolio.asset_classes.get(&asset).copied(),
                    original_value: exposure,
                    stressed_value: exposure - cost,
                    shock: -fraction,
                },
            );
        }

        let gross = portfolio.gross_exposure();
        let retained = 1.0 - loss_percentage(liquidation_cost, gross) / 100.0;
        let mut result = StressTestResult::from_impacts(
            "liquidity_stress",
            StressTestKind::LiquidityStress,
            impacts,
            retained,
        );
        result.liquidation_cost = Some(liquidation_cost);
        debug!(cost = %liquidation_cost, "Liquidity stress applied");
        Ok(result)
    }

    /// Every catalog event and scenario plus the volatility and liquidity tests
    ///
    /// A test that cannot be priced is listed in `failed_tests`; the rest
    /// still run.
    pub fn comprehensive(&self, portfolio: &Portfolio) -> StressTestReport {
        let started = Instant::now();
        let mut results = Vec::new();
        let mut failed_tests = Vec::new();
        let mut record = |name: &str, outcome: RiskResult<StressTestResult>| match outcome {
            Ok(r) => results.push(r),
            Err(e) => {
                warn!(test = name, error = %e, "Stress test failed");
                failed_tests.push(FailedTest {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        for event in self.catalog.events() {
            record(&event.name, self.historical_replay(portfolio, event));
        }
        for (i, template) in self.catalog.scenarios().iter().enumerate() {
            let seed = self.config.seed.wrapping_add(i as u64);
            record(&template.name, self.scenario(portfolio, template, seed));
        }
        record("volatility_shock", self.volatility_shock(portfolio));
        record("liquidity_stress", self.liquidity_stress(portfolio));

        let _guard = self.span.enter();
        let worst = results.iter().fold(None::<&StressTestResult>, |best, r| match best {
            Some(b) if b.percentage_loss >= r.percentage_loss => Some(b),
            _ => Some(r),
        });
        let worst_case_scenario = worst.map(|r| r.scenario_name.clone());
        let worst_case_loss = worst.map(|r| r.percentage_loss).unwrap_or(0.0);

        let losses: Vec<f64> = results.iter().map(|r| r.percentage_loss).collect();
        let (expected_shortfall, stress_var) = if losses.is_empty() {
            (0.0, 0.0)
        } else {
            let cutoff = stats::percentile(&losses, 90.0);
            let tail: Vec<f64> = losses.iter().copied().filter(|l| *l >= cutoff).collect();
            (stats::mean(&tail), stats::percentile(&losses, 95.0))
        };

        let recommendation = recommendation(worst_case_loss, failed_tests.len());
        let report = StressTestReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            portfolio_value: portfolio.total_value(),
            results,
            worst_case_scenario,
            worst_case_loss,
            expected_shortfall,
            stress_var,
            failed_tests,
            recommendation,
        };

        record_latency(CalculationMetric::StressTest, started.elapsed());
        set_gauge(GaugeMetric::StressWorstLoss, worst_case_loss);
        info!(
            tests = report.results.len(),
            failed = report.failed_tests.len(),
            worst = report.worst_case_scenario.as_deref().unwrap_or("-"),
            worst_case_loss,
            stress_var,
            "Comprehensive stress test complete"
        );
        report
    }
}

fn shocked(exposure: Decimal, class: Option<super::AssetClass>, shock: Decimal) -> AssetImpact {
    let shock = shock.max(-Decimal::ONE);
    AssetImpact {
        asset_class: class,
        original_value: exposure,
        stressed_value: exposure * (Decimal::ONE + shock),
        shock,
    }
}

fn to_decimal(value: f64) -> RiskResult<Decimal> {
    Decimal::try_from(value).map_err(|e| RiskError::Distribution(format!("{}: {}", value, e)))
}

/// sqrt(w' C w) with a constant off-diagonal correlation
fn correlated_volatility(weights: &[f64], vols: &[f64], rho: f64) -> f64 {
    let mut variance = 0.0;
    for i in 0..weights.len() {
        for j in 0..weights.len() {
            let corr = if i == j { 1.0 } else { rho };
            variance += weights[i] * weights[j] * corr * vols[i] * vols[j];
        }
    }
    variance.max(0.0).sqrt()
}

/// Share of portfolio variance per asset; sums to 1
fn risk_shares(weights: &[f64], vols: &[f64], rho: f64) -> Vec<f64> {
    let n = weights.len();
    let contributions: Vec<f64> = (0..n)
        .map(|i| {
            let cross: f64 = (0..n)
                .map(|j| {
                    let corr = if i == j { 1.0 } else { rho };
                    corr * vols[i] * vols[j] * weights[j]
                })
                .sum();
            weights[i] * cross
        })
        .collect();
    let total: f64 = contributions.iter().sum();
    if total <= 0.0 {
        return vec![if n == 0 { 0.0 } else { 1.0 / n as f64 }; n];
    }
    contributions.iter().map(|c| c / total).collect()
}

fn recommendation(worst_case_loss: f64, failures: usize) -> String {
    let mut text = if worst_case_loss >= 20.0 {
        format!(
            "CRITICAL: worst-case loss {:.1}% exceeds 20%; cut gross exposure and add tail hedges",
            worst_case_loss
        )
    } else if worst_case_loss >= 10.0 {
        format!(
            "HIGH: worst-case loss {:.1}% exceeds 10%; reduce concentration in the hardest-hit asset class",
            worst_case_loss
        )
    } else if worst_case_loss >= 5.0 {
        format!(
            "MODERATE: worst-case loss {:.1}% exceeds 5%; monitor exposures and review hedges",
            worst_case_loss
        )
    } else {
        format!(
            "LOW: worst-case loss {:.1}% within tolerance",
            worst_case_loss
        )
    };
    if failures > 0 {
        text.push_str(&format!("; {} test(s) could not be priced", failures));
    }
    text
}
