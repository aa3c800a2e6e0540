//! Drawdown control engine

use super::recovery::recovery_plan;
use super::types::{DrawdownControlResult, DrawdownMetrics, DrawdownWarning, SeverityAssessment, StopLoss};
use super::{DrawdownConfig, DrawdownLevel};
use crate::error::{RiskError, RiskResult};
use crate::series::PriceSeries;
use crate::telemetry::{record_latency, set_gauge, CalculationMetric, GaugeMetric};
use std::time::Instant;
use tracing::{debug, info, warn, Span};

/// Optional live inputs to a monitoring pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DrawdownContext {
    /// Latest price, appended after the series
    pub live_price: Option<f64>,
    /// Annualized volatility; estimated from the series when absent
    pub volatility: Option<f64>,
    /// Portfolio-level drawdown for the diversification credit
    pub portfolio_drawdown: Option<f64>,
}

/// Drawdown monitor for long positions
///
/// Stateless between calls: the same series always yields the same result.
#[derive(Debug, Clone)]
pub struct DrawdownControlEngine {
    config: DrawdownConfig,
    span: Span,
}

impl DrawdownControlEngine {
    pub fn new(config: DrawdownConfig) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            span: tracing::info_span!("drawdown_control"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &DrawdownConfig {
        &self.config
    }

    /// Running-peak drawdown of the series, optionally extended by a live price
    pub fn calculate_drawdown(
        &self,
        series: &PriceSeries,
        live_price: Option<f64>,
    ) -> RiskResult<DrawdownMetrics> {
        let mut prices = series.prices().to_vec();
        if let Some(p) = live_price {
            if !(p.is_finite() && p > 0.0) {
                return Err(RiskError::InvalidSeries(format!(
                    "live price {} must be positive",
                    p
                )));
            }
            prices.push(p);
        }
        if prices.is_empty() {
            return Err(RiskError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut peak = prices[0];
        let mut peak_index = 0;
        let mut max_drawdown = 0.0_f64;
        let mut trough_price = prices[0];
        for (i, &price) in prices.iter().enumerate() {
            if price > peak {
                peak = price;
                peak_index = i;
            }
            let drawdown = (price - peak) / peak;
            if drawdown < max_drawdown {
                max_drawdown = drawdown;
                trough_price = price;
            }
        }

        let current_price = prices[prices.len() - 1];
        let current_drawdown = (current_price - peak) / peak;
        Ok(DrawdownMetrics {
            current_drawdown,
            max_drawdown: max_drawdown.min(current_drawdown),
            peak_price: peak,
            peak_time: series.timestamps().get(peak_index).copied(),
            trough_price,
            current_price,
            days_since_peak: prices.len() - 1 - peak_index,
            observations: prices.len(),
        })
    }

    /// Higher of a volatility-scaled initial stop and a trailing stop
    ///
    /// The effective stop never reaches the current price; a stop that
    /// would is capped one buffer below it and flagged as breached.
    pub fn dynamic_stop(&self, metrics: &DrawdownMetrics, volatility: f64) -> StopLoss {
        let c = &self.config;
        let price = metrics.current_price;
        let volatility_scale = if volatility.is_finite() && volatility > 0.0 {
            (volatility / c.baseline_volatility).clamp(1.0, 3.0)
        } else {
            1.0
        };
        let initial_stop = price * (1.0 - c.base_stop * volatility_scale);
        let trailing_stop = metrics.peak_price * (1.0 - c.trailing_distance);
        let raw = initial_stop.max(trailing_stop);
        let ceiling = price * (1.0 - c.stop_buffer);

        StopLoss {
            initial_stop,
            trailing_stop,
            effective_stop: raw.min(ceiling),
            volatility_scale,
            breached: raw >= price,
        }
    }

    /// Grade the current drawdown
    ///
    /// A graded (non-normal) tier escalates once more when the current
    /// drawdown is within the escalation ratio of the historical maximum.
    /// It then drops back one tier when the portfolio is down less than
    /// the position.
    pub fn assess_severity(
        &self,
        metrics: &DrawdownMetrics,
        portfolio_drawdown: Option<f64>,
    ) -> SeverityAssessment {
        let base_level = DrawdownLevel::classify(metrics.current_drawdown);
        let escalated = base_level > DrawdownLevel::Normal
            && metrics.current_drawdown <= self.config.escalation_ratio * metrics.max_drawdown;
        let mut level = if escalated {
            base_level.escalate()
        } else {
            base_level
        };

        let diversification_credit = matches!(
            portfolio_drawdown,
            Some(p) if p > metrics.current_drawdown && level > DrawdownLevel::Normal
        );
        if diversification_credit {
            level = level.de_escalate();
        }

        let threshold = level.threshold();
        SeverityAssessment {
            level,
            base_level,
            escalated,
            diversification_credit,
            reduction: threshold.reduction,
            cooldown_days: threshold.cooldown_days,
        }
    }

    /// Base limit cut by the tier reduction and a graduated drawdown cut
    pub fn position_limit(&self, level: DrawdownLevel, current_drawdown: f64) -> f64 {
        let c = &self.config;
        let graduated = if current_drawdown <= -0.15 {
            0.5
        } else if current_drawdown <= -0.10 {
            0.7
        } else if current_drawdown <= -0.05 {
            0.85
        } else {
            1.0
        };
        (c.base_position_limit * (1.0 - level.threshold().reduction) * graduated)
            .clamp(c.min_position_limit, c.max_position_limit)
    }

    /// Full monitoring pass for one asset
    pub fn monitor_drawdown(
        &self,
        series: &PriceSeries,
        context: DrawdownContext,
    ) -> RiskResult<DrawdownControlResult> {
        let _guard = self.span.enter();
        let started = Instant::now();

        let metrics = self.calculate_drawdown(series, context.live_price)?;
        let volatility = context
            .volatility
            .or_else(|| series.annualized_volatility())
            .unwrap_or(self.config.baseline_volatility);
        let stop_loss = self.dynamic_stop(&metrics, volatility);
        let severity = self.assess_severity(&metrics, context.portfolio_drawdown);
        let position_limit = self.position_limit(severity.level, metrics.current_drawdown);
        let recovery_plan = recovery_plan(&self.config, severity.level, &metrics, position_limit);

        let timestamp = series.timestamps().last().copied();
        let mut warnings = Vec::new();
        if severity.level > DrawdownLevel::Normal {
            warnings.push(DrawdownWarning {
                level: severity.level,
                message: format!(
                    "drawdown {:.2}% graded {}; position limit {:.2}%",
                    metrics.current_drawdown * 100.0,
                    severity.level,
                    position_limit * 100.0
                ),
                timestamp,
            });
        }
        if severity.escalated {
            warnings.push(DrawdownWarning {
                level: severity.level,
                message: format!(
                    "drawdown within {:.0}% of historical max {:.2}%",
                    self.config.escalation_ratio * 100.0,
                    metrics.max_drawdown * 100.0
                ),
                timestamp,
            });
        }
        if stop_loss.breached {
            warnings.push(DrawdownWarning {
                level: severity.level,
                message: format!(
                    "price {:.4} at or below trailing stop {:.4}",
                    metrics.current_price, stop_loss.trailing_stop
                ),
                timestamp,
            });
        }
        if metrics.days_since_peak > self.config.max_days_underwater && metrics.current_drawdown < 0.0 {
            warnings.push(DrawdownWarning {
                level: severity.level,
                message: format!("{} bars below peak", metrics.days_since_peak),
                timestamp,
            });
        }

        let action_required = severity.level >= DrawdownLevel::Moderate || stop_loss.breached;
        if action_required {
            warn!(
                asset = series.asset(),
                level = %severity.level,
                drawdown = metrics.current_drawdown,
                breached = stop_loss.breached,
                "Drawdown action required"
            );
        } else {
            debug!(
                asset = series.asset(),
                level = %severity.level,
                drawdown = metrics.current_drawdown,
                "Drawdown within tolerance"
            );
        }

        record_latency(CalculationMetric::DrawdownMonitor, started.elapsed());
        set_gauge(GaugeMetric::DrawdownPct, metrics.current_drawdown);
        set_gauge(GaugeMetric::PositionLimit, position_limit);
        if recovery_plan.is_some() {
            info!(asset = series.asset(), level = %severity.level, "Recovery plan issued");
        }

        Ok(DrawdownControlResult {
            asset: series.asset().to_string(),
            cooldown_days: severity.cooldown_days,
            metrics,
            stop_loss,
            severity,
            position_limit,
            warnings,
            recovery_plan,
            action_required,
        })
    }
}
