//! Calculation metrics
//!
//! Emitted through the `metrics` facade; the host process installs whichever
//! recorder/exporter it wants.

use std::time::Duration;

/// Latency histograms, one per engine operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationMetric {
    /// Single-asset VaR/CVaR
    VarEstimate,
    /// Monte Carlo simulation
    MonteCarlo,
    /// Portfolio VaR with attribution
    PortfolioVar,
    PositionSizing,
    ParityOptimization,
    StressTest,
    DrawdownMonitor,
    SignalValidation,
}

impl CalculationMetric {
    pub fn name(&self) -> &'static str {
        match self {
            CalculationMetric::VarEstimate => "quant_risk_var_estimate_latency_ms",
            CalculationMetric::MonteCarlo => "quant_risk_monte_carlo_latency_ms",
            CalculationMetric::PortfolioVar => "quant_risk_portfolio_var_latency_ms",
            CalculationMetric::PositionSizing => "quant_risk_position_sizing_latency_ms",
            CalculationMetric::ParityOptimization => "quant_risk_parity_optimization_latency_ms",
            CalculationMetric::StressTest => "quant_risk_stress_test_latency_ms",
            CalculationMetric::DrawdownMonitor => "quant_risk_drawdown_monitor_latency_ms",
            CalculationMetric::SignalValidation => "quant_risk_signal_validation_latency_ms",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeMetric {
    /// Annualized volatility of the latest optimized portfolio
    PortfolioVolatility,
    /// Worst percentage loss of the latest comprehensive stress test
    StressWorstLoss,
    /// Current drawdown of the latest monitored series
    DrawdownPct,
    /// Position limit after drawdown scaling
    PositionLimit,
}

impl GaugeMetric {
    pub fn name(&self) -> &'static str {
        match self {
            GaugeMetric::PortfolioVolatility => "quant_risk_portfolio_volatility",
            GaugeMetric::StressWorstLoss => "quant_risk_stress_worst_loss_pct",
            GaugeMetric::DrawdownPct => "quant_risk_drawdown_pct",
            GaugeMetric::PositionLimit => "quant_risk_position_limit",
        }
    }
}

/// Record a latency measurement
pub fn record_latency(metric: CalculationMetric, duration: Duration) {
    let millis = duration.as_secs_f64() * 1000.0;
    ::metrics::histogram!(metric.name()).record(millis);
    tracing::trace!(metric = metric.name(), value_ms = millis, "Recorded latency");
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_unique() {
        let names = [
            CalculationMetric::VarEstimate,
            CalculationMetric::MonteCarlo,
            CalculationMetric::PortfolioVar,
            CalculationMetric::PositionSizing,
            CalculationMetric::ParityOptimization,
            CalculationMetric::StressTest,
            CalculationMetric::DrawdownMonitor,
            CalculationMetric::SignalValidation,
        ]
        .map(|m| m.name());
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_latency(CalculationMetric::VarEstimate, Duration::from_millis(3));
        set_gauge(GaugeMetric::DrawdownPct, -0.05);
    }
}
