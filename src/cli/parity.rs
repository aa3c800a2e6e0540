//! Parity command implementation

use super::{emit, read_json, OutputFormat};
use crate::config::Config;
use crate::parity::{DriftReport, ParityMethod, RebalanceAction, RiskParityEngine, RiskParityResult};
use crate::series::{ReturnMatrix, ReturnSeries};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ParityArgs {
    /// JSON array of return series, inner-joined on timestamp
    #[arg(long)]
    pub returns: PathBuf,

    /// Weighting scheme (overrides config)
    #[arg(long)]
    pub method: Option<ParityMethod>,

    /// Per-asset weight floor (overrides config)
    #[arg(long)]
    pub min_weight: Option<f64>,

    /// Per-asset weight cap (overrides config)
    #[arg(long)]
    pub max_weight: Option<f64>,

    /// JSON object of risk budgets for the risk_budget method
    #[arg(long)]
    pub budgets: Option<PathBuf>,

    /// JSON object of current weights; adds drift and rebalancing trades
    #[arg(long)]
    pub current: Option<PathBuf>,

    /// Portfolio value used to size rebalancing trades
    #[arg(long, default_value = "1000000")]
    pub portfolio_value: Decimal,
}

/// Optimization plus rebalancing against current holdings
#[derive(Debug, Serialize)]
struct ParityReport {
    optimization: RiskParityResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    drift: Option<DriftReport>,
    actions: Vec<RebalanceAction>,
}

impl ParityReport {
    fn format_table(&self) -> String {
        let mut out = self.optimization.format_table();
        if let Some(drift) = &self.drift {
            out.push_str(&format!(
                "\nVolatility drift: {:+.2}% ({:.2}% current vs {:.2}% target)\n",
                drift.relative_volatility_drift * 100.0,
                drift.current_volatility * 100.0,
                drift.target_volatility * 100.0
            ));
            out.push_str(&format!(
                "Max weight drift: {:.2}% ({})\n",
                drift.max_weight_drift * 100.0,
                drift.max_drift_asset.as_deref().unwrap_or("-")
            ));
            out.push_str(&format!("Rebalance:        {}\n", drift.rebalance_required));
        }
        for action in &self.actions {
            out.push_str(&format!(
                "  {:?} {:<12} {:>14.2}  ({:.2}% -> {:.2}%)\n",
                action.direction,
                action.asset,
                action.trade_value,
                action.current_weight * 100.0,
                action.target_weight * 100.0
            ));
        }
        out
    }
}

impl ParityArgs {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
        let mut parity_config = config.parity.clone();
        if let Some(method) = self.method {
            parity_config.method = method;
        }
        if let Some(min_weight) = self.min_weight {
            parity_config.min_weight = min_weight;
        }
        if let Some(max_weight) = self.max_weight {
            parity_config.max_weight = max_weight;
        }
        if let Some(path) = &self.budgets {
            parity_config.risk_budgets = Some(read_json(path)?);
        }

        let engine = RiskParityEngine::new(parity_config)?;
        let series: Vec<ReturnSeries> = read_json(&self.returns)?;
        let matrix = ReturnMatrix::from_series(&series)?;
        tracing::info!(
            assets = matrix.asset_count(),
            method = %engine.config().method,
            "Optimizing risk parity weights"
        );

        let optimization = engine.spawn_optimize(series).await?;
        let (drift, actions) = match &self.current {
            Some(path) => {
                let current: BTreeMap<String, f64> = read_json(path)?;
                let drift = engine.monitor_drift(&matrix, &current, &optimization.weights)?;
                let actions =
                    engine.rebalancing_actions(&current, &optimization.weights, self.portfolio_value)?;
                (Some(drift), actions)
            }
            None => (None, Vec::new()),
        };

        let report = ParityReport {
            optimization,
            drift,
            actions,
        };
        emit(&report, format, ParityReport::format_table)
    }
}
