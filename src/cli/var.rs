//! VaR command implementations

use super::{emit, read_json, OutputFormat};
use crate::config::Config;
use crate::series::{ReturnMatrix, ReturnSeries};
use crate::var::{KupiecTestResult, PortfolioRiskResult, RiskEstimateResult, VarCalculator, VarMethod};
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct VarArgs {
    /// Return series JSON: {"asset": ..., "observations": [{"timestamp": ..., "value": ...}]}
    #[arg(long)]
    pub input: PathBuf,

    /// Estimation method (overrides config)
    #[arg(long)]
    pub method: Option<VarMethod>,

    /// Comma-separated confidence levels (overrides config)
    #[arg(long, value_delimiter = ',')]
    pub confidence: Vec<f64>,

    /// Monte Carlo draws (overrides config)
    #[arg(long)]
    pub simulations: Option<usize>,

    /// Random seed (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,
}

impl VarArgs {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
        let mut var_config = config.var.clone();
        if let Some(method) = self.method {
            var_config.method = method;
        }
        if !self.confidence.is_empty() {
            var_config.confidence_levels = self.confidence.clone();
        }
        if let Some(simulations) = self.simulations {
            var_config.monte_carlo_simulations = simulations;
        }
        if let Some(seed) = self.seed {
            var_config.seed = seed;
        }

        let method = var_config.method;
        let calculator = VarCalculator::new(var_config)?;
        let series: ReturnSeries = read_json(&self.input)?;
        tracing::info!(asset = series.asset(), method = %method, "Estimating VaR");

        let result = if method == VarMethod::MonteCarlo {
            calculator.spawn_monte_carlo(series).await?
        } else {
            calculator.calculate(&series)?
        };
        emit(&result, format, RiskEstimateResult::format_table)
    }
}

#[derive(Args, Debug)]
pub struct PortfolioVarArgs {
    /// JSON array of return series, inner-joined on timestamp
    #[arg(long)]
    pub returns: PathBuf,

    /// JSON object of asset weights summing to 1
    #[arg(long)]
    pub weights: PathBuf,
}

impl PortfolioVarArgs {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
        let calculator = VarCalculator::new(config.var.clone())?;
        let series: Vec<ReturnSeries> = read_json(&self.returns)?;
        let weights: BTreeMap<String, f64> = read_json(&self.weights)?;
        let matrix = ReturnMatrix::from_series(&series)?;
        tracing::info!(
            assets = matrix.asset_count(),
            observations = matrix.observations(),
            "Estimating portfolio VaR"
        );

        let result = calculator.portfolio(&matrix, &weights)?;
        emit(&result, format, PortfolioRiskResult::format_table)
    }
}

#[derive(Args, Debug)]
pub struct BacktestVarArgs {
    /// Return series JSON
    #[arg(long)]
    pub input: PathBuf,

    /// Estimation window in observations
    #[arg(long, default_value = "250")]
    pub window: usize,

    /// Confidence level tested
    #[arg(long, default_value = "0.99")]
    pub confidence: f64,
}

impl BacktestVarArgs {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
        let calculator = VarCalculator::new(config.var.clone())?;
        let series: ReturnSeries = read_json(&self.input)?;
        tracing::info!(
            asset = series.asset(),
            window = self.window,
            confidence = self.confidence,
            "Backtesting VaR"
        );

        let result = calculator.rolling_backtest(&series, self.window, self.confidence)?;
        emit(&result, format, KupiecTestResult::format_table)
    }
}
