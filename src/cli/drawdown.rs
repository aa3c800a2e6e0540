//! Drawdown command implementation

use super::{emit, read_json, OutputFormat};
use crate::config::Config;
use crate::drawdown::{DrawdownContext, DrawdownControlEngine, DrawdownControlResult};
use crate::series::PriceSeries;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DrawdownArgs {
    /// Price series JSON: {"asset": ..., "observations": [{"timestamp": ..., "value": ...}]}
    #[arg(long)]
    pub prices: PathBuf,

    /// Latest price, appended after the series
    #[arg(long)]
    pub live_price: Option<f64>,

    /// Annualized volatility; estimated from the series when absent
    #[arg(long)]
    pub volatility: Option<f64>,

    /// Portfolio-level drawdown, e.g. -0.04
    #[arg(long, allow_hyphen_values = true)]
    pub portfolio_drawdown: Option<f64>,
}

impl DrawdownArgs {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
        let engine = DrawdownControlEngine::new(config.drawdown.clone())?;
        let series: PriceSeries = read_json(&self.prices)?;
        let context = DrawdownContext {
            live_price: self.live_price,
            volatility: self.volatility,
            portfolio_drawdown: self.portfolio_drawdown,
        };

        let result = engine.monitor_drawdown(&series, context)?;
        emit(&result, format, DrawdownControlResult::format_table)
    }
}
