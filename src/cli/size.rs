//! Size command implementation

use super::{emit, OutputFormat};
use crate::config::Config;
use crate::sizing::{PositionSizingEngine, PositionSizingResult, SizingMethod};
use clap::Args;
use rust_decimal::Decimal;

#[derive(Args, Debug)]
pub struct SizeArgs {
    /// Sizing method
    #[arg(long, default_value = "kelly")]
    pub method: SizingMethod,

    /// Annualized expected return
    #[arg(long, allow_hyphen_values = true)]
    pub expected_return: f64,

    /// Annualized volatility
    #[arg(long)]
    pub volatility: f64,

    /// Portfolio value
    #[arg(long)]
    pub portfolio_value: Decimal,

    /// Position cap as a fraction of the portfolio (overrides config)
    #[arg(long)]
    pub max_position: Option<f64>,

    /// Annual risk-free rate (overrides config)
    #[arg(long, allow_hyphen_values = true)]
    pub risk_free_rate: Option<f64>,

    /// Current price, for a share count
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Comma-separated volatilities of the whole universe
    #[arg(long, value_delimiter = ',')]
    pub universe: Vec<f64>,
}

impl SizeArgs {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
        let engine = PositionSizingEngine::new(config.sizing.clone())?;
        let mut request = engine.request(
            self.method,
            self.expected_return,
            self.volatility,
            self.portfolio_value,
        );
        if let Some(max_position) = self.max_position {
            request = request.with_max_position(max_position);
        }
        if let Some(rate) = self.risk_free_rate {
            request = request.with_risk_free_rate(rate);
        }
        if let Some(price) = self.price {
            request = request.with_price(price);
        }
        if !self.universe.is_empty() {
            request = request.with_universe(self.universe.clone());
        }

        let result = engine.size(&request)?;
        emit(&result, format, PositionSizingResult::format_table)
    }
}
