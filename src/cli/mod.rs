//! CLI interface for quant-risk
//!
//! Provides subcommands for:
//! - `var`: Single-asset VaR/CVaR
//! - `portfolio-var`: Portfolio VaR with component attribution
//! - `backtest-var`: Rolling Kupiec backtest
//! - `size`: Position sizing
//! - `parity`: Risk parity weights and rebalancing
//! - `stress`: Historical, scenario, volatility and liquidity stress tests
//! - `drawdown`: Drawdown monitoring and stops
//! - `validate`: Signal significance
//! - `config`: Show the effective configuration

mod drawdown;
mod parity;
mod size;
mod stress;
mod validate;
mod var;

pub use drawdown::DrawdownArgs;
pub use parity::ParityArgs;
pub use size::SizeArgs;
pub use stress::StressArgs;
pub use validate::ValidateArgs;
pub use var::{BacktestVarArgs, PortfolioVarArgs, VarArgs};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "quant-risk")]
#[command(about = "Risk analytics: VaR, position sizing, risk parity, stress testing and drawdown control")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Value-at-Risk for one return series
    Var(VarArgs),
    /// Portfolio VaR with marginal and component attribution
    PortfolioVar(PortfolioVarArgs),
    /// Rolling Kupiec backtest of historical VaR
    BacktestVar(BacktestVarArgs),
    /// Recommend a position size
    Size(SizeArgs),
    /// Risk parity optimization and rebalancing
    Parity(ParityArgs),
    /// Stress test a portfolio
    Stress(StressArgs),
    /// Drawdown monitoring for a price series
    Drawdown(DrawdownArgs),
    /// Statistical significance of strategy returns
    Validate(ValidateArgs),
    /// Show the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Deserialize a JSON input file
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Print a result in the requested format
pub(crate) fn emit<T: Serialize>(
    value: &T,
    format: OutputFormat,
    table: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => print!("{}", table(value)),
    }
    Ok(())
}
