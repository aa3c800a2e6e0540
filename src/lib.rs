//! quant-risk: risk analytics for trading portfolios
//!
//! This library provides the core components for:
//! - Value-at-Risk and CVaR (historical, parametric, Cornish-Fisher, Monte Carlo)
//! - Portfolio VaR attribution and Kupiec backtesting
//! - Position sizing (Kelly, mean-variance, volatility and drawdown targeting)
//! - Risk parity optimization and rebalancing
//! - Historical, scenario, volatility and liquidity stress tests
//! - Drawdown control with dynamic stops and recovery plans
//! - Statistical validation of strategy returns
//! - Structured logging and calculation metrics

pub mod cli;
pub mod config;
pub mod drawdown;
pub mod error;
pub mod optimize;
pub mod parity;
pub mod series;
pub mod sizing;
pub mod stats;
pub mod stress;
pub mod telemetry;
pub mod validation;
pub mod var;

pub use error::{RiskError, RiskResult};
