//! Integration tests across the risk engines

mod cli_test;
mod drawdown_test;
mod parity_test;
mod sizing_test;
mod stress_test;
mod var_test;

use chrono::{DateTime, TimeZone, Utc};
use quant_risk::series::{PriceSeries, ReturnSeries};

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
}

pub fn returns(asset: &str, values: &[f64]) -> ReturnSeries {
    ReturnSeries::from_values(asset, start(), values).unwrap()
}

pub fn prices(asset: &str, values: &[f64]) -> PriceSeries {
    PriceSeries::from_prices(asset, start(), values).unwrap()
}

/// Deterministic, non-degenerate daily returns
pub fn wavy_returns(n: usize, scale: f64, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64 + phase;
            scale * ((x * 1.3).sin() + 0.5 * (x * 0.7).cos())
        })
        .collect()
}
