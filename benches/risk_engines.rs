//! Benchmarks for Monte Carlo VaR and the risk parity solver

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use quant_risk::parity::{ParityConfig, RiskParityEngine};
use quant_risk::series::{ReturnMatrix, ReturnSeries};
use quant_risk::var::{VarCalculator, VarConfig, VarMethod};

fn wavy(n: usize, scale: f64, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64 + phase;
            scale * ((x * 1.3).sin() + 0.5 * (x * 0.7).cos())
        })
        .collect()
}

fn series(asset: &str, values: &[f64]) -> ReturnSeries {
    let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
    ReturnSeries::from_values(asset, start, values).unwrap()
}

fn benchmark_monte_carlo_var(c: &mut Criterion) {
    let calculator = VarCalculator::new(VarConfig {
        method: VarMethod::MonteCarlo,
        monte_carlo_simulations: 10_000,
        ..VarConfig::default()
    })
    .unwrap();
    let returns = series("SPY", &wavy(500, 0.01, 0.0));

    c.bench_function("monte_carlo_var_10k", |b| {
        b.iter(|| calculator.monte_carlo(black_box(&returns)))
    });
}

fn benchmark_parity_solver(c: &mut Criterion) {
    let engine = RiskParityEngine::new(ParityConfig::default()).unwrap();
    let data: Vec<ReturnSeries> = (0..8)
        .map(|k| series(&format!("A{}", k), &wavy(252, 0.005 * (k + 1) as f64, k as f64 * 0.9)))
        .collect();
    let matrix = ReturnMatrix::from_series(&data).unwrap();

    c.bench_function("erc_8_assets", |b| {
        b.iter(|| engine.optimize_matrix(black_box(&matrix)))
    });
}

criterion_group!(benches, benchmark_monte_carlo_var, benchmark_parity_solver);
criterion_main!(benches);
