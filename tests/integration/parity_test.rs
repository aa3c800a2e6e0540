//! Risk parity end to end

use crate::returns;
use quant_risk::parity::{ParityConfig, ParityMethod, RiskParityEngine, TradeDirection};
use quant_risk::series::{ReturnMatrix, ReturnSeries};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

fn pattern(p: [f64; 4], scale: f64) -> Vec<f64> {
    (0..60).map(|i| p[i % 4] * scale).collect()
}

fn uncorrelated_pair() -> Vec<ReturnSeries> {
    vec![
        returns("A", &pattern([1.0, -1.0, 1.0, -1.0], 0.01)),
        returns("B", &pattern([1.0, 1.0, -1.0, -1.0], 0.01)),
    ]
}

fn engine(method: ParityMethod) -> RiskParityEngine {
    RiskParityEngine::new(ParityConfig {
        method,
        ..ParityConfig::default()
    })
    .unwrap()
}

#[test]
fn test_identical_vol_pair_splits_evenly() {
    for method in [ParityMethod::EqualRiskContribution, ParityMethod::InverseVolatility] {
        let result = engine(method).optimize(&uncorrelated_pair()).unwrap();
        assert!((result.weights["A"] - 0.5).abs() < 1e-6, "{}", method);
        assert!((result.weights["B"] - 0.5).abs() < 1e-6, "{}", method);
        let total: f64 = result.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(!result.fallback_used);
    }
}

#[test]
fn test_bounded_weights() {
    let data = vec![
        returns("A", &pattern([1.0, -1.0, 1.0, -1.0], 0.01)),
        returns("B", &pattern([1.0, 1.0, -1.0, -1.0], 0.03)),
        returns("C", &pattern([1.0, -1.0, -1.0, 1.0], 0.02)),
    ];
    let engine = RiskParityEngine::new(ParityConfig {
        min_weight: 0.2,
        max_weight: 0.5,
        ..ParityConfig::default()
    })
    .unwrap();

    let result = engine.optimize(&data).unwrap();
    let total: f64 = result.weights.values().sum();
    assert!((total - 1.0).abs() < 1e-6);
    for weight in result.weights.values() {
        assert!(*weight >= 0.2 - 1e-6 && *weight <= 0.5 + 1e-6);
    }
}

#[tokio::test]
async fn test_offloaded_optimization() {
    let result = engine(ParityMethod::EqualRiskContribution)
        .spawn_optimize(uncorrelated_pair())
        .await
        .unwrap();
    assert!((result.weights["A"] - 0.5).abs() < 1e-6);
}

#[test]
fn test_rebalance_from_drifted_book() {
    let engine = engine(ParityMethod::EqualRiskContribution);
    let data = uncorrelated_pair();
    let target = engine.optimize(&data).unwrap().weights;
    let current = BTreeMap::from([("A".to_string(), 0.7), ("B".to_string(), 0.3)]);

    let actions = engine
        .rebalancing_actions(&current, &target, dec!(100000))
        .unwrap();
    assert_eq!(actions.len(), 2);
    let sell = actions.iter().find(|a| a.asset == "A").unwrap();
    assert_eq!(sell.direction, TradeDirection::Sell);
    assert_eq!(sell.trade_value, dec!(20000));

    let matrix = ReturnMatrix::from_series(&data).unwrap();
    let drift = engine.monitor_drift(&matrix, &current, &target).unwrap();
    assert!(drift.rebalance_required);
    assert!(drift.current_volatility > drift.target_volatility);
}
