//! VaR estimation end to end

use crate::{returns, wavy_returns};
use quant_risk::series::ReturnMatrix;
use quant_risk::var::{VarCalculator, VarConfig, VarMethod};
use quant_risk::RiskError;
use std::collections::BTreeMap;

fn calculator(method: VarMethod) -> VarCalculator {
    VarCalculator::new(VarConfig {
        method,
        monte_carlo_simulations: 20_000,
        ..VarConfig::default()
    })
    .unwrap()
}

#[test]
fn test_flat_series_parametric_is_degenerate() {
    let series = returns("FLAT", &[0.0; 40]);
    let result = calculator(VarMethod::Parametric).calculate(&series).unwrap();

    assert!(result.degenerate);
    for estimate in &result.estimates {
        assert_eq!(estimate.var, 0.0);
        assert_eq!(estimate.cvar, 0.0);
    }
}

#[test]
fn test_var_ordering_across_methods() {
    let series = returns("SPY", &wavy_returns(250, 0.01, 0.0));
    for method in [VarMethod::Historical, VarMethod::Parametric] {
        let result = calculator(method).calculate(&series).unwrap();
        assert_eq!(result.estimates.len(), 3);
        // ascending confidence, so VaR is non-increasing
        for pair in result.estimates.windows(2) {
            assert!(pair[1].var <= pair[0].var + 1e-12, "{:?}", method);
        }
        for estimate in &result.estimates {
            assert!(estimate.cvar <= estimate.var + 1e-12, "{:?}", method);
        }
    }
}

#[tokio::test]
async fn test_monte_carlo_offload_matches_sync() {
    let series = returns("SPY", &wavy_returns(120, 0.01, 1.0));
    let calc = calculator(VarMethod::MonteCarlo);

    let sync = calc.monte_carlo(&series).unwrap();
    let offloaded = calc.spawn_monte_carlo(series).await.unwrap();
    assert_eq!(sync.estimates, offloaded.estimates);
}

#[test]
fn test_portfolio_components_sum_to_var() {
    let a = returns("A", &wavy_returns(200, 0.01, 0.0));
    let b = returns("B", &wavy_returns(200, 0.015, 2.5));
    let matrix = ReturnMatrix::from_series(&[a, b]).unwrap();
    let weights = BTreeMap::from([("A".to_string(), 0.6), ("B".to_string(), 0.4)]);

    let result = calculator(VarMethod::Historical).portfolio(&matrix, &weights).unwrap();
    for level in &result.levels {
        let total: f64 = level.component_var.values().sum();
        assert!((total - level.var).abs() < 1e-9 * level.var.abs().max(1.0));
    }
    assert!(result.diversification_ratio >= 1.0);
}

#[test]
fn test_rolling_backtest() {
    let series = returns("SPY", &wavy_returns(300, 0.01, 0.3));
    let result = calculator(VarMethod::Historical)
        .rolling_backtest(&series, 100, 0.95)
        .unwrap();

    assert_eq!(result.observations, 200);
    assert!(result.p_value >= 0.0 && result.p_value <= 1.0);
}

#[test]
fn test_short_series_rejected() {
    let series = returns("SPY", &wavy_returns(10, 0.01, 0.0));
    assert!(matches!(
        calculator(VarMethod::Historical).calculate(&series),
        Err(RiskError::InsufficientData { required: 30, actual: 10 })
    ));
}
