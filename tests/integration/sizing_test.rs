//! Position sizing end to end

use quant_risk::sizing::{PositionSizingEngine, SizingConfig, SizingMethod};
use rust_decimal_macros::dec;

fn engine() -> PositionSizingEngine {
    PositionSizingEngine::new(SizingConfig::default()).unwrap()
}

#[test]
fn test_kelly_zero_without_edge() {
    let engine = engine();
    // expected return equal to the 2% risk-free rate
    let request = engine.request(SizingMethod::Kelly, 0.02, 0.20, dec!(100000));
    let result = engine.size(&request).unwrap();

    assert_eq!(result.recommended_weight, 0.0);
    assert_eq!(result.recommended_value, dec!(0));
    assert!(!result.adjusted_reason.is_empty());
}

#[test]
fn test_kelly_clipped_to_cap() {
    let engine = engine();
    // 0.25 * 0.08 / 0.04 = 0.5 before the 10% cap
    let request = engine
        .request(SizingMethod::Kelly, 0.10, 0.20, dec!(100000))
        .with_price(dec!(50));
    let result = engine.size(&request).unwrap();

    assert!((result.raw_weight - 0.5).abs() < 1e-12);
    assert_eq!(result.recommended_weight, 0.10);
    assert_eq!(result.recommended_value, dec!(10000));
    assert_eq!(result.shares, Some(dec!(200)));
}

#[test]
fn test_every_method_within_bounds() {
    let engine = engine();
    for method in [
        SizingMethod::Kelly,
        SizingMethod::MeanVariance,
        SizingMethod::VolatilityAdjusted,
        SizingMethod::MaxDrawdownConstrained,
        SizingMethod::EqualWeight,
        SizingMethod::RiskParityApprox,
    ] {
        let request = engine
            .request(method, 0.12, 0.25, dec!(50000))
            .with_universe(vec![0.25, 0.15, 0.30]);
        let result = engine.size(&request).unwrap();
        assert!(result.recommended_weight >= 0.0, "{}", method);
        assert!(result.recommended_weight <= result.max_position, "{}", method);
    }
}
