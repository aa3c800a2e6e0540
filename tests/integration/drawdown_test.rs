//! Drawdown control end to end

use crate::prices;
use quant_risk::drawdown::{DrawdownConfig, DrawdownContext, DrawdownControlEngine, DrawdownLevel};

fn engine() -> DrawdownControlEngine {
    DrawdownControlEngine::new(DrawdownConfig::default()).unwrap()
}

#[test]
fn test_monitoring_is_idempotent() {
    let series = prices("SPY", &[100.0, 104.0, 110.0, 101.0, 97.0, 99.0]);
    let engine = engine();

    let first = engine.monitor_drawdown(&series, DrawdownContext::default()).unwrap();
    let second = engine.monitor_drawdown(&series, DrawdownContext::default()).unwrap();
    assert_eq!(first, second);
    assert!(first.metrics.max_drawdown <= first.metrics.current_drawdown);
}

#[test]
fn test_stop_always_below_price() {
    let engine = engine();
    for path in [
        vec![100.0, 101.0, 102.0, 103.0],
        vec![100.0, 80.0, 60.0, 55.0],
        vec![100.0, 120.0, 90.0, 118.0],
    ] {
        let series = prices("X", &path);
        let context = DrawdownContext {
            volatility: Some(0.9),
            ..DrawdownContext::default()
        };
        let result = engine.monitor_drawdown(&series, context).unwrap();
        assert!(result.stop_loss.effective_stop < result.metrics.current_price);
    }
}

#[test]
fn test_deep_drawdown_triggers_action() {
    let series = prices("X", &[100.0, 95.0, 85.0, 78.0, 70.0]);
    let result = engine().monitor_drawdown(&series, DrawdownContext::default()).unwrap();

    assert_eq!(result.severity.level, DrawdownLevel::Critical);
    assert!(result.action_required);
    assert_eq!(result.recovery_plan.as_ref().map(|p| p.stages.len()), Some(5));
    assert_eq!(result.position_limit, 0.01);
}
