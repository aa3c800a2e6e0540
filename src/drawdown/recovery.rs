//! Staged recovery plans

use super::types::{DrawdownMetrics, RecoveryMilestone, RecoveryStage, RiskRecoveryPlan};
use super::{DrawdownConfig, DrawdownLevel};

/// Recovered shares of the drawdown reported as milestones
const MILESTONES: [f64; 4] = [0.30, 0.60, 0.90, 1.00];

/// Plan for severe and critical drawdowns; None below severe
///
/// Severe rebuilds in 3 stages, critical in 5. Each stage unlocks after an
/// even share of the drawdown is recovered and lifts the position limit
/// linearly from `current_limit` back to the base limit.
pub(super) fn recovery_plan(
    config: &DrawdownConfig,
    level: DrawdownLevel,
    metrics: &DrawdownMetrics,
    current_limit: f64,
) -> Option<RiskRecoveryPlan> {
    let stage_count = match level {
        DrawdownLevel::Severe => 3,
        DrawdownLevel::Critical => 5,
        _ => return None,
    };

    let depth = metrics.current_drawdown.abs().max(metrics.max_drawdown.abs());
    // tolerance keeps exact ratios like 0.2 / 0.001 from rounding up a day
    let estimated_recovery_days =
        (depth / config.daily_recovery_rate - 1e-9).ceil().max(1.0) as u32;
    let review_interval_days = (estimated_recovery_days / 10).max(1);

    let target_limit = config.base_position_limit.max(current_limit);
    let stages = (1..=stage_count)
        .map(|k| {
            let share = k as f64 / stage_count as f64;
            RecoveryStage {
                stage: k,
                required_recovery: (k - 1) as f64 / stage_count as f64,
                position_limit: current_limit + (target_limit - current_limit) * share,
                start_day: ((k - 1) as f64 / stage_count as f64 * estimated_recovery_days as f64)
                    .round() as u32,
            }
        })
        .collect();

    let gap = metrics.peak_price - metrics.current_price;
    let milestones = MILESTONES
        .iter()
        .map(|m| RecoveryMilestone {
            recovered_fraction: *m,
            target_price: metrics.current_price + gap * m,
        })
        .collect();

    Some(RiskRecoveryPlan {
        level,
        stages,
        milestones,
        estimated_recovery_days,
        review_interval_days,
    })
}
