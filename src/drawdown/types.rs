//! Drawdown control results

use super::DrawdownLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Realized drawdown of a price path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownMetrics {
    /// (price - peak) / peak at the last bar; <= 0
    pub current_drawdown: f64,
    /// Most negative drawdown over the path; <= current_drawdown
    pub max_drawdown: f64,
    /// Running peak at the last bar
    pub peak_price: f64,
    pub peak_time: Option<DateTime<Utc>>,
    /// Price at the deepest drawdown
    pub trough_price: f64,
    pub current_price: f64,
    /// Bars since the running peak was set
    pub days_since_peak: usize,
    pub observations: usize,
}

/// Stop levels for a long position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLoss {
    /// Volatility-scaled stop below the current price
    pub initial_stop: f64,
    /// Fixed distance below the running peak
    pub trailing_stop: f64,
    /// Higher of the two, kept strictly below the current price
    pub effective_stop: f64,
    /// clip(volatility / baseline, 1, 3)
    pub volatility_scale: f64,
    /// The uncapped stop was at or above the current price
    pub breached: bool,
}

/// Severity grade with the adjustments that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    pub level: DrawdownLevel,
    /// Tier from the threshold table alone
    pub base_level: DrawdownLevel,
    /// Raised a tier for being close to the historical maximum
    pub escalated: bool,
    /// Lowered a tier because the portfolio is down less than the position
    pub diversification_credit: bool,
    pub reduction: f64,
    pub cooldown_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownWarning {
    pub level: DrawdownLevel,
    pub message: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Price level at which a share of the drawdown has been recovered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryMilestone {
    /// Fraction of the peak-to-current gap recovered
    pub recovered_fraction: f64,
    pub target_price: f64,
}

/// One step of a staged position rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStage {
    pub stage: usize,
    /// Recovery required before entering the stage
    pub required_recovery: f64,
    pub position_limit: f64,
    /// Days from plan start
    pub start_day: u32,
}

/// Schedule for rebuilding exposure after a severe drawdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecoveryPlan {
    pub level: DrawdownLevel,
    pub stages: Vec<RecoveryStage>,
    pub milestones: Vec<RecoveryMilestone>,
    pub estimated_recovery_days: u32,
    pub review_interval_days: u32,
}

/// Everything the trading loop needs to act on a drawdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownControlResult {
    pub asset: String,
    pub metrics: DrawdownMetrics,
    pub stop_loss: StopLoss,
    pub severity: SeverityAssessment,
    pub position_limit: f64,
    pub warnings: Vec<DrawdownWarning>,
    pub recovery_plan: Option<RiskRecoveryPlan>,
    pub cooldown_days: u32,
    pub action_required: bool,
}

impl DrawdownControlResult {
    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut warnings = String::new();
        for w in &self.warnings {
            warnings.push_str(&format!("  [{}] {}\n", w.level, w.message));
        }
        if warnings.is_empty() {
            warnings.push_str("  none\n");
        }
        let plan = match &self.recovery_plan {
            Some(p) => {
                let mut s = format!(
                    "Recovery plan:    {} stages over ~{} days, review every {} days\n",
                    p.stages.len(),
                    p.estimated_recovery_days,
                    p.review_interval_days
                );
                for stage in &p.stages {
                    s.push_str(&format!(
                        "  stage {} @ {:>5.1}% recovered: limit {:.2}% (day {})\n",
                        stage.stage,
                        stage.required_recovery * 100.0,
                        stage.position_limit * 100.0,
                        stage.start_day
                    ));
                }
                s
            }
            None => String::new(),
        };
        format!(
            r#"
══════════════════════════════════════════════════════
               DRAWDOWN CONTROL: {}
══════════════════════════════════════════════════════
Current price:    {:.4}
Peak price:       {:.4}
Current DD:       {:.2}%
Max DD:           {:.2}%
Days since peak:  {}

Severity:         {}
Position limit:   {:.2}%
Cooldown:         {} days
Effective stop:   {:.4}{}
Action required:  {}

Warnings:
{}{}══════════════════════════════════════════════════════
"#,
            self.asset,
            self.metrics.current_price,
            self.metrics.peak_price,
            self.metrics.current_drawdown * 100.0,
            self.metrics.max_drawdown * 100.0,
            self.metrics.days_since_peak,
            self.severity.level,
            self.position_limit * 100.0,
            self.cooldown_days,
            self.stop_loss.effective_stop,
            if self.stop_loss.breached { " (BREACHED)" } else { "" },
            self.action_required,
            warnings,
            plan,
        )
    }
}
