//! Drawdown control
//!
//! Tracks realized drawdown, places volatility-aware stops, grades severity
//! on a fixed five-tier table and scales position limits down as losses
//! deepen. Severe and critical drawdowns come with a staged recovery plan.

mod engine;
mod recovery;
mod types;

pub use engine::{DrawdownContext, DrawdownControlEngine};
pub use types::{
    DrawdownControlResult, DrawdownMetrics, DrawdownWarning, RecoveryMilestone, RecoveryStage,
    RiskRecoveryPlan, SeverityAssessment, StopLoss,
};

use crate::error::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};

/// Severity tier, ordered from calm to critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawdownLevel {
    Normal,
    Mild,
    Moderate,
    Severe,
    Critical,
}

impl DrawdownLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawdownLevel::Normal => "NORMAL",
            DrawdownLevel::Mild => "MILD",
            DrawdownLevel::Moderate => "MODERATE",
            DrawdownLevel::Severe => "SEVERE",
            DrawdownLevel::Critical => "CRITICAL",
        }
    }

    /// One tier worse, saturating at critical
    pub fn escalate(self) -> Self {
        match self {
            DrawdownLevel::Normal => DrawdownLevel::Mild,
            DrawdownLevel::Mild => DrawdownLevel::Moderate,
            DrawdownLevel::Moderate => DrawdownLevel::Severe,
            DrawdownLevel::Severe | DrawdownLevel::Critical => DrawdownLevel::Critical,
        }
    }

    /// One tier better, saturating at normal
    pub fn de_escalate(self) -> Self {
        match self {
            DrawdownLevel::Normal | DrawdownLevel::Mild => DrawdownLevel::Normal,
            DrawdownLevel::Moderate => DrawdownLevel::Mild,
            DrawdownLevel::Severe => DrawdownLevel::Moderate,
            DrawdownLevel::Critical => DrawdownLevel::Severe,
        }
    }

    /// Tier for a drawdown (<= 0) from the threshold table
    pub fn classify(drawdown: f64) -> Self {
        THRESHOLDS
            .iter()
            .rev()
            .find(|t| drawdown <= t.drawdown)
            .map(|t| t.level)
            .unwrap_or(DrawdownLevel::Normal)
    }

    pub fn threshold(&self) -> &'static DrawdownThreshold {
        // table is indexed by tier order
        &THRESHOLDS[*self as usize]
    }
}

impl std::fmt::Display for DrawdownLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the severity table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawdownThreshold {
    pub level: DrawdownLevel,
    /// Tier applies at or below this drawdown
    pub drawdown: f64,
    /// Fraction cut from the base position limit
    pub reduction: f64,
    pub cooldown_days: u32,
}

pub const THRESHOLDS: [DrawdownThreshold; 5] = [
    DrawdownThreshold {
        level: DrawdownLevel::Normal,
        drawdown: 0.0,
        reduction: 0.0,
        cooldown_days: 0,
    },
    DrawdownThreshold {
        level: DrawdownLevel::Mild,
        drawdown: -0.05,
        reduction: 0.2,
        cooldown_days: 1,
    },
    DrawdownThreshold {
        level: DrawdownLevel::Moderate,
        drawdown: -0.10,
        reduction: 0.4,
        cooldown_days: 3,
    },
    DrawdownThreshold {
        level: DrawdownLevel::Severe,
        drawdown: -0.15,
        reduction: 0.6,
        cooldown_days: 5,
    },
    DrawdownThreshold {
        level: DrawdownLevel::Critical,
        drawdown: -0.25,
        reduction: 0.8,
        cooldown_days: 10,
    },
];

/// Drawdown control configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownConfig {
    /// Initial stop distance at baseline volatility
    #[serde(default = "default_base_stop")]
    pub base_stop: f64,

    /// Trailing stop distance below the running peak
    #[serde(default = "default_trailing_distance")]
    pub trailing_distance: f64,

    /// Annualized volatility at which the initial stop is unscaled
    #[serde(default = "default_baseline_volatility")]
    pub baseline_volatility: f64,

    /// Minimum gap kept between the stop and the current price
    #[serde(default = "default_stop_buffer")]
    pub stop_buffer: f64,

    /// Position limit before drawdown scaling
    #[serde(default = "default_base_position_limit")]
    pub base_position_limit: f64,

    #[serde(default = "default_min_position_limit")]
    pub min_position_limit: f64,

    #[serde(default = "default_max_position_limit")]
    pub max_position_limit: f64,

    /// Escalate when the current drawdown reaches this share of the max
    #[serde(default = "default_escalation_ratio")]
    pub escalation_ratio: f64,

    /// Expected recovery per day used to size recovery timelines
    #[serde(default = "default_daily_recovery_rate")]
    pub daily_recovery_rate: f64,

    /// Bars below the peak before an underwater warning
    #[serde(default = "default_max_days_underwater")]
    pub max_days_underwater: usize,
}

fn default_base_stop() -> f64 {
    0.05
}
fn default_trailing_distance() -> f64 {
    0.08
}
fn default_baseline_volatility() -> f64 {
    0.20
}
fn default_stop_buffer() -> f64 {
    0.005
}
fn default_base_position_limit() -> f64 {
    0.10
}
fn default_min_position_limit() -> f64 {
    0.01
}
fn default_max_position_limit() -> f64 {
    0.30
}
fn default_escalation_ratio() -> f64 {
    0.8
}
fn default_daily_recovery_rate() -> f64 {
    0.001
}
fn default_max_days_underwater() -> usize {
    60
}

impl Default for DrawdownConfig {
    fn default() -> Self {
        Self {
            base_stop: default_base_stop(),
            trailing_distance: default_trailing_distance(),
            baseline_volatility: default_baseline_volatility(),
            stop_buffer: default_stop_buffer(),
            base_position_limit: default_base_position_limit(),
            min_position_limit: default_min_position_limit(),
            max_position_limit: default_max_position_limit(),
            escalation_ratio: default_escalation_ratio(),
            daily_recovery_rate: default_daily_recovery_rate(),
            max_days_underwater: default_max_days_underwater(),
        }
    }
}

impl DrawdownConfig {
    pub fn validate(&self) -> RiskResult<()> {
        // the initial stop scales up to 3x and must stay above zero
        if !(self.base_stop > 0.0 && self.base_stop * 3.0 < 1.0) {
            return Err(RiskError::config("base_stop must be in (0, 1/3)"));
        }
        if !(self.trailing_distance > 0.0 && self.trailing_distance < 1.0) {
            return Err(RiskError::config("trailing_distance must be in (0, 1)"));
        }
        if self.baseline_volatility <= 0.0 {
            return Err(RiskError::config("baseline_volatility must be positive"));
        }
        if !(self.stop_buffer > 0.0 && self.stop_buffer < 1.0) {
            return Err(RiskError::config("stop_buffer must be in (0, 1)"));
        }
        if !(0.0 < self.min_position_limit
            && self.min_position_limit <= self.max_position_limit
            && self.max_position_limit <= 1.0)
        {
            return Err(RiskError::config(
                "position limits must satisfy 0 < min <= max <= 1",
            ));
        }
        if self.base_position_limit <= 0.0 || self.base_position_limit > 1.0 {
            return Err(RiskError::config("base_position_limit must be in (0, 1]"));
        }
        if !(self.escalation_ratio > 0.0 && self.escalation_ratio <= 1.0) {
            return Err(RiskError::config("escalation_ratio must be in (0, 1]"));
        }
        if self.daily_recovery_rate <= 0.0 {
            return Err(RiskError::config("daily_recovery_rate must be positive"));
        }
        Ok(())
    }
}
