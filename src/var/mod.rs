//! Value-at-Risk estimation
//!
//! Single-asset VaR/CVaR by historical simulation, parametric, Cornish-Fisher
//! and Monte Carlo methods, portfolio VaR with marginal/component
//! attribution, and Kupiec backtesting of VaR models.
//!
//! VaR and CVaR are reported in return units: a 95% VaR of `-0.021` means a
//! 2.1% loss is not expected to be exceeded on 95% of days.

mod backtest;
mod calculator;
mod portfolio;
mod types;

pub use backtest::KupiecTestResult;
pub use calculator::VarCalculator;
pub use portfolio::{PortfolioLevel, PortfolioRiskResult};
pub use types::{ConfidenceEstimate, ConfidenceInterval, DistributionParameters, RiskEstimateResult};

use crate::error::{RiskError, RiskResult, MIN_OBSERVATIONS};
use serde::{Deserialize, Serialize};

/// VaR estimation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    #[default]
    Historical,
    Parametric,
    CornishFisher,
    MonteCarlo,
}

impl VarMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarMethod::Historical => "historical",
            VarMethod::Parametric => "parametric",
            VarMethod::CornishFisher => "cornish_fisher",
            VarMethod::MonteCarlo => "monte_carlo",
        }
    }
}

impl std::fmt::Display for VarMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VarMethod {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "historical" => Ok(VarMethod::Historical),
            "parametric" => Ok(VarMethod::Parametric),
            "cornish_fisher" | "cornish-fisher" => Ok(VarMethod::CornishFisher),
            "monte_carlo" | "monte-carlo" => Ok(VarMethod::MonteCarlo),
            other => Err(RiskError::config(format!("unknown VaR method {}", other))),
        }
    }
}

/// Distribution assumed by the parametric method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParametricDistribution {
    #[default]
    Normal,
    /// Student-t rescaled to unit variance
    StudentT { degrees_of_freedom: f64 },
}

/// VaR calculator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarConfig {
    /// Method used by [`VarCalculator::calculate`]
    #[serde(default)]
    pub method: VarMethod,

    /// Confidence levels, each in (0, 1)
    #[serde(default = "default_confidence_levels")]
    pub confidence_levels: Vec<f64>,

    #[serde(default)]
    pub distribution: ParametricDistribution,

    /// Monte Carlo draws
    #[serde(default = "default_simulations")]
    pub monte_carlo_simulations: usize,

    /// Student-t degrees of freedom for Monte Carlo draws
    #[serde(default = "default_monte_carlo_df")]
    pub monte_carlo_df: f64,

    /// Bootstrap resamples for the 95% VaR confidence interval
    #[serde(default = "default_bootstrap_resamples")]
    pub bootstrap_resamples: usize,

    /// Seed for Monte Carlo and bootstrap draws
    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_min_observations")]
    pub min_observations: usize,

    /// Kupiec p-value at or below which a model is rejected
    #[serde(default = "default_significance")]
    pub significance_level: f64,
}

fn default_confidence_levels() -> Vec<f64> {
    vec![0.90, 0.95, 0.99]
}
fn default_simulations() -> usize {
    100_000
}
fn default_monte_carlo_df() -> f64 {
    5.0
}
fn default_bootstrap_resamples() -> usize {
    1000
}
fn default_seed() -> u64 {
    42
}
fn default_min_observations() -> usize {
    MIN_OBSERVATIONS
}
fn default_significance() -> f64 {
    0.05
}

impl Default for VarConfig {
    fn default() -> Self {
        Self {
            method: VarMethod::Historical,
            confidence_levels: default_confidence_levels(),
            distribution: ParametricDistribution::Normal,
            monte_carlo_simulations: default_simulations(),
            monte_carlo_df: default_monte_carlo_df(),
            bootstrap_resamples: default_bootstrap_resamples(),
            seed: default_seed(),
            min_observations: default_min_observations(),
            significance_level: default_significance(),
        }
    }
}

impl VarConfig {
    /// Check every field; errors are never corrected silently
    pub fn validate(&self) -> RiskResult<()> {
        if self.confidence_levels.is_empty() {
            return Err(RiskError::config("at least one confidence level is required"));
        }
        for &c in &self.confidence_levels {
            if !(c > 0.0 && c < 1.0) {
                return Err(RiskError::config(format!(
                    "confidence level {} outside (0, 1)",
                    c
                )));
            }
        }
        let mut sorted = self.confidence_levels.clone();
        sorted.sort_by(f64::total_cmp);
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(RiskError::config("duplicate confidence levels"));
        }
        if let ParametricDistribution::StudentT { degrees_of_freedom } = self.distribution {
            if degrees_of_freedom <= 2.0 {
                return Err(RiskError::config(
                    "Student-t degrees of freedom must exceed 2 for a finite variance",
                ));
            }
        }
        if self.monte_carlo_df <= 2.0 {
            return Err(RiskError::config("monte_carlo_df must exceed 2"));
        }
        if self.monte_carlo_simulations == 0 {
            return Err(RiskError::config("monte_carlo_simulations must be positive"));
        }
        if self.bootstrap_resamples < 1000 {
            return Err(RiskError::config("bootstrap_resamples must be at least 1000"));
        }
        if self.min_observations < 2 {
            return Err(RiskError::config("min_observations must be at least 2"));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(RiskError::config("significance_level outside (0, 1)"));
        }
        Ok(())
    }

    /// Confidence levels in ascending order
    pub fn sorted_levels(&self) -> Vec<f64> {
        let mut levels = self.confidence_levels.clone();
        levels.sort_by(f64::total_cmp);
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = VarConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sorted_levels(), vec![0.90, 0.95, 0.99]);
    }

    #[test]
    fn test_rejects_bad_confidence() {
        let config = VarConfig {
            confidence_levels: vec![0.95, 1.0],
            ..VarConfig::default()
        };
        assert!(matches!(config.validate(), Err(RiskError::Configuration(_))));

        let config = VarConfig {
            confidence_levels: vec![0.95, 0.95],
            ..VarConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_low_df() {
        let config = VarConfig {
            distribution: ParametricDistribution::StudentT {
                degrees_of_freedom: 2.0,
            },
            ..VarConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("historical".parse::<VarMethod>().unwrap(), VarMethod::Historical);
        assert_eq!(
            "cornish-fisher".parse::<VarMethod>().unwrap(),
            VarMethod::CornishFisher
        );
        assert!("garch".parse::<VarMethod>().is_err());
        assert_eq!(VarMethod::MonteCarlo.to_string(), "monte_carlo");
    }

    #[test]
    fn test_config_toml() {
        let config: VarConfig = toml::from_str(
            r#"
            method = "parametric"
            confidence_levels = [0.95, 0.99]
            distribution = { kind = "student_t", degrees_of_freedom = 6.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.method, VarMethod::Parametric);
        assert_eq!(
            config.distribution,
            ParametricDistribution::StudentT {
                degrees_of_freedom: 6.0
            }
        );
        assert_eq!(config.monte_carlo_simulations, 100_000);
    }
}
