//! Configuration types for quant-risk

use crate::drawdown::DrawdownConfig;
use crate::error::RiskResult;
use crate::parity::ParityConfig;
use crate::sizing::SizingConfig;
use crate::stress::StressConfig;
use crate::telemetry::LogFormat;
use crate::validation::ValidationConfig;
use crate::var::VarConfig;
use serde::{Deserialize, Serialize};

/// Root configuration structure
///
/// Every section is optional; missing sections and fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub var: VarConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub parity: ParityConfig,
    #[serde(default)]
    pub stress: StressConfig,
    #[serde(default)]
    pub drawdown: DrawdownConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default filter directive; RUST_LOG overrides it
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> RiskResult<()> {
        self.var.validate()?;
        self.sizing.validate()?;
        self.parity.validate()?;
        self.stress.validate()?;
        self.drawdown.validate()?;
        self.validation.validate()?;
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiskError;
    use crate::parity::ParityMethod;
    use std::io::Write;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [var]
            confidence_levels = [0.95, 0.99]
            monte_carlo_simulations = 5000

            [sizing]
            default_max_position = 0.15

            [parity]
            method = "inverse_volatility"
            max_weight = 0.5

            [stress]
            seed = 7

            [drawdown]
            base_stop = 0.04

            [validation]
            significance_level = 0.01

            [telemetry]
            log_level = "debug"
            log_format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.var.monte_carlo_simulations, 5000);
        assert_eq!(config.parity.method, ParityMethod::InverseVolatility);
        assert_eq!(config.parity.max_weight, 0.5);
        assert_eq!(config.stress.seed, 7);
        assert_eq!(config.drawdown.base_stop, 0.04);
        assert_eq!(config.validation.significance_level, 0.01);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config: Config = toml::from_str("[drawdown]\nmax_days_underwater = 30\n").unwrap();
        assert_eq!(config.drawdown.max_days_underwater, 30);
        assert_eq!(config.drawdown.base_stop, DrawdownConfig::default().base_stop);
    }

    #[test]
    fn test_invalid_section_rejected() {
        let config: Config = toml::from_str("[parity]\nmin_weight = 0.6\nmax_weight = 0.4\n").unwrap();
        assert!(matches!(config.validate(), Err(RiskError::Configuration(_))));
    }

    #[test]
    fn test_config_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[stress]\nseed = 99\n[telemetry]\nlog_level = \"warn\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.stress.seed, 99);
        assert_eq!(config.telemetry.log_level, "warn");
    }

    #[test]
    fn test_config_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[validation]\ntarget_power = 1.5").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_example_file_parses() {
        let config: Config = toml::from_str(include_str!("../config.toml.example")).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
