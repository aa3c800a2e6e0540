//! Validate command implementation

use super::{emit, read_json, OutputFormat};
use crate::config::Config;
use crate::series::ReturnSeries;
use crate::validation::{SignalValidationResult, SignalValidator};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Strategy return series JSON
    #[arg(long)]
    pub input: PathBuf,

    /// Test size (overrides config)
    #[arg(long)]
    pub significance: Option<f64>,

    /// Annual risk-free rate (overrides config)
    #[arg(long, allow_hyphen_values = true)]
    pub risk_free_rate: Option<f64>,
}

impl ValidateArgs {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
        let mut validation = config.validation.clone();
        if let Some(significance) = self.significance {
            validation.significance_level = significance;
        }
        if let Some(rate) = self.risk_free_rate {
            validation.risk_free_rate = rate;
        }

        let validator = SignalValidator::new(validation)?;
        let series: ReturnSeries = read_json(&self.input)?;
        let result = validator.validate(&series)?;
        emit(&result, format, SignalValidationResult::format_table)
    }
}
