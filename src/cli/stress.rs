//! Stress command implementation

use super::{emit, read_json, OutputFormat};
use crate::config::Config;
use crate::stress::{Portfolio, StressCatalog, StressTestEngine, StressTestReport, StressTestResult};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct StressArgs {
    /// Portfolio JSON: holdings, prices and optional asset classes, volatilities and volumes
    #[arg(long, required_unless_present = "list")]
    pub portfolio: Option<PathBuf>,

    /// Replay a single historical event
    #[arg(long, conflicts_with = "scenario")]
    pub event: Option<String>,

    /// Run a single hypothetical scenario
    #[arg(long)]
    pub scenario: Option<String>,

    /// Write the comprehensive report as JSON
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// List the built-in events and scenarios
    #[arg(long)]
    pub list: bool,
}

impl StressArgs {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
        let engine = StressTestEngine::new(config.stress.clone(), StressCatalog::default_library())?;

        if self.list {
            print_catalog(engine.catalog());
            return Ok(());
        }
        let Some(path) = &self.portfolio else {
            anyhow::bail!("--portfolio is required");
        };
        let portfolio: Portfolio = read_json(path)?;

        if let Some(name) = &self.event {
            let result = engine.replay_event(&portfolio, name)?;
            return emit(&result, format, StressTestResult::format_table);
        }
        if let Some(name) = &self.scenario {
            let result = engine.run_scenario(&portfolio, name)?;
            return emit(&result, format, StressTestResult::format_table);
        }

        let report = engine.comprehensive(&portfolio);
        if let Some(export) = &self.export {
            report.export_json(export)?;
            tracing::info!(path = %export.display(), "Stress report exported");
        }
        emit(&report, format, StressTestReport::format_table)
    }
}

fn print_catalog(catalog: &StressCatalog) {
    println!("Historical events:");
    for event in catalog.events() {
        println!("  {:<24} {}  {}", event.name, event.date, event.description);
    }
    println!("Scenarios:");
    for scenario in catalog.scenarios() {
        println!(
            "  {:<24} p={:<6} {}",
            scenario.name, scenario.probability, scenario.description
        );
    }
}
