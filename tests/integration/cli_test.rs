//! Configuration and CLI parsing

use clap::Parser;
use quant_risk::cli::{Cli, Commands, OutputFormat};
use quant_risk::config::Config;

#[test]
fn test_config_example_loads() {
    let config = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_cli_commands_parse() {
    let cases: [&[&str]; 7] = [
        &["quant-risk", "backtest-var", "--input", "r.json", "--window", "120"],
        &["quant-risk", "size", "--method", "volatility_adjusted", "--expected-return", "0.1", "--volatility", "0.2", "--portfolio-value", "1000"],
        &["quant-risk", "parity", "--returns", "r.json", "--method", "erc"],
        &["quant-risk", "stress", "--list"],
        &["quant-risk", "drawdown", "--prices", "p.json", "--portfolio-drawdown", "-0.03"],
        &["quant-risk", "validate", "--input", "r.json"],
        &["quant-risk", "--config", "custom.toml", "config"],
    ];
    for args in cases {
        assert!(Cli::try_parse_from(args).is_ok(), "{:?}", args);
    }

    let cli = Cli::try_parse_from(["quant-risk", "--format", "json", "validate", "--input", "r.json"]).unwrap();
    assert_eq!(cli.format, OutputFormat::Json);
    assert!(matches!(cli.command, Commands::Validate(_)));
}

#[test]
fn test_stress_requires_portfolio_unless_listing() {
    assert!(Cli::try_parse_from(["quant-risk", "stress"]).is_err());
}
