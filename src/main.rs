use clap::Parser;
use quant_risk::cli::{Cli, Commands};
use quant_risk::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("Config file {} not found, using defaults", cli.config);
        Config::default()
    };

    // Initialize telemetry
    quant_risk::telemetry::init_telemetry(&config.telemetry)?;

    let format = cli.format;
    match cli.command {
        Commands::Var(args) => args.execute(&config, format).await?,
        Commands::PortfolioVar(args) => args.execute(&config, format).await?,
        Commands::BacktestVar(args) => args.execute(&config, format).await?,
        Commands::Size(args) => args.execute(&config, format).await?,
        Commands::Parity(args) => args.execute(&config, format).await?,
        Commands::Stress(args) => args.execute(&config, format).await?,
        Commands::Drawdown(args) => args.execute(&config, format).await?,
        Commands::Validate(args) => args.execute(&config, format).await?,
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}
