use clap::Parser;
use trade_radar::cli::{Cli, Commands};
use trade_radar::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    match cli.command {
        Commands::Run(args) => {
            let _guard = trade_radar::telemetry::init_telemetry(&config.telemetry)?;
            args.execute(config).await?;
        }
        Commands::Check(args) => {
            trade_radar::telemetry::init_logging(
                &config.telemetry.log_level,
                config.telemetry.log_format,
            )?;
            args.execute().await?;
        }
        Commands::Config => {
            let mut shown = config;
            if !shown.analysis.api_key.is_empty() {
                shown.analysis.api_key = "********".to_string();
            }
            println!("{}", shown.to_toml()?);
        }
    }

    Ok(())
}
