//! CLI interface for trade-radar
//!
//! Provides subcommands for:
//! - `run`: Start the monitoring engine
//! - `check`: Validate a subscriptions file
//! - `config`: Show effective configuration

mod check;
mod run;

pub use check::CheckArgs;
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "trade-radar")]
#[command(about = "Subscription-driven stock alert engine")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the monitoring engine
    Run(RunArgs),
    /// Validate a subscriptions file
    Check(CheckArgs),
    /// Show effective configuration
    Config,
}
