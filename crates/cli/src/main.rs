//! hostwatch CLI
//!
//! Queries a running agent for its status and learned applications, and
//! records or summarizes host telemetry for model training.

mod client;
mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{status, telemetry};

/// hostwatch CLI
#[derive(Parser)]
#[command(name = "hwctl")]
#[command(author, version, about = "CLI for the hostwatch anomaly monitor", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via HOSTWATCH_API_URL env var)
    #[arg(long, env = "HOSTWATCH_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the agent's engine status
    Status,

    /// List applications whose launch impact has been learned
    Apps,

    /// Record host CPU and RAM usage to a telemetry file
    Collect {
        /// Telemetry CSV file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Seconds between samples
        #[arg(long, short, default_value_t = 5)]
        interval: u64,

        /// Stop after this many seconds
        #[arg(long, short)]
        duration: Option<u64>,
    },

    /// Summarize a telemetry file
    Stats {
        /// Telemetry CSV file
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Commands::Status => {
            let client = client::ApiClient::new(&config.api_url(cli.api_url))?;
            status::show_status(&client, cli.format).await?;
        }
        Commands::Apps => {
            let client = client::ApiClient::new(&config.api_url(cli.api_url))?;
            status::show_known_apps(&client, cli.format).await?;
        }
        Commands::Collect {
            output,
            interval,
            duration,
        } => {
            telemetry::collect(
                &config.telemetry_path(output),
                Duration::from_secs(interval),
                duration.map(Duration::from_secs),
            )
            .await?;
        }
        Commands::Stats { input } => {
            telemetry::show_stats(&config.telemetry_path(input), cli.format)?;
        }
    }

    Ok(())
}
