//! Flight Delay Prediction CLI
//!
//! A command-line tool for browsing airports, requesting delay predictions
//! and checking the prediction service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{airports, predict, status};

/// Flight Delay Prediction CLI
#[derive(Parser)]
#[command(name = "delayctl")]
#[command(author, version, about = "CLI for the Flight Delay Prediction API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via DELAYCTL_API_URL env var)
    #[arg(long, env = "DELAYCTL_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse the airport directory
    #[command(subcommand)]
    Airports(AirportsCommands),

    /// Predict the probability of a departure delay
    Predict {
        /// Day of week (1=Monday, 7=Sunday)
        #[arg(long, short, value_parser = clap::value_parser!(u8).range(1..=7))]
        day: u8,

        /// Public airport ID
        #[arg(long, short)]
        airport: i64,
    },

    /// Show prediction service status
    Status,

    /// Show component health
    Health,
}

#[derive(Subcommand)]
pub enum AirportsCommands {
    /// List airports sorted by name
    List {
        /// Only show airports whose name, code or city contains this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show a single airport
    Get {
        /// Public airport ID
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Airports(airports_cmd) => match airports_cmd {
            AirportsCommands::List { filter } => {
                airports::list_airports(&client, filter, cli.format).await?;
            }
            AirportsCommands::Get { id } => {
                airports::get_airport(&client, id, cli.format).await?;
            }
        },
        Commands::Predict { day, airport } => {
            predict::predict(&client, day, airport, cli.format).await?;
        }
        Commands::Status => {
            status::show_status(&client, cli.format).await?;
        }
        Commands::Health => {
            status::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
