//! Property price predictor CLI
//!
//! Trains and evaluates the price model, predicts single properties offline
//! and checks the health of a running prediction server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{predict, status, train};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Property price predictor CLI
#[derive(Parser)]
#[command(name = "pricectl")]
#[command(author, version, about = "CLI for the Property Price Predictor", long_about = None)]
pub struct Cli {
    /// TOML configuration file (values can be overridden by PRICE_* env vars)
    #[arg(long, short, env = "PRICE_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the model, evaluate it on the test split and save it
    Train {
        /// Override the configured model output path
        #[arg(long)]
        model_path: Option<PathBuf>,
    },

    /// Evaluate a saved model on the configured test split
    Evaluate {
        /// Override the configured model path
        #[arg(long)]
        model_path: Option<PathBuf>,
    },

    /// Predict the price of one property with a saved model
    Predict {
        /// Feature row as a JSON object
        row: Option<String>,

        /// Read the JSON feature row from a file
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Override the configured model path
        #[arg(long)]
        model_path: Option<PathBuf>,
    },

    /// Show the health of a running prediction server
    Status {
        /// Prediction server URL
        #[arg(long, env = "PRICE_API_URL", default_value = "http://localhost:8080")]
        api_url: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    debug!(config = ?cli.config, "Running command");

    match cli.command {
        Commands::Train { model_path } => {
            let mut settings = config::load_settings(cli.config.as_deref())?;
            if let Some(path) = model_path {
                settings.model_path = path;
            }
            debug!(?settings, "Loaded training settings");
            train::train(&settings, cli.format)?;
        }
        Commands::Evaluate { model_path } => {
            let mut settings = config::load_settings(cli.config.as_deref())?;
            if let Some(path) = model_path {
                settings.model_path = path;
            }
            train::evaluate(&settings, cli.format)?;
        }
        Commands::Predict {
            row,
            input,
            model_path,
        } => {
            let model_path = match model_path {
                Some(path) => path,
                None => config::load_settings(cli.config.as_deref())?.model_path,
            };
            let row = predict::read_row(row.as_deref(), input.as_deref())?;
            predict::predict(&model_path, &row, cli.format)?;
        }
        Commands::Status { api_url } => {
            let client = client::ApiClient::new(&api_url)?;
            status::show_status(&client, cli.format).await?;
        }
    }

    Ok(())
}
