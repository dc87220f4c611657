//! Health of a running prediction server

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_status, print_warning, OutputFormat};

/// Query `/health` and report it
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        OutputFormat::Table => {
            println!("{}", "Server Status".bold());
            println!("{}", "=".repeat(60));
            println!("Status:        {}", color_status(health.status.as_str()));
            println!("Model loaded:  {}", health.model_loaded);
            if let Some(version) = &health.model_version {
                println!("Model version: {}", version.cyan());
            }
            println!(
                "Checked at:    {}",
                health.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            );

            if !health.model_loaded {
                println!();
                print_warning("No model loaded; predictions will return 503 until redeployed");
            }
        }
    }
    Ok(())
}
