//! Price Server - property price prediction service
//!
//! Loads the trained model once at startup and serves predictions, health
//! checks and Prometheus metrics over HTTP.

use anyhow::Result;
use predictor_lib::{ModelManager, StructuredLogger};
use price_server::{api, config::ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Optional TOML configuration file
const CONFIG_FILE_ENV: &str = "SERVER_CONFIG_FILE";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting price-server");

    let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);
    let config = ServerConfig::load(config_file.as_deref())?;
    info!(
        port = config.port,
        model_path = %config.model_path.display(),
        api_key_configured = config.api_key.is_some(),
        "Server configured"
    );
    if config.api_key.is_none() {
        warn!("No API key configured, prediction requests will be rejected");
    }

    // Single load attempt; the service keeps running without a model
    let mut manager = ModelManager::new(&config.model_path);
    if manager.load().is_err() {
        warn!("API started but model is not available");
    }

    let logger = StructuredLogger::new("price-server");
    logger.log_startup(SERVER_VERSION, config.port, manager.is_loaded());

    let app_state = Arc::new(api::AppState::new(manager, config.api_key.clone()));

    api::serve(config.port, app_state, shutdown_signal()).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
