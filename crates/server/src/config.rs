//! Server configuration

use anyhow::{Context, Result};
use predictor_lib::artifact::DEFAULT_MODEL_PATH;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the API key when not set via `SERVER_API_KEY`
pub const API_KEY_ENV: &str = "API_KEY";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen port for prediction, health and metrics endpoints
    #[serde(default = "default_port")]
    pub port: u16,

    /// Model artifact loaded once at startup
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Key expected in the `X-API-Key` header
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            model_path: default_model_path(),
            api_key: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional TOML file, then `SERVER_*`
    /// environment variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, None)
    }

    /// Values are kept as strings so numeric-looking keys survive intact.
    /// `env` replaces the process environment when given.
    fn load_with_env(file: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()
            .context("Failed to read server configuration")?;

        let mut config: ServerConfig = settings
            .try_deserialize()
            .context("Invalid server configuration")?;

        if config.api_key.is_none() {
            config.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.model_path, PathBuf::from("models/property_model.bin"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "port = 9191\nmodel_path = \"/srv/model.bin\"\napi_key = \"secret\""
        )
        .unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.port, 9191);
        assert_eq!(config.model_path, PathBuf::from("/srv/model.bin"));
        assert_eq!(config.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_env_values_are_not_reparsed() {
        let env = config::Map::from([
            ("SERVER_API_KEY".to_string(), "00012345678901234567890".to_string()),
            ("SERVER_PORT".to_string(), "9292".to_string()),
        ]);

        let config = ServerConfig::load_with_env(None, Some(env)).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("00012345678901234567890"));
        assert_eq!(config.port, 9292);
    }

    #[test]
    fn test_boolean_looking_key_stays_a_string() {
        let env = config::Map::from([("SERVER_API_KEY".to_string(), "TRUE".to_string())]);

        let config = ServerConfig::load_with_env(None, Some(env)).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("TRUE"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(ServerConfig::load(Some(Path::new("/nonexistent/server.toml"))).is_err());
    }
}
