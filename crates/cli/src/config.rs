//! Training configuration for the CLI

use anyhow::{Context, Result};
use predictor_lib::TrainingSettings;
use std::path::Path;

/// Prefix of environment overrides, e.g. `PRICE_MODEL__LEARNING_RATE`
pub const ENV_PREFIX: &str = "PRICE";

/// Load training settings: built-in defaults, then the optional TOML file,
/// then `PRICE_*` environment variables (nested keys separated by `__`).
pub fn load_settings(file: Option<&Path>) -> Result<TrainingSettings> {
    let mut builder = config::Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings: TrainingSettings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("categorical_columns"),
        )
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    settings
        .boosting_params()
        .validate()
        .context("Invalid model hyperparameters")?;

    Ok(settings)
}
