//! Offline prediction against a stored model

use anyhow::{bail, Context, Result};
use colored::Colorize;
use predictor_lib::{FeatureRow, ModelManager};
use serde_json::json;
use std::path::Path;

use crate::output::{format_price, print_success, OutputFormat};

/// Parse a JSON object of feature name to value
pub fn parse_row(input: &str) -> Result<FeatureRow> {
    let value: serde_json::Value =
        serde_json::from_str(input).context("Input is not valid JSON")?;
    if !value.is_object() {
        bail!("Input must be a JSON object of feature values");
    }
    serde_json::from_value(value).context("Unsupported feature value")
}

/// Read a feature row from `input`, or from the file at `file`
pub fn read_row(input: Option<&str>, file: Option<&Path>) -> Result<FeatureRow> {
    match (input, file) {
        (Some(json), None) => parse_row(json),
        (None, Some(path)) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_row(&content)
        }
        (Some(_), Some(_)) => bail!("Pass either a JSON row or --input, not both"),
        (None, None) => bail!("No feature row given"),
    }
}

/// Load the model at `model_path` and predict one row
pub fn predict(model_path: &Path, row: &FeatureRow, format: OutputFormat) -> Result<()> {
    let mut manager = ModelManager::new(model_path);
    manager
        .load()
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

    let prediction = manager.predict(row).context("Prediction failed")?;

    match format {
        OutputFormat::Json => {
            let body = json!({
                "predicted_price": prediction.predicted_price,
                "status": "success",
                "model_version": prediction.model_version,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Table => {
            print_success(&format!(
                "Predicted price: {} (model {})",
                format_price(prediction.predicted_price).bold(),
                prediction.model_version.cyan()
            ));
        }
    }
    Ok(())
}
