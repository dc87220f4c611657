//! Training and evaluation commands

use anyhow::{Context, Result};
use colored::Colorize;
use predictor_lib::{run_evaluation, run_training, TrainingSettings};
use serde_json::json;

use crate::output::{format_price, print_info, print_metrics, print_success, OutputFormat};

/// Train, evaluate on the test split and persist the model
pub fn train(settings: &TrainingSettings, format: OutputFormat) -> Result<()> {
    let outcome = run_training(settings).context("Training failed")?;

    match format {
        OutputFormat::Json => {
            let report = json!({
                "metrics": outcome.metrics,
                "feature_columns": outcome.feature_columns,
                "train_rows": outcome.train_rows,
                "test_rows": outcome.test_rows,
                "model_path": outcome.model_path,
                "model_version": outcome.artifact.version,
                "duration_secs": outcome.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{}", "Training Summary".bold());
            println!("{}", "=".repeat(60));
            println!("Train rows:    {}", outcome.train_rows);
            println!("Test rows:     {}", outcome.test_rows);
            println!("Features:      {}", outcome.feature_columns.join(", ").cyan());
            println!("Duration:      {:.2}s", outcome.duration_secs);
            println!();
            print_metrics(&outcome.metrics);
            println!();
            print_success(&format!(
                "Model {} saved to {}",
                outcome.artifact.version.cyan(),
                outcome.model_path.display()
            ));
            print_info(&format!(
                "Mean absolute error: {}",
                format_price(outcome.metrics.mae)
            ));
        }
    }
    Ok(())
}

/// Re-score the stored model against the configured test split
pub fn evaluate(settings: &TrainingSettings, format: OutputFormat) -> Result<()> {
    let outcome = run_evaluation(settings).context("Evaluation failed")?;

    match format {
        OutputFormat::Json => {
            let report = json!({
                "metrics": outcome.metrics,
                "test_rows": outcome.test_rows,
                "model_version": outcome.model_version,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{}", "Evaluation".bold());
            println!("{}", "=".repeat(60));
            println!("Model:      {}", outcome.model_version.cyan());
            println!("Test rows:  {}", outcome.test_rows);
            println!();
            print_metrics(&outcome.metrics);
        }
    }
    Ok(())
}
