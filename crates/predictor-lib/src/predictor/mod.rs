//! Batch and single-row prediction over a fitted pipeline

use crate::error::{PredictorError, Result};
use crate::models::{Dataset, FeatureRow};
use crate::pipeline::Estimator;
use tracing::debug;

/// Predict one value per row of `rows`, in row order.
///
/// Errors raised by the pipeline are reported as [`PredictorError::Prediction`]
/// with the underlying cause in the message.
pub fn predict_many<E: Estimator + ?Sized>(pipeline: &E, rows: &Dataset) -> Result<Vec<f64>> {
    if rows.is_empty() {
        return Err(PredictorError::Validation(
            "no rows to predict".to_string(),
        ));
    }
    if !pipeline.is_fitted() {
        return Err(PredictorError::Prediction(
            "pipeline has not been fitted".to_string(),
        ));
    }

    let predictions = pipeline.predict(rows).map_err(|e| match e {
        PredictorError::Prediction(msg) => PredictorError::Prediction(msg),
        other => PredictorError::Prediction(other.to_string()),
    })?;

    if predictions.len() != rows.len() {
        return Err(PredictorError::Internal(format!(
            "pipeline returned {} predictions for {} rows",
            predictions.len(),
            rows.len()
        )));
    }

    debug!(rows = rows.len(), "Batch prediction completed");
    Ok(predictions)
}

/// Predict a single row given as a column-name to value mapping
pub fn predict_one<E: Estimator + ?Sized>(pipeline: &E, row: &FeatureRow) -> Result<f64> {
    if row.is_empty() {
        return Err(PredictorError::Validation(
            "feature row is empty".to_string(),
        ));
    }

    let dataset = Dataset::new(
        row.keys().cloned().collect(),
        vec![row.values().cloned().collect()],
    )?;

    let value = predict_many(pipeline, &dataset)?
        .into_iter()
        .next()
        .ok_or_else(|| PredictorError::Internal("empty prediction result".to_string()))?;

    if !value.is_finite() {
        return Err(PredictorError::Validation(format!(
            "prediction is not a finite number: {}",
            value
        )));
    }
    Ok(value)
}
