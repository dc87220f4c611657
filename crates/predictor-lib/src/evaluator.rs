//! Hold-out accuracy metrics

use crate::error::{PredictorError, Result};
use crate::models::MetricsReport;
use tracing::info;

/// RMSE, MAE and MAPE of `predictions` against `targets`.
///
/// MAPE is the mean of `|prediction - target| / |target|` as a fraction.
/// Zero targets are not guarded and yield an infinite or NaN MAPE.
pub fn calculate_metrics(predictions: &[f64], targets: &[f64]) -> Result<MetricsReport> {
    if predictions.len() != targets.len() {
        return Err(PredictorError::Validation(format!(
            "predictions ({}) and targets ({}) differ in length",
            predictions.len(),
            targets.len()
        )));
    }
    if predictions.is_empty() {
        return Err(PredictorError::Validation(
            "cannot compute metrics on empty input".to_string(),
        ));
    }

    let n = predictions.len() as f64;
    let mut squared = 0.0;
    let mut absolute = 0.0;
    let mut relative = 0.0;
    for (pred, target) in predictions.iter().zip(targets) {
        let diff = pred - target;
        squared += diff * diff;
        absolute += diff.abs();
        relative += diff.abs() / target.abs();
    }

    Ok(MetricsReport {
        rmse: (squared / n).sqrt(),
        mape: relative / n,
        mae: absolute / n,
    })
}

/// Compute metrics and log them
pub fn evaluate(predictions: &[f64], targets: &[f64]) -> Result<MetricsReport> {
    let report = calculate_metrics(predictions, targets)?;
    info!(
        rmse = report.rmse,
        mape = report.mape,
        mae = report.mae,
        samples = predictions.len(),
        "Evaluation metrics"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_on_small_sample() {
        let report = calculate_metrics(&[100.0, 200.0], &[110.0, 190.0]).unwrap();
        assert!((report.rmse - 10.0).abs() < 1e-9);
        assert!((report.mae - 10.0).abs() < 1e-9);
        let expected_mape = (10.0 / 110.0 + 10.0 / 190.0) / 2.0;
        assert!((report.mape - expected_mape).abs() < 1e-12);
        assert!((report.mape - 0.0718).abs() < 1e-4);
    }

    #[test]
    fn test_perfect_predictions() {
        let report = calculate_metrics(&[5.0, 7.0, 9.0], &[5.0, 7.0, 9.0]).unwrap();
        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.mae, 0.0);
        assert_eq!(report.mape, 0.0);
    }

    #[test]
    fn test_rmse_penalises_large_errors() {
        let report = calculate_metrics(&[0.0, 0.0, 0.0, 0.0], &[1.0, 1.0, 1.0, 5.0]).unwrap();
        assert_eq!(report.mae, 2.0);
        assert!((report.rmse - 7.0_f64.sqrt()).abs() < 1e-12);
        assert!(report.rmse > report.mae);
    }

    #[test]
    fn test_zero_target_is_unguarded() {
        let report = calculate_metrics(&[1.0], &[0.0]).unwrap();
        assert!(report.mape.is_infinite());
    }

    #[test]
    fn test_length_mismatch_and_empty_are_rejected() {
        assert!(matches!(
            calculate_metrics(&[1.0], &[1.0, 2.0]).unwrap_err(),
            PredictorError::Validation(_)
        ));
        assert!(matches!(
            calculate_metrics(&[], &[]).unwrap_err(),
            PredictorError::Validation(_)
        ));
    }
}
