//! Fitting a pipeline under data-integrity preconditions

use crate::error::{PredictorError, Result};
use crate::models::Dataset;
use crate::pipeline::Estimator;
use std::time::Instant;
use tracing::{error, info};

/// Fit `pipeline` on the training split and return it for chaining.
///
/// Empty inputs, mismatched lengths and missing or non-finite targets are
/// rejected with [`PredictorError::Validation`] before the pipeline is touched.
/// Anything that fails inside the fit itself surfaces as
/// [`PredictorError::Training`].
pub fn train<'a, E: Estimator + ?Sized>(
    pipeline: &'a mut E,
    x_train: &Dataset,
    y_train: &[Option<f64>],
) -> Result<&'a mut E> {
    let y = validate_training_data(x_train, y_train)?;

    info!(
        rows = x_train.len(),
        features = x_train.columns().len(),
        "Training model"
    );
    let start = Instant::now();

    pipeline.fit(x_train, &y).map_err(|e| {
        error!(error = %e, "Model fit failed");
        match e {
            PredictorError::Training(msg) => PredictorError::Training(msg),
            other => PredictorError::Training(other.to_string()),
        }
    })?;

    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Model training completed"
    );
    Ok(pipeline)
}

fn validate_training_data(x_train: &Dataset, y_train: &[Option<f64>]) -> Result<Vec<f64>> {
    if x_train.is_empty() || y_train.is_empty() {
        return Err(PredictorError::Validation(format!(
            "training data is empty (features: {} rows, targets: {} rows)",
            x_train.len(),
            y_train.len()
        )));
    }
    if x_train.len() != y_train.len() {
        return Err(PredictorError::Validation(format!(
            "feature rows ({}) and targets ({}) differ in length",
            x_train.len(),
            y_train.len()
        )));
    }

    let missing: Vec<usize> = y_train
        .iter()
        .enumerate()
        .filter(|(_, v)| v.map_or(true, |n| !n.is_finite()))
        .map(|(i, _)| i)
        .collect();
    if !missing.is_empty() {
        return Err(PredictorError::Validation(format!(
            "target has {} missing or non-finite values (first at row {})",
            missing.len(),
            missing[0]
        )));
    }

    Ok(y_train.iter().flatten().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbm::BoostingParams;
    use crate::models::Value;
    use crate::pipeline::{build_pipeline, ModelPipeline};
    use crate::preprocess::{build_preprocessor, EncoderParams};

    fn data(n: usize) -> (Dataset, Vec<Option<f64>>) {
        let rows = (0..n)
            .map(|i| {
                vec![
                    Value::from(if i % 2 == 0 { "casa" } else { "departamento" }),
                    Value::from(50.0 + i as f64),
                ]
            })
            .collect();
        let y = (0..n).map(|i| Some(2000.0 + 30.0 * i as f64)).collect();
        (
            Dataset::new(vec!["type".into(), "net_area".into()], rows).unwrap(),
            y,
        )
    }

    fn pipeline() -> ModelPipeline {
        build_pipeline(
            build_preprocessor(&["type"], EncoderParams::default()).unwrap(),
            BoostingParams {
                n_estimators: 10,
                ..BoostingParams::default()
            },
        )
        .unwrap()
    }

    #[derive(Debug)]
    struct FailingEstimator;

    impl Estimator for FailingEstimator {
        fn fit(&mut self, _x: &Dataset, _y: &[f64]) -> Result<()> {
            Err(PredictorError::Internal("solver exploded".to_string()))
        }

        fn predict(&self, _x: &Dataset) -> Result<Vec<f64>> {
            Ok(vec![])
        }

        fn is_fitted(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_train_fits_and_chains() {
        let (x, y) = data(20);
        let mut model = pipeline();
        let fitted = train(&mut model, &x, &y).unwrap();
        assert!(fitted.is_fitted());
        assert!(model.is_fitted());
    }

    #[test]
    fn test_null_target_is_validation_error_and_leaves_pipeline_unfit() {
        let (x, mut y) = data(20);
        y[7] = None;
        let mut model = pipeline();

        let err = train(&mut model, &x, &y).unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
        assert!(err.to_string().contains("row 7"));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_length_mismatch_is_validation_error() {
        let (x, y) = data(20);
        let mut model = pipeline();
        let err = train(&mut model, &x, &y[..10]).unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
    }

    #[test]
    fn test_empty_data_is_validation_error() {
        let (x, _) = data(0);
        let mut model = pipeline();
        let err = train(&mut model, &x, &[]).unwrap_err();
        assert!(matches!(err, PredictorError::Validation(_)));
    }

    #[test]
    fn test_fit_failure_is_wrapped_as_training_error() {
        let (x, y) = data(5);
        let mut estimator = FailingEstimator;
        let err = train(&mut estimator, &x, &y).unwrap_err();
        assert!(matches!(err, PredictorError::Training(_)));
        assert!(err.to_string().contains("solver exploded"));
    }

    #[test]
    fn test_non_numeric_feature_is_training_error() {
        let x = Dataset::new(
            vec!["type".into(), "net_area".into()],
            vec![
                vec![Value::from("casa"), Value::from("big")],
                vec![Value::from("casa"), Value::from(10.0)],
            ],
        )
        .unwrap();
        let mut model = pipeline();
        let err = train(&mut model, &x, &[Some(1.0), Some(2.0)]).unwrap_err();
        assert!(matches!(err, PredictorError::Training(_)));
        assert!(!model.is_fitted());
    }
}
