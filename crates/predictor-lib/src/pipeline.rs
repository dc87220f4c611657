//! Model pipeline: target-encoding preprocessor followed by a boosted regressor

use crate::error::{PredictorError, Result};
use crate::gbm::{BoostingParams, GradientBoostingRegressor};
use crate::models::Dataset;
use crate::preprocess::ColumnPreprocessor;
use serde::{Deserialize, Serialize};

/// Fit/predict capability shared by pipelines
pub trait Estimator {
    /// Learn from `x` and `y`. Leaves the estimator untouched on error.
    fn fit(&mut self, x: &Dataset, y: &[f64]) -> Result<()>;

    /// One prediction per row of `x`
    fn predict(&self, x: &Dataset) -> Result<Vec<f64>>;

    fn is_fitted(&self) -> bool;
}

/// Preprocessor and regressor fitted as one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPipeline {
    preprocessor: ColumnPreprocessor,
    regressor: GradientBoostingRegressor,
}

/// Compose an unfit pipeline from a preprocessor and boosting hyperparameters
pub fn build_pipeline(
    preprocessor: ColumnPreprocessor,
    params: BoostingParams,
) -> Result<ModelPipeline> {
    if preprocessor.is_fitted() {
        return Err(PredictorError::Configuration(
            "pipeline must be built from an unfit preprocessor".to_string(),
        ));
    }
    Ok(ModelPipeline {
        preprocessor,
        regressor: GradientBoostingRegressor::new(params)?,
    })
}

impl ModelPipeline {
    pub fn preprocessor(&self) -> &ColumnPreprocessor {
        &self.preprocessor
    }

    pub fn regressor(&self) -> &GradientBoostingRegressor {
        &self.regressor
    }

    pub fn params(&self) -> &BoostingParams {
        self.regressor.params()
    }

    /// Columns the fitted pipeline reads, in order
    pub fn feature_columns(&self) -> Option<&[String]> {
        self.preprocessor.input_columns()
    }
}

impl Estimator for ModelPipeline {
    fn fit(&mut self, x: &Dataset, y: &[f64]) -> Result<()> {
        // Fit copies so a failure leaves the pipeline unfit
        let mut preprocessor = self.preprocessor.clone();
        let matrix = preprocessor.fit_transform(x, y)?;

        let mut regressor = self.regressor.clone();
        regressor.fit(&matrix, y)?;

        self.preprocessor = preprocessor;
        self.regressor = regressor;
        Ok(())
    }

    fn predict(&self, x: &Dataset) -> Result<Vec<f64>> {
        let matrix = self.preprocessor.transform(x)?;
        self.regressor.predict(&matrix)
    }

    fn is_fitted(&self) -> bool {
        self.preprocessor.is_fitted() && self.regressor.is_fitted()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;
    use crate::preprocess::{build_preprocessor, EncoderParams};

    fn dataset() -> (Dataset, Vec<f64>) {
        let sectors = ["nunoa", "vitacura", "las condes", "providencia"];
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..60 {
            let sector = sectors[i % sectors.len()];
            let area = 40.0 + (i * 7 % 150) as f64;
            rows.push(vec![Value::from(sector), Value::from(area)]);
            y.push(1000.0 + 25.0 * area + 500.0 * (i % sectors.len()) as f64);
        }
        (
            Dataset::new(vec!["sector".into(), "net_area".into()], rows).unwrap(),
            y,
        )
    }

    fn pipeline() -> ModelPipeline {
        let pre = build_preprocessor(&["sector"], EncoderParams::default()).unwrap();
        build_pipeline(
            pre,
            BoostingParams {
                learning_rate: 0.1,
                n_estimators: 40,
                max_depth: 3,
                ..BoostingParams::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_fit_then_predict() {
        let (x, y) = dataset();
        let mut model = pipeline();
        assert!(!model.is_fitted());

        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted());
        assert_eq!(
            model.feature_columns().unwrap(),
            &["sector".to_string(), "net_area".to_string()]
        );

        let preds = model.predict(&x).unwrap();
        assert_eq!(preds.len(), x.len());
        assert!(preds.iter().all(|p| p.is_finite() && *p > 0.0));
    }

    #[test]
    fn test_failed_fit_leaves_pipeline_unfit() {
        let (x, _) = dataset();
        let mut model = pipeline();
        assert!(model.fit(&x, &[1.0, 2.0]).is_err());
        assert!(!model.is_fitted());
        assert_eq!(model, pipeline());
    }

    #[test]
    fn test_rejects_already_fitted_preprocessor() {
        let (x, y) = dataset();
        let mut pre = build_preprocessor(&["sector"], EncoderParams::default()).unwrap();
        pre.fit(&x, &y).unwrap();
        assert!(matches!(
            build_pipeline(pre, BoostingParams::default()).unwrap_err(),
            PredictorError::Configuration(_)
        ));
    }

    #[test]
    fn test_invalid_hyperparameters_fail_at_build() {
        let pre = build_preprocessor(&["sector"], EncoderParams::default()).unwrap();
        let params = BoostingParams {
            learning_rate: -1.0,
            ..BoostingParams::default()
        };
        assert!(build_pipeline(pre, params).is_err());
    }
}
