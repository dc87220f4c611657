//! Serving-side model lifecycle
//!
//! A [`ModelManager`] starts [`ModelState::Unloaded`], attempts a single
//! [`load`](ModelManager::load) at startup and then serves predictions
//! through a shared reference. Loading needs `&mut self`, so a manager placed
//! behind an `Arc` can no longer change state.

use crate::artifact::{self, ArtifactInfo, ModelArtifact};
use crate::error::{PredictorError, Result};
use crate::models::{Dataset, FeatureRow};
use crate::observability::{PredictorMetrics, StructuredLogger};
use crate::predictor::predict_many;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Whether a model is available for serving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelState {
    Unloaded,
    Loaded,
}

/// A single served prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_price: f64,
    pub model_version: String,
}

#[derive(Debug)]
struct LoadedModel {
    artifact: ModelArtifact,
    info: ArtifactInfo,
}

/// Owns the loaded artifact and turns request rows into prices
#[derive(Debug)]
pub struct ModelManager {
    model_path: PathBuf,
    loaded: Option<LoadedModel>,
    metrics: PredictorMetrics,
    logger: StructuredLogger,
}

impl ModelManager {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            loaded: None,
            metrics: PredictorMetrics::new(),
            logger: StructuredLogger::new("price-server"),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Load the artifact from the configured path.
    ///
    /// On failure the manager keeps its current state and the error is
    /// returned for the caller to report.
    pub fn load(&mut self) -> Result<()> {
        let path = self.model_path.display().to_string();
        match artifact::load(&self.model_path) {
            Ok((artifact, info)) => {
                self.metrics
                    .set_model_loaded(&info.version, artifact.feature_columns.len());
                self.logger
                    .log_model_loaded(&path, &info.version, artifact.feature_columns.len());
                self.loaded = Some(LoadedModel { artifact, info });
                Ok(())
            }
            Err(e) => {
                if self.loaded.is_none() {
                    self.metrics.set_model_unloaded();
                }
                self.logger.log_model_load_failed(&path, &e.to_string());
                Err(e)
            }
        }
    }

    pub fn health(&self) -> ModelState {
        if self.loaded.is_some() {
            ModelState::Loaded
        } else {
            ModelState::Unloaded
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn model_info(&self) -> Option<&ArtifactInfo> {
        self.loaded.as_ref().map(|m| &m.info)
    }

    pub fn model_version(&self) -> Option<&str> {
        self.model_info().map(|i| i.version.as_str())
    }

    /// Feature columns the loaded model expects, in order
    pub fn feature_columns(&self) -> Option<&[String]> {
        self.loaded
            .as_ref()
            .map(|m| m.artifact.feature_columns.as_slice())
    }

    /// Predict the price of one property.
    ///
    /// The row is reordered to the model's feature manifest; extra keys are
    /// ignored and absent ones are reported together as
    /// [`PredictorError::BadRequest`].
    pub fn predict(&self, row: &FeatureRow) -> Result<Prediction> {
        let start = Instant::now();
        let result = self.predict_inner(row);
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(prediction) => {
                self.metrics.observe_prediction_latency(elapsed);
                self.metrics.inc_predictions();
                self.logger.log_prediction(
                    &prediction.model_version,
                    prediction.predicted_price,
                    elapsed * 1000.0,
                );
            }
            Err(e) => {
                self.metrics.inc_prediction_errors(e.kind().as_str());
            }
        }
        result
    }

    fn predict_inner(&self, row: &FeatureRow) -> Result<Prediction> {
        let loaded = self
            .loaded
            .as_ref()
            .ok_or(PredictorError::ServiceUnavailable)?;

        let rows = Dataset::from_feature_rows(
            &loaded.artifact.feature_columns,
            std::slice::from_ref(row),
        )?;
        let predicted_price = predict_many(&loaded.artifact.model, &rows)?
            .into_iter()
            .next()
            .ok_or_else(|| PredictorError::Internal("empty prediction result".to_string()))?;

        if !predicted_price.is_finite() || predicted_price <= 0.0 {
            return Err(PredictorError::Internal(format!(
                "model produced an invalid price: {}",
                predicted_price
            )));
        }

        Ok(Prediction {
            predicted_price,
            model_version: loaded.info.version.clone(),
        })
    }
}
