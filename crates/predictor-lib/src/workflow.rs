//! End-to-end training and evaluation runs
//!
//! Wires data loading, feature selection, preprocessing, fitting, hold-out
//! evaluation and artifact persistence into the batch flows the CLI runs.

use crate::artifact::{self, ArtifactInfo, DEFAULT_MODEL_PATH};
use crate::data::{create_data_source, SourceSettings};
use crate::error::{PredictorError, Result};
use crate::evaluator::evaluate;
use crate::features::{select_feature_columns, DEFAULT_CATEGORICAL_COLUMNS, DEFAULT_TARGET_COLUMN};
use crate::gbm::{BoostingParams, DEFAULT_RANDOM_SEED};
use crate::models::{Dataset, MetricsReport};
use crate::observability::StructuredLogger;
use crate::pipeline::build_pipeline;
use crate::predictor::predict_many;
use crate::preprocess::{build_preprocessor, EncoderParams};
use crate::trainer::train;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Everything a training run reads from configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingSettings {
    /// Seeds tree construction and subsampling; overrides `model.random_seed`
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    #[serde(default)]
    pub source: SourceSettings,

    #[serde(default = "default_categorical_columns")]
    pub categorical_columns: Vec<String>,

    #[serde(default = "default_target_column")]
    pub target_column: String,

    #[serde(default)]
    pub model: BoostingParams,

    #[serde(default)]
    pub encoder: EncoderParams,

    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
}

fn default_random_seed() -> u64 {
    DEFAULT_RANDOM_SEED
}

fn default_categorical_columns() -> Vec<String> {
    DEFAULT_CATEGORICAL_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_target_column() -> String {
    DEFAULT_TARGET_COLUMN.to_string()
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            random_seed: default_random_seed(),
            source: SourceSettings::default(),
            categorical_columns: default_categorical_columns(),
            target_column: default_target_column(),
            model: BoostingParams::default(),
            encoder: EncoderParams::default(),
            model_path: default_model_path(),
        }
    }
}

impl TrainingSettings {
    /// Boosting parameters with the run-level seed applied
    pub fn boosting_params(&self) -> BoostingParams {
        BoostingParams {
            random_seed: self.random_seed,
            ..self.model
        }
    }
}

/// Result of a completed training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub metrics: MetricsReport,
    pub feature_columns: Vec<String>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub artifact: ArtifactInfo,
    pub model_path: PathBuf,
    pub duration_secs: f64,
}

/// Result of re-scoring a stored model
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub metrics: MetricsReport,
    pub test_rows: usize,
    pub model_version: String,
}

/// Train on the configured source, score on its test split and persist the model
pub fn run_training(settings: &TrainingSettings) -> Result<TrainingOutcome> {
    let logger = StructuredLogger::new("pricectl");
    let start = Instant::now();

    let source = create_data_source(&settings.source)?;
    info!(source = source.kind(), "Loading training data");
    let (train_set, test_set) = source.load_training_data()?;

    let feature_columns = model_features(&train_set, &settings.target_column)?;
    info!(features = ?feature_columns, "Selected feature columns");

    let (x_train, y_train) = split_xy(&train_set, &feature_columns, &settings.target_column)?;
    let (x_test, y_test) = split_xy(&test_set, &feature_columns, &settings.target_column)?;
    let y_test = require_targets(y_test, "test")?;

    let preprocessor = build_preprocessor(&settings.categorical_columns, settings.encoder)?;
    let mut pipeline = build_pipeline(preprocessor, settings.boosting_params())?;
    train(&mut pipeline, &x_train, &y_train)?;

    let predictions = predict_many(&pipeline, &x_test)?;
    let metrics = evaluate(&predictions, &y_test)?;
    logger.log_metrics(&metrics, x_test.len());

    let info = artifact::save(&pipeline, &feature_columns, &settings.model_path)?;
    let duration_secs = start.elapsed().as_secs_f64();
    logger.log_training_completed(
        x_train.len(),
        feature_columns.len(),
        duration_secs,
        &info.version,
    );

    Ok(TrainingOutcome {
        metrics,
        feature_columns,
        train_rows: x_train.len(),
        test_rows: x_test.len(),
        artifact: info,
        model_path: settings.model_path.clone(),
        duration_secs,
    })
}

/// Score the stored model against the configured test split
pub fn run_evaluation(settings: &TrainingSettings) -> Result<EvaluationOutcome> {
    let logger = StructuredLogger::new("pricectl");
    let (stored, info) = artifact::load(&settings.model_path)?;

    let source = create_data_source(&settings.source)?;
    let (_, test_set) = source.load_training_data()?;

    let (x_test, y_test) =
        split_xy(&test_set, &stored.feature_columns, &settings.target_column)?;
    let y_test = require_targets(y_test, "test")?;

    let predictions = predict_many(&stored.model, &x_test)?;
    let metrics = evaluate(&predictions, &y_test)?;
    logger.log_metrics(&metrics, x_test.len());

    Ok(EvaluationOutcome {
        metrics,
        test_rows: x_test.len(),
        model_version: info.version,
    })
}

/// Feature manifest for a dataset. The configured target column is never a
/// feature, even when the selector's fixed exclusion set lets it through.
fn model_features(dataset: &Dataset, target_column: &str) -> Result<Vec<String>> {
    let mut columns = select_feature_columns(dataset.columns())?;
    if let Some(pos) = columns.iter().position(|c| c == target_column) {
        warn!(
            column = %target_column,
            "Target column passed the id/target exclusion set; deliberately dropping it \
             from the manifest instead of training on it"
        );
        columns.remove(pos);
    }
    if columns.is_empty() {
        return Err(PredictorError::Validation(
            "no feature columns remain after excluding the target".to_string(),
        ));
    }
    Ok(columns)
}

fn split_xy(
    dataset: &Dataset,
    features: &[String],
    target_column: &str,
) -> Result<(Dataset, Vec<Option<f64>>)> {
    Ok((dataset.select(features)?, dataset.target(target_column)?))
}

fn require_targets(targets: Vec<Option<f64>>, split: &str) -> Result<Vec<f64>> {
    let missing = targets.iter().filter(|t| t.is_none()).count();
    if missing > 0 {
        return Err(PredictorError::Validation(format!(
            "{} split has {} rows with a missing target",
            split, missing
        )));
    }
    Ok(targets.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Estimator;
    use std::fmt::Write as _;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const HEADER: &str =
        "id,type,sector,net_usable_area,net_area,n_rooms,n_bathroom,latitude,longitude,price";
    const SECTORS: &[&str] = &["las condes", "vitacura", "nunoa", "providencia", "la reina"];

    fn write_csv(path: &Path, rows: usize, offset: usize) {
        let mut body = String::from(HEADER);
        body.push('\n');
        for i in offset..offset + rows {
            let kind = if i % 3 == 0 { "casa" } else { "departamento" };
            let sector = SECTORS[i % SECTORS.len()];
            let usable = 40.0 + (i * 13 % 160) as f64;
            let net = usable * 1.2;
            let rooms = 1 + i % 4;
            let baths = 1 + i % 3;
            let price = 1500.0
                + 45.0 * usable
                + if kind == "casa" { 2500.0 } else { 0.0 }
                + 800.0 * (i % SECTORS.len()) as f64;
            writeln!(
                body,
                "{},{},{},{},{},{},{},{:.4},{:.4},{}",
                i,
                kind,
                sector,
                usable,
                net,
                rooms,
                baths,
                -33.40 - (i % 10) as f64 * 0.01,
                -70.55 - (i % 7) as f64 * 0.01,
                price
            )
            .unwrap();
        }
        fs::write(path, body).unwrap();
    }

    fn settings(dir: &TempDir) -> TrainingSettings {
        let train_path = dir.path().join("train.csv");
        let test_path = dir.path().join("test.csv");
        write_csv(&train_path, 120, 0);
        write_csv(&test_path, 30, 500);

        TrainingSettings {
            source: SourceSettings {
                train_path,
                test_path,
                ..SourceSettings::default()
            },
            model: BoostingParams {
                learning_rate: 0.1,
                n_estimators: 40,
                max_depth: 3,
                ..BoostingParams::default()
            },
            model_path: dir.path().join("models").join("property_model.bin"),
            ..TrainingSettings::default()
        }
    }

    #[test]
    fn test_defaults() {
        let settings = TrainingSettings::default();
        assert_eq!(settings.random_seed, 42);
        assert_eq!(settings.categorical_columns, vec!["type", "sector"]);
        assert_eq!(settings.target_column, "price");
        assert_eq!(settings.model_path, PathBuf::from("models/property_model.bin"));
        assert_eq!(settings.model.n_estimators, 300);
    }

    #[test]
    fn test_run_level_seed_overrides_model_seed() {
        let settings = TrainingSettings {
            random_seed: 7,
            ..TrainingSettings::default()
        };
        assert_eq!(settings.boosting_params().random_seed, 7);
    }

    #[test]
    fn test_training_run_persists_model_without_target_feature() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);

        let outcome = run_training(&settings).unwrap();
        assert_eq!(outcome.train_rows, 120);
        assert_eq!(outcome.test_rows, 30);
        assert!(!outcome.feature_columns.contains(&"price".to_string()));
        assert!(!outcome.feature_columns.contains(&"id".to_string()));
        assert_eq!(outcome.feature_columns[0], "type");
        assert!(outcome.metrics.rmse.is_finite());
        assert!(outcome.metrics.mape < 1.0);
        assert!(settings.model_path.exists());
    }

    #[test]
    fn test_fixed_seed_gives_identical_metrics() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.model.subsample = 0.8;

        let first = run_training(&settings).unwrap();
        let second = run_training(&settings).unwrap();
        assert_eq!(first.metrics.rmse.to_bits(), second.metrics.rmse.to_bits());
        assert_eq!(first.metrics.mae.to_bits(), second.metrics.mae.to_bits());
        assert_eq!(first.metrics.mape.to_bits(), second.metrics.mape.to_bits());
        assert_eq!(first.artifact.checksum, second.artifact.checksum);
    }

    #[test]
    fn test_reloaded_model_predicts_identically() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        run_training(&settings).unwrap();

        let (stored, _) = artifact::load(&settings.model_path).unwrap();
        let test_set = crate::data::FileSource::new(
            &settings.source.train_path,
            &settings.source.test_path,
        )
        .load_training_data()
        .unwrap()
        .1;
        let x = test_set.select(&stored.feature_columns).unwrap();

        let reloaded = stored.model.predict(&x).unwrap();
        let evaluation = run_evaluation(&settings).unwrap();
        let y: Vec<f64> = test_set.target("price").unwrap().into_iter().flatten().collect();
        let expected = crate::evaluator::calculate_metrics(&reloaded, &y).unwrap();
        assert_eq!(evaluation.metrics, expected);
    }

    #[test]
    fn test_missing_training_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        settings.source.train_path = dir.path().join("nope.csv");

        assert!(matches!(
            run_training(&settings).unwrap_err(),
            PredictorError::NotFound(_)
        ));
        assert!(!settings.model_path.exists());
    }

    #[test]
    fn test_evaluation_without_model_is_not_found() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        assert!(matches!(
            run_evaluation(&settings).unwrap_err(),
            PredictorError::NotFound(_)
        ));
    }
}
