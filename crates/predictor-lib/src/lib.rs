//! Property price prediction library
//!
//! This crate provides the core functionality for:
//! - Loading train/test datasets from CSV files or SQL queries
//! - Target-encoding categorical features
//! - Gradient-boosted regression trees
//! - Training, evaluation and model artifact persistence
//! - The serving-side model lifecycle, health checks and observability

pub mod artifact;
pub mod data;
pub mod error;
pub mod evaluator;
pub mod features;
pub mod gbm;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod preprocess;
pub mod serving;
pub mod trainer;
pub mod workflow;

pub use error::{ErrorKind, PredictorError, Result};
pub use health::{HealthResponse, HealthStatus};
pub use models::*;
pub use observability::{PredictorMetrics, StructuredLogger};
pub use pipeline::{build_pipeline, Estimator, ModelPipeline};
pub use serving::{ModelManager, ModelState, Prediction};
pub use workflow::{run_evaluation, run_training, TrainingSettings};
