//! Observability for the price predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction and error counts, loaded model info)
//! - Structured logging of lifecycle events with tracing

use crate::models::MetricsReport;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PredictorMetricsInner> = OnceLock::new();

struct PredictorMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounterVec,
    model_loaded: IntGauge,
    model_features: IntGauge,
    model_version_info: GaugeVec,
}

impl PredictorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "price_predictor_prediction_latency_seconds",
                "Time spent producing a single price prediction",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "price_predictor_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "price_predictor_prediction_errors_total",
                "Total number of failed prediction requests by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_loaded: register_int_gauge!(
                "price_predictor_model_loaded",
                "Whether a model is loaded (1) or not (0)"
            )
            .expect("Failed to register model_loaded"),

            model_features: register_int_gauge!(
                "price_predictor_model_features",
                "Number of feature columns expected by the loaded model"
            )
            .expect("Failed to register model_features"),

            model_version_info: register_gauge_vec!(
                "price_predictor_model_version_info",
                "Information about the currently loaded model",
                &["version"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct PredictorMetrics {
    _private: (),
}

impl Default for PredictorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PredictorMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictorMetrics").finish()
    }
}

impl PredictorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PredictorMetricsInner {
        GLOBAL_METRICS.get_or_init(PredictorMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Record a freshly loaded model
    pub fn set_model_loaded(&self, version: &str, feature_count: usize) {
        let inner = self.inner();
        inner.model_loaded.set(1);
        inner.model_features.set(feature_count as i64);
        inner.model_version_info.reset();
        inner
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }

    pub fn set_model_unloaded(&self) {
        let inner = self.inner();
        inner.model_loaded.set(0);
        inner.model_features.set(0);
        inner.model_version_info.reset();
    }
}

/// Structured logger for lifecycle events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, port: u16, model_loaded: bool) {
        info!(
            event = "server_started",
            service = %self.service,
            version = %version,
            port = port,
            model_loaded = model_loaded,
            "Price prediction service started"
        );
    }

    pub fn log_model_loaded(&self, path: &str, model_version: &str, features: usize) {
        info!(
            event = "model_loaded",
            service = %self.service,
            path = %path,
            model_version = %model_version,
            features = features,
            "Model loaded"
        );
    }

    pub fn log_model_load_failed(&self, path: &str, error: &str) {
        warn!(
            event = "model_load_failed",
            service = %self.service,
            path = %path,
            error = %error,
            "Model could not be loaded, serving without a model"
        );
    }

    pub fn log_prediction(&self, model_version: &str, predicted_price: f64, latency_ms: f64) {
        info!(
            event = "prediction_served",
            service = %self.service,
            model_version = %model_version,
            predicted_price = predicted_price,
            latency_ms = latency_ms,
            "Prediction served"
        );
    }

    pub fn log_training_completed(
        &self,
        train_rows: usize,
        features: usize,
        duration_secs: f64,
        model_version: &str,
    ) {
        info!(
            event = "training_completed",
            service = %self.service,
            train_rows = train_rows,
            features = features,
            duration_secs = duration_secs,
            model_version = %model_version,
            "Model training completed"
        );
    }

    pub fn log_metrics(&self, report: &MetricsReport, test_rows: usize) {
        info!(
            event = "metrics_reported",
            service = %self.service,
            rmse = report.rmse,
            mape = report.mape,
            mae = report.mae,
            test_rows = test_rows,
            "Model evaluation metrics"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            service = %self.service,
            reason = %reason,
            "Price prediction service shutting down"
        );
    }
}
