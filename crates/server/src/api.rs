//! HTTP API: prediction, health checks and Prometheus metrics

use crate::auth::{require_api_key, AuthError};
use crate::schemas::{ErrorResponse, PredictionRequest, PredictionResponse, ServiceInfo};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor_lib::{HealthResponse, ModelManager, PredictorError};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tracing::{error, info, warn};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
pub struct AppState {
    pub manager: ModelManager,
    pub api_key: Option<String>,
}

impl AppState {
    /// `manager` must already have attempted its startup load
    pub fn new(manager: ModelManager, api_key: Option<String>) -> Self {
        Self { manager, api_key }
    }
}

/// Failures surfaced to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    InvalidBody(Vec<String>),
    Predictor(PredictorError),
}

impl From<PredictorError> for ApiError {
    fn from(err: PredictorError) -> Self {
        ApiError::Predictor(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail, errors) = match self {
            ApiError::Auth(AuthError::Missing) => (
                StatusCode::UNAUTHORIZED,
                "API key required in X-API-Key header".to_string(),
                vec![],
            ),
            ApiError::Auth(AuthError::Invalid) => (
                StatusCode::UNAUTHORIZED,
                "Invalid API key".to_string(),
                vec![],
            ),
            ApiError::Auth(AuthError::NotConfigured) => {
                error!("No API key configured, rejecting authenticated request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Authentication service temporarily unavailable".to_string(),
                    vec![],
                )
            }
            ApiError::InvalidBody(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid request body".to_string(),
                errors,
            ),
            ApiError::Predictor(err) => match err {
                PredictorError::ServiceUnavailable => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Model not available".to_string(),
                    vec![],
                ),
                PredictorError::BadRequest { .. } | PredictorError::Validation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string(), vec![])
                }
                other => {
                    error!(error = %other, kind = other.kind().as_str(), "Prediction error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Prediction failed".to_string(),
                        vec![],
                    )
                }
            },
        };

        let mut response = (status, Json(ErrorResponse { detail, errors })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("ApiKey"));
        }
        response
    }
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Property price prediction API".to_string(),
        version: SERVICE_VERSION.to_string(),
    })
}

/// Health check response - returns 200 if a model is loaded, 503 otherwise
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = HealthResponse::from_manager(&state.manager);

    let status_code = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected prediction request body");
        ApiError::InvalidBody(vec![rejection.body_text()])
    })?;
    request.validate().map_err(ApiError::InvalidBody)?;

    info!(
        property_type = request.property_type.as_str(),
        sector = request.sector.as_str(),
        "Prediction request received"
    );

    let prediction = state.manager.predict(&request.to_feature_row())?;
    Ok(Json(PredictionResponse::success(
        prediction.predicted_price,
        prediction.model_version,
    )))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/predict", post(predict))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(protected)
        .with_state(state)
}

/// Serve the API until `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
