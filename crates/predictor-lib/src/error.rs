//! Error taxonomy for the prediction core
//!
//! Every fallible operation in the library returns [`PredictorError`]. Callers
//! branch on [`PredictorError::kind`] instead of matching message text.

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PredictorError>;

/// Errors produced by data loading, training and inference
#[derive(Error, Debug)]
pub enum PredictorError {
    /// Bad or missing configuration, unsupported source type
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A required file or artifact does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Dataset content is unparseable or empty
    #[error("data format error: {0}")]
    DataFormat(String),

    /// Schema, shape or null violations on otherwise-present data
    #[error("validation error: {0}")]
    Validation(String),

    /// The underlying fit procedure failed
    #[error("training failed: {0}")]
    Training(String),

    /// The underlying inference procedure failed
    #[error("prediction failed: {0}")]
    Prediction(String),

    /// Serving requested before a model was successfully loaded
    #[error("model not available")]
    ServiceUnavailable,

    /// An inference request lacks required feature columns
    #[error("missing required features: {}", .missing.join(", "))]
    BadRequest { missing: Vec<String> },

    /// Invariant violation: count mismatch, non-finite result, corrupted artifact
    #[error("internal error: {0}")]
    Internal(String),
}

/// Discriminant of [`PredictorError`], cheap to copy and compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    NotFound,
    DataFormat,
    Validation,
    Training,
    Prediction,
    ServiceUnavailable,
    BadRequest,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::NotFound => "not_found",
            ErrorKind::DataFormat => "data_format",
            ErrorKind::Validation => "validation",
            ErrorKind::Training => "training",
            ErrorKind::Prediction => "prediction",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Internal => "internal",
        }
    }
}

impl PredictorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictorError::Configuration(_) => ErrorKind::Configuration,
            PredictorError::NotFound(_) => ErrorKind::NotFound,
            PredictorError::DataFormat(_) => ErrorKind::DataFormat,
            PredictorError::Validation(_) => ErrorKind::Validation,
            PredictorError::Training(_) => ErrorKind::Training,
            PredictorError::Prediction(_) => ErrorKind::Prediction,
            PredictorError::ServiceUnavailable => ErrorKind::ServiceUnavailable,
            PredictorError::BadRequest { .. } => ErrorKind::BadRequest,
            PredictorError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_lists_missing_columns() {
        let err = PredictorError::BadRequest {
            missing: vec!["net_area".to_string(), "latitude".to_string()],
        };
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(
            err.to_string(),
            "missing required features: net_area, latitude"
        );
    }

    #[test]
    fn test_service_unavailable_kind() {
        let err = PredictorError::ServiceUnavailable;
        assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
        assert_eq!(err.kind().as_str(), "service_unavailable");
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ServiceUnavailable).unwrap();
        assert_eq!(json, "\"service_unavailable\"");
    }
}
