//! API key authentication for prediction requests

use crate::api::{ApiError, AppState};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

/// Header carrying the client's key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Why a request was not authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No key in the request
    Missing,
    /// Key present but wrong
    Invalid,
    /// The server has no key configured
    NotConfigured,
}

/// Check a provided key against the configured one.
///
/// Keys are compared through their SHA-256 digests so the comparison time
/// does not depend on where the keys first differ.
pub fn verify_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AuthError> {
    let provided = provided.filter(|k| !k.is_empty()).ok_or(AuthError::Missing)?;
    let expected = expected.filter(|k| !k.is_empty()).ok_or(AuthError::NotConfigured)?;

    let a = Sha256::digest(provided.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    let diff = a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y));

    if diff == 0 {
        Ok(())
    } else {
        Err(AuthError::Invalid)
    }
}

/// Middleware rejecting requests without a valid `X-API-Key`
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verify_api_key(state.api_key.as_deref(), provided) {
        warn!(reason = ?e, path = %request.uri().path(), "Authentication failed");
        return Err(ApiError::Auth(e));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_key_is_accepted() {
        assert_eq!(verify_api_key(Some("s3cret"), Some("s3cret")), Ok(()));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        assert_eq!(
            verify_api_key(Some("s3cret"), Some("s3cret!")),
            Err(AuthError::Invalid)
        );
    }

    #[test]
    fn test_missing_key_checked_before_configuration() {
        assert_eq!(verify_api_key(None, None), Err(AuthError::Missing));
        assert_eq!(verify_api_key(Some("k"), Some("")), Err(AuthError::Missing));
    }

    #[test]
    fn test_unconfigured_server() {
        assert_eq!(
            verify_api_key(None, Some("anything")),
            Err(AuthError::NotConfigured)
        );
    }
}
