//! API client for a running price server

use anyhow::{Context, Result};
use predictor_lib::HealthResponse;
use reqwest::Client;
use url::Url;

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Fetch `/health`. An unhealthy server answers 503 with the same body,
    /// so both statuses are decoded.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("health").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !(status.is_success() || status == reqwest::StatusCode::SERVICE_UNAVAILABLE) {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_decodes_healthy_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"healthy","model_loaded":true,"model_version":"0123456789ab","timestamp":"2024-01-15T10:30:00Z"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();
        assert!(health.is_healthy());
        assert_eq!(health.model_version.as_deref(), Some("0123456789ab"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_decodes_unavailable_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"unhealthy","model_loaded":false,"timestamp":"2024-01-15T10:30:00Z"}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let health = client.health().await.unwrap();
        assert!(!health.model_loaded);
        assert!(health.model_version.is_none());
    }

    #[tokio::test]
    async fn test_other_errors_are_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
