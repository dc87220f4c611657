//! Health reporting for the prediction service

use crate::serving::{ModelManager, ModelState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// A model is loaded and predictions can be served
    Healthy,
    /// The service is up but has no model
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl From<ModelState> for HealthStatus {
    fn from(state: ModelState) -> Self {
        match state {
            ModelState::Loaded => HealthStatus::Healthy,
            ModelState::Unloaded => HealthStatus::Unhealthy,
        }
    }
}

/// Health check payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub model_loaded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn from_manager(manager: &ModelManager) -> Self {
        let state = manager.health();
        Self {
            status: state.into(),
            model_loaded: state == ModelState::Loaded,
            model_version: manager.model_version().map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
