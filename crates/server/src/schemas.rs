//! Request and response bodies

use predictor_lib::{FeatureRow, Value};
use serde::{Deserialize, Serialize};

/// Property kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Casa,
    Departamento,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Casa => "casa",
            PropertyType::Departamento => "departamento",
        }
    }
}

/// Santiago sectors covered by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "la reina")]
    LaReina,
    #[serde(rename = "las condes")]
    LasCondes,
    #[serde(rename = "lo barnechea")]
    LoBarnechea,
    #[serde(rename = "nunoa")]
    Nunoa,
    #[serde(rename = "providencia")]
    Providencia,
    #[serde(rename = "vitacura")]
    Vitacura,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::LaReina => "la reina",
            Sector::LasCondes => "las condes",
            Sector::LoBarnechea => "lo barnechea",
            Sector::Nunoa => "nunoa",
            Sector::Providencia => "providencia",
            Sector::Vitacura => "vitacura",
        }
    }
}

/// Body of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub sector: Sector,
    pub net_usable_area: f64,
    pub net_area: f64,
    pub n_rooms: f64,
    pub n_bathroom: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl PredictionRequest {
    /// Range checks serde cannot express. Returns every violation.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("net_usable_area", self.net_usable_area),
            ("net_area", self.net_area),
        ] {
            if !(value.is_finite() && value > 0.0) {
                errors.push(format!("{} must be greater than 0", name));
            }
        }
        for (name, value) in [("n_rooms", self.n_rooms), ("n_bathroom", self.n_bathroom)] {
            if !(value.is_finite() && value >= 0.0) {
                errors.push(format!("{} must be greater than or equal to 0", name));
            }
        }
        for (name, value) in [("latitude", self.latitude), ("longitude", self.longitude)] {
            if !value.is_finite() {
                errors.push(format!("{} must be a finite number", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Keyed row handed to the model manager
    pub fn to_feature_row(&self) -> FeatureRow {
        FeatureRow::from([
            ("type".to_string(), Value::from(self.property_type.as_str())),
            ("sector".to_string(), Value::from(self.sector.as_str())),
            ("net_usable_area".to_string(), Value::from(self.net_usable_area)),
            ("net_area".to_string(), Value::from(self.net_area)),
            ("n_rooms".to_string(), Value::from(self.n_rooms)),
            ("n_bathroom".to_string(), Value::from(self.n_bathroom)),
            ("latitude".to_string(), Value::from(self.latitude)),
            ("longitude".to_string(), Value::from(self.longitude)),
        ])
    }
}

/// Body of a successful prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_price: f64,
    pub status: String,
    pub model_version: String,
}

impl PredictionResponse {
    pub fn success(predicted_price: f64, model_version: impl Into<String>) -> Self {
        Self {
            predicted_price,
            status: "success".to_string(),
            model_version: model_version.into(),
        }
    }
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Body of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
}
