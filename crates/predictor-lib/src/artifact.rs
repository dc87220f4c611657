//! On-disk model artifacts
//!
//! An artifact holds the fitted pipeline and the ordered feature manifest the
//! pipeline was trained on. It is written as a bincode envelope carrying a
//! format version, creation time and SHA-256 checksum of the payload.

use crate::error::{PredictorError, Result};
use crate::pipeline::{Estimator, ModelPipeline};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Bumped whenever the payload layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Default artifact location, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "models/property_model.bin";

/// Hex characters of the checksum used as the model version
const VERSION_LEN: usize = 12;

/// Fitted pipeline plus the feature columns it expects, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: ModelPipeline,
    pub feature_columns: Vec<String>,
}

/// Metadata about a stored artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub version: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    created_at: DateTime<Utc>,
    checksum: String,
    payload: Vec<u8>,
}

/// Persist a fitted pipeline and its feature manifest to `path`.
///
/// Parent directories are created as needed. The file is written to a
/// temporary sibling and renamed into place.
pub fn save(model: &ModelPipeline, feature_columns: &[String], path: &Path) -> Result<ArtifactInfo> {
    if !model.is_fitted() {
        return Err(PredictorError::Validation(
            "refusing to save an unfitted pipeline".to_string(),
        ));
    }
    if feature_columns.is_empty() {
        return Err(PredictorError::Validation(
            "feature manifest is empty".to_string(),
        ));
    }

    let artifact = ModelArtifact {
        model: model.clone(),
        feature_columns: feature_columns.to_vec(),
    };
    let payload = bincode::serialize(&artifact)
        .map_err(|e| PredictorError::Internal(format!("failed to encode model: {}", e)))?;
    let checksum = compute_checksum(&payload);
    let created_at = Utc::now();

    let bytes = bincode::serialize(&Envelope {
        format_version: ARTIFACT_FORMAT_VERSION,
        created_at,
        checksum: checksum.clone(),
        payload,
    })
    .map_err(|e| PredictorError::Internal(format!("failed to encode artifact: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            PredictorError::Internal(format!("failed to create {}: {}", parent.display(), e))
        })?;
    }
    write_atomic(path, &bytes)?;

    let info = ArtifactInfo {
        version: version_of(&checksum),
        checksum,
        created_at,
        size_bytes: bytes.len() as u64,
    };
    info!(
        path = %path.display(),
        version = %info.version,
        size_bytes = info.size_bytes,
        features = feature_columns.len(),
        "Model artifact saved"
    );
    Ok(info)
}

/// Read and verify an artifact.
///
/// A missing file is [`PredictorError::NotFound`]. Any other problem (bad
/// encoding, unknown format version, checksum mismatch, an unfitted pipeline
/// or an empty manifest) is [`PredictorError::Internal`].
pub fn load(path: &Path) -> Result<(ModelArtifact, ArtifactInfo)> {
    if !path.exists() {
        return Err(PredictorError::NotFound(format!(
            "model artifact not found at {}",
            path.display()
        )));
    }

    let bytes = fs::read(path).map_err(|e| {
        PredictorError::Internal(format!("failed to read {}: {}", path.display(), e))
    })?;
    let envelope: Envelope = bincode::deserialize(&bytes).map_err(|e| {
        PredictorError::Internal(format!("corrupted model artifact {}: {}", path.display(), e))
    })?;

    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(PredictorError::Internal(format!(
            "unsupported artifact format version {} (expected {})",
            envelope.format_version, ARTIFACT_FORMAT_VERSION
        )));
    }

    let computed = compute_checksum(&envelope.payload);
    if computed != envelope.checksum {
        warn!(
            expected = %envelope.checksum,
            computed = %computed,
            "Model artifact checksum mismatch"
        );
        return Err(PredictorError::Internal(format!(
            "checksum mismatch: expected {}, got {}",
            envelope.checksum, computed
        )));
    }

    let artifact: ModelArtifact = bincode::deserialize(&envelope.payload)
        .map_err(|e| PredictorError::Internal(format!("corrupted model payload: {}", e)))?;
    validate(&artifact)?;

    let info = ArtifactInfo {
        version: version_of(&envelope.checksum),
        checksum: envelope.checksum,
        created_at: envelope.created_at,
        size_bytes: bytes.len() as u64,
    };
    info!(
        path = %path.display(),
        version = %info.version,
        features = artifact.feature_columns.len(),
        "Model artifact loaded"
    );
    Ok((artifact, info))
}

fn validate(artifact: &ModelArtifact) -> Result<()> {
    if !artifact.model.is_fitted() {
        return Err(PredictorError::Internal(
            "artifact pipeline has no fitted predictor".to_string(),
        ));
    }
    if artifact.feature_columns.is_empty() {
        return Err(PredictorError::Internal(
            "artifact feature manifest is empty".to_string(),
        ));
    }
    if artifact.model.feature_columns() != Some(artifact.feature_columns.as_slice()) {
        return Err(PredictorError::Internal(
            "artifact feature manifest does not match the pipeline inputs".to_string(),
        ));
    }
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let io_err = |e: std::io::Error| {
        PredictorError::Internal(format!("failed to write {}: {}", temp_path.display(), e))
    };

    let mut file = File::create(&temp_path).map_err(io_err)?;
    let written = file
        .write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(io_err)
        .and_then(|_| {
            fs::rename(&temp_path, path).map_err(|e| {
                PredictorError::Internal(format!(
                    "failed to rename {} to {}: {}",
                    temp_path.display(),
                    path.display(),
                    e
                ))
            })
        });

    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

/// SHA-256 of `data` as lowercase hex
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn version_of(checksum: &str) -> String {
    checksum.chars().take(VERSION_LEN).collect()
}
