//! Model persistence.
//!
//! The fitted model is stored together with the encoder that produced its
//! input matrix, so a loaded artifact can score raw tables on its own.
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Hyperparameters;
use crate::error::{PipelineError, Result};
use crate::models::{ClassifierModel, LogisticRegression};
use crate::preprocessing::{FeatureEncoder, FeatureTable};

pub const MODEL_FILE_NAME: &str = "model.json";
const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub label: String,
    pub feature_names: Vec<String>,
    pub hyperparameters: Hyperparameters,
    pub encoder: FeatureEncoder,
    pub model: LogisticRegression,
}

impl ModelArtifact {
    pub fn new(
        label: &str,
        hyperparameters: Hyperparameters,
        encoder: FeatureEncoder,
        model: LogisticRegression,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            label: label.to_string(),
            feature_names: encoder.feature_names(),
            hyperparameters,
            encoder,
            model,
        }
    }

    /// Encode `table` with the stored encoder and predict 0/1 labels.
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<u8>> {
        let x = self.encoder.transform(table)?;
        self.model.predict(&x)
    }
}

/// Serialize `artifact` to `<dir>/model.json`, replacing any previous file.
/// The JSON is written to a sibling temp file first and renamed into place.
pub fn save_model<P: AsRef<Path>>(artifact: &ModelArtifact, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !artifact.model.is_fitted() {
        return Err(PipelineError::Persistence(
            "Refusing to save an unfitted model".to_string(),
        ));
    }

    fs::create_dir_all(dir).map_err(|e| {
        PipelineError::Persistence(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let path = dir.join(MODEL_FILE_NAME);
    let tmp_path = dir.join(format!(".{}.tmp", MODEL_FILE_NAME));
    let bytes = serde_json::to_vec_pretty(artifact)?;

    let written = File::create(&tmp_path)
        .and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp_path, &path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(PipelineError::Persistence(format!(
            "Failed to write {}: {}",
            path.display(),
            e
        )));
    }

    log::info!("Model saved to: {}", path.display());
    Ok(path)
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelArtifact> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::Persistence(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let artifact: ModelArtifact = serde_json::from_str(&content).map_err(|e| {
        PipelineError::Persistence(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    if artifact.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(PipelineError::Persistence(format!(
            "Unsupported artifact version {} in {}",
            artifact.format_version,
            path.display()
        )));
    }
    Ok(artifact)
}
