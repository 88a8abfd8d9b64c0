use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::schema::Schema;

pub const DEFAULT_DATA_URL: &str =
    "https://archive.ics.uci.edu/ml/machine-learning-databases/00519/heart_failure_clinical_records_dataset.csv";

/// Hyper-parameters supplied per run. Immutable once the run starts.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    /// Inverse of regularization strength. Smaller values regularize more.
    pub c: f64,
    /// Iteration cap for the optimizer.
    pub max_iter: usize,
}

impl Hyperparameters {
    pub fn new(c: f64, max_iter: usize) -> Result<Self> {
        let params = Self { c, max_iter };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.c.is_finite() || self.c <= 0.0 {
            return Err(PipelineError::Config(format!(
                "C must be a positive finite number, got {}",
                self.c
            )));
        }
        if self.max_iter == 0 {
            return Err(PipelineError::Config(
                "max_iter must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
        }
    }
}

/// Solver settings that are not exposed as hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// Stop once the largest absolute gradient component drops below this.
    pub tol: f64,
    pub fit_intercept: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            tol: 1e-4,
            fit_intercept: true,
        }
    }
}

/// Everything a training run needs besides the hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TrainConfig {
    /// http(s) URL, file:// URL or local path of the delimited dataset.
    pub data_url: String,
    pub schema: Schema,
    pub test_fraction: f64,
    /// Fixed shuffle seed. `None` draws from OS entropy, so splits differ
    /// between runs.
    pub seed: Option<u64>,
    /// Directory receiving the model artifact.
    pub output_dir: PathBuf,
    /// Parent directory for per-run metric files and reports.
    pub runs_dir: PathBuf,
    pub write_report: bool,
    pub model: ModelConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_url: DEFAULT_DATA_URL.to_string(),
            schema: Schema::heart_failure(),
            test_fraction: 0.2,
            seed: None,
            output_dir: PathBuf::from("outputs"),
            runs_dir: PathBuf::from("runs"),
            write_report: true,
            model: ModelConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if !(self.model.tol > 0.0) {
            return Err(PipelineError::Config(format!(
                "tol must be positive, got {}",
                self.model.tol
            )));
        }
        if self.data_url.trim().is_empty() {
            return Err(PipelineError::Config("data_url is empty".to_string()));
        }
        self.schema.validate_declaration()
    }
}

/// Load a training configuration from a JSON file. Missing fields take their
/// defaults.
pub fn load_train_config<P: AsRef<Path>>(path: P) -> Result<TrainConfig> {
    let content = std::fs::read_to_string(&path).map_err(|e| {
        PipelineError::Config(format!(
            "Failed to read config {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let config: TrainConfig = serde_json::from_str(&content).map_err(|e| {
        PipelineError::Config(format!(
            "Failed to parse config {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    config.validate()?;
    Ok(config)
}
