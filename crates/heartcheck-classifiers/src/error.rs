use std::error::Error;
use std::fmt;
use std::io;

/// Failure kinds for a training run. Every variant is fatal; the run stops at
/// the stage that produced it.
#[derive(Debug)]
pub enum PipelineError {
    /// The dataset could not be fetched or parsed as delimited text.
    SourceUnavailable(String),
    /// A column required by the schema is absent.
    Schema(String),
    /// Fitting failed on malformed input (non-numeric or non-finite features,
    /// single-class labels, too few rows to split).
    Training(String),
    /// The model artifact or run report could not be written or read.
    Persistence(String),
    /// The run context rejected a metric or could not be flushed.
    Tracking(String),
    /// Invalid hyperparameters or configuration values.
    Config(String),
}

impl PipelineError {
    /// Short name of the error kind, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable(_) => "SourceUnavailableError",
            PipelineError::Schema(_) => "SchemaError",
            PipelineError::Training(_) => "TrainingError",
            PipelineError::Persistence(_) => "PersistenceError",
            PipelineError::Tracking(_) => "TrackingError",
            PipelineError::Config(_) => "ConfigError",
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::SourceUnavailable(msg) => write!(f, "Dataset source unavailable: {}", msg),
            PipelineError::Schema(msg) => write!(f, "Schema error: {}", msg),
            PipelineError::Training(msg) => write!(f, "Training failed: {}", msg),
            PipelineError::Persistence(msg) => write!(f, "Persistence failed: {}", msg),
            PipelineError::Tracking(msg) => write!(f, "Run tracking failed: {}", msg),
            PipelineError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl Error for PipelineError {}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::SourceUnavailable(err.to_string())
    }
}

impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
