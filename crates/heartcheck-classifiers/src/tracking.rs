//! Run tracking: the sink that receives scalar metrics for one training run.
//!
//! A `RunContext` is created by the caller when the run starts, handed to the
//! pipeline explicitly, and flushed with `finish` when the run ends. Each
//! metric name may be logged once per run.
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const REGULARIZATION_STRENGTH: &str = "Regularization Strength";
pub const MAX_ITERATIONS: &str = "Max iterations";
pub const ACCURACY: &str = "Accuracy";

pub const METRICS_FILE_NAME: &str = "metrics.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Int(v) => *v as f64,
            MetricValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Int(v) => write!(f, "{}", v),
            MetricValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<usize> for MetricValue {
    fn from(v: usize) -> Self {
        MetricValue::Int(v as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    pub value: MetricValue,
    pub logged_at: DateTime<Utc>,
}

/// Handle to the experiment-tracking run a pipeline reports into.
pub trait RunContext {
    fn run_id(&self) -> &str;

    /// Record one named scalar. Logging the same name twice, or logging after
    /// `finish`, is a `Tracking` error.
    fn log_metric(&mut self, name: &str, value: MetricValue) -> Result<()>;

    fn metrics(&self) -> &[MetricRecord];

    /// Flush and close the run.
    fn finish(&mut self) -> Result<()>;

    /// Directory holding this run's files, when the sink has one.
    fn run_dir(&self) -> Option<&Path> {
        None
    }

    fn metric(&self, name: &str) -> Option<MetricValue> {
        self.metrics()
            .iter()
            .find(|record| record.name == name)
            .map(|record| record.value)
    }
}

/// Write-once metric bookkeeping shared by the sinks.
#[derive(Debug, Default)]
struct MetricLog {
    records: Vec<MetricRecord>,
    finished: bool,
}

impl MetricLog {
    fn push(&mut self, run_id: &str, name: &str, value: MetricValue) -> Result<()> {
        if self.finished {
            return Err(PipelineError::Tracking(format!(
                "Run {} is finished; cannot log '{}'",
                run_id, name
            )));
        }
        if self.records.iter().any(|r| r.name == name) {
            return Err(PipelineError::Tracking(format!(
                "Metric '{}' was already logged for run {}",
                name, run_id
            )));
        }
        log::info!("[run {}] {} = {}", run_id, name, value);
        self.records.push(MetricRecord {
            name: name.to_string(),
            value,
            logged_at: Utc::now(),
        });
        Ok(())
    }
}

/// Keeps metrics in memory only. Used by tests and library callers that
/// inspect the metrics themselves.
#[derive(Debug)]
pub struct InMemoryRun {
    run_id: String,
    log: MetricLog,
}

impl InMemoryRun {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            log: MetricLog::default(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.log.finished
    }
}

impl Default for InMemoryRun {
    fn default() -> Self {
        Self::new("in-memory")
    }
}

impl RunContext for InMemoryRun {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn log_metric(&mut self, name: &str, value: MetricValue) -> Result<()> {
        self.log.push(&self.run_id, name, value)
    }

    fn metrics(&self) -> &[MetricRecord] {
        &self.log.records
    }

    fn finish(&mut self) -> Result<()> {
        self.log.finished = true;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RunFile<'a> {
    run_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    metrics: &'a [MetricRecord],
}

/// Writes the run's metrics to `<runs_dir>/<run_id>/metrics.json` on
/// `finish`. The run directory is created when the run is acquired.
#[derive(Debug)]
pub struct JsonRun {
    run_id: String,
    dir: PathBuf,
    started_at: DateTime<Utc>,
    log: MetricLog,
}

impl JsonRun {
    /// Start a new run under `runs_dir`, named after the local start time.
    pub fn create<P: AsRef<Path>>(runs_dir: P) -> Result<Self> {
        let run_id = Local::now().format("run_%Y%m%d_%H%M%S_%3f").to_string();
        Self::create_with_id(runs_dir, &run_id)
    }

    pub fn create_with_id<P: AsRef<Path>>(runs_dir: P, run_id: &str) -> Result<Self> {
        let dir = runs_dir.as_ref().join(run_id);
        std::fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::Tracking(format!("Failed to create run directory {}: {}", dir.display(), e))
        })?;
        log::debug!("Acquired run {} at {}", run_id, dir.display());
        Ok(Self {
            run_id: run_id.to_string(),
            dir,
            started_at: Utc::now(),
            log: MetricLog::default(),
        })
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.dir.join(METRICS_FILE_NAME)
    }
}

impl RunContext for JsonRun {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn log_metric(&mut self, name: &str, value: MetricValue) -> Result<()> {
        self.log.push(&self.run_id, name, value)
    }

    fn metrics(&self) -> &[MetricRecord] {
        &self.log.records
    }

    fn finish(&mut self) -> Result<()> {
        if self.log.finished {
            return Ok(());
        }
        let path = self.metrics_path();
        let file = File::create(&path).map_err(|e| {
            PipelineError::Tracking(format!("Failed to create {}: {}", path.display(), e))
        })?;
        let run_file = RunFile {
            run_id: &self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            metrics: &self.log.records,
        };
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &run_file)
            .map_err(|e| e.to_string())
            .and_then(|_| writer.flush().map_err(|e| e.to_string()))
            .map_err(|e| PipelineError::Tracking(format!("Failed to write {}: {}", path.display(), e)))?;
        self.log.finished = true;
        log::debug!("Flushed {} metric(s) to {}", self.log.records.len(), path.display());
        Ok(())
    }

    fn run_dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_are_write_once() {
        let mut run = InMemoryRun::default();
        run.log_metric(ACCURACY, MetricValue::Float(0.8)).unwrap();
        let err = run.log_metric(ACCURACY, MetricValue::Float(0.9)).unwrap_err();
        assert!(matches!(err, PipelineError::Tracking(_)));
        assert_eq!(run.metric(ACCURACY), Some(MetricValue::Float(0.8)));
    }

    #[test]
    fn no_logging_after_finish() {
        let mut run = InMemoryRun::default();
        run.finish().unwrap();
        assert!(run.is_finished());
        assert!(run.log_metric(MAX_ITERATIONS, 100usize.into()).is_err());
    }

    #[test]
    fn json_run_writes_metrics_file_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = JsonRun::create_with_id(dir.path(), "run_test").unwrap();
        run.log_metric(REGULARIZATION_STRENGTH, MetricValue::Float(1.0)).unwrap();
        run.log_metric(MAX_ITERATIONS, 100usize.into()).unwrap();
        assert!(!run.metrics_path().exists());

        run.finish().unwrap();
        let content = std::fs::read_to_string(run.metrics_path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["run_id"], "run_test");
        assert_eq!(parsed["metrics"].as_array().unwrap().len(), 2);
        assert_eq!(parsed["metrics"][1]["name"], MAX_ITERATIONS);
        assert_eq!(parsed["metrics"][1]["value"], 100);
    }

    #[cfg(unix)]
    #[test]
    fn full_disk_on_finish_is_a_tracking_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = JsonRun::create_with_id(dir.path(), "run_full").unwrap();
        std::os::unix::fs::symlink("/dev/full", run.metrics_path()).unwrap();
        run.log_metric(ACCURACY, MetricValue::Float(0.75)).unwrap();

        let err = run.finish().unwrap_err();
        assert!(matches!(err, PipelineError::Tracking(_)));
        // the run stays open so the caller can retry
        assert!(run.log_metric(MAX_ITERATIONS, 100usize.into()).is_ok());
    }
}
