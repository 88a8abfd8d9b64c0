//! The end-to-end training run.
//!
//! `Pipeline` walks a fixed sequence of stages:
//!
//! ```text
//! Idle -> Loading -> Preprocessing -> Splitting -> Fitting -> Evaluating
//!      -> Logging -> Persisting -> Done
//! ```
//!
//! Any error moves it to `Failed`, which is terminal. Metrics reach the run
//! context only in the `Logging` stage, so a failure earlier in the run leaves
//! the context empty.
use std::fmt;
use std::path::PathBuf;

use crate::artifact::{save_model, ModelArtifact};
use crate::config::{Hyperparameters, TrainConfig};
use crate::data_handling::{make_rng, train_test_split};
use crate::error::{PipelineError, Result};
use crate::io::load_dataset;
use crate::models::FitReport;
use crate::preprocessing::{split_label, FeatureEncoder};
use crate::report::EvaluationReport;
use crate::tracking::RunContext;
use crate::trainer::{evaluate, fit_model, log_run_metrics, select_rows, Evaluation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Loading,
    Preprocessing,
    Splitting,
    Fitting,
    Evaluating,
    Logging,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Loading => "loading",
            Stage::Preprocessing => "preprocessing",
            Stage::Splitting => "splitting",
            Stage::Fitting => "fitting",
            Stage::Evaluating => "evaluating",
            Stage::Logging => "logging",
            Stage::Persisting => "persisting",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub n_train: usize,
    pub n_test: usize,
    pub evaluation: Evaluation,
    pub fit: FitReport,
    pub artifact_path: PathBuf,
    pub report_path: Option<PathBuf>,
}

impl PipelineOutcome {
    pub fn accuracy(&self) -> f64 {
        self.evaluation.accuracy
    }

    pub fn converged(&self) -> bool {
        self.fit.warning.is_none()
    }
}

pub struct Pipeline {
    config: TrainConfig,
    params: Hyperparameters,
    stage: Stage,
    failed_at: Option<Stage>,
}

impl Pipeline {
    /// Validate the configuration and hyper-parameters and return an idle
    /// pipeline.
    pub fn new(config: TrainConfig, params: Hyperparameters) -> Result<Self> {
        config.validate()?;
        params.validate()?;
        Ok(Self {
            config,
            params,
            stage: Stage::Idle,
            failed_at: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The stage that was running when the pipeline failed.
    pub fn failed_at(&self) -> Option<Stage> {
        self.failed_at
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Execute every stage once. `run` receives the three run metrics and is
    /// finished after the artifact is written. A report that cannot be
    /// written is logged and leaves `report_path` empty.
    pub fn run(&mut self, run: &mut dyn RunContext) -> Result<PipelineOutcome> {
        if self.stage != Stage::Idle {
            return Err(PipelineError::Config(format!(
                "Pipeline can only run once (current stage: {})",
                self.stage
            )));
        }

        match self.execute(run) {
            Ok(outcome) => {
                self.enter(Stage::Done);
                Ok(outcome)
            }
            Err(e) => {
                log::debug!("Pipeline failed while {}: {}", self.stage, e);
                self.failed_at = Some(self.stage);
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        log::debug!("Pipeline stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn execute(&mut self, run: &mut dyn RunContext) -> Result<PipelineOutcome> {
        let schema = self.config.schema.clone();

        self.enter(Stage::Loading);
        let dataset = load_dataset(&self.config.data_url)?;
        schema.validate_header(dataset.headers())?;
        dataset.log_input_data_summary();

        self.enter(Stage::Preprocessing);
        let specs = schema.resolve_features(dataset.headers());
        let (table, labels) = split_label(dataset, &schema.label)?;
        let (encoder, x) = FeatureEncoder::fit_transform(&table, &specs)?;
        log::info!(
            "Encoded {} rows into {} feature column(s); {} positive label(s)",
            x.nrows(),
            x.ncols(),
            labels.count_positive()
        );

        self.enter(Stage::Splitting);
        if self.config.seed.is_none() {
            log::info!("No seed configured; the train/test split is not reproducible");
        }
        let mut rng = make_rng(self.config.seed);
        let split = train_test_split(x.nrows(), self.config.test_fraction, &mut rng)?;
        let x_train = select_rows(&x, &split.train);
        let y_train = labels.select(&split.train);
        let x_test = select_rows(&x, &split.test);
        let y_test = labels.select(&split.test);
        log::info!(
            "Split {} rows into {} train and {} test",
            split.len(),
            split.train.len(),
            split.test.len()
        );
        for (i, row) in x_train.outer_iter().take(5).enumerate() {
            log::trace!("train[{}] (row {}): {:?} -> {}", i, split.train[i], row.to_vec(), y_train[i]);
        }

        self.enter(Stage::Fitting);
        let (model, fit) = fit_model(&x_train, &y_train, self.params, &self.config.model)?;

        self.enter(Stage::Evaluating);
        let evaluation = evaluate(&model, &x_test, &y_test)?;

        self.enter(Stage::Logging);
        log_run_metrics(run, self.params, evaluation.accuracy)?;

        self.enter(Stage::Persisting);
        let feature_names = encoder.feature_names();
        let coefficients = model.coefficients.clone().unwrap_or_default();
        let intercept = model.intercept;
        let artifact = ModelArtifact::new(&schema.label, self.params, encoder, model);
        let artifact_path = save_model(&artifact, &self.config.output_dir)?;

        let report_path = match (self.config.write_report, run.run_dir()) {
            (true, Some(dir)) => {
                let report = EvaluationReport {
                    run_id: run.run_id(),
                    hyperparameters: self.params,
                    config: &self.config,
                    n_train: split.train.len(),
                    n_test: split.test.len(),
                    evaluation: &evaluation,
                    fit: &fit,
                    feature_names: &feature_names,
                    coefficients: &coefficients,
                    intercept,
                };
                match report.write(dir) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        log::warn!("Report not written for run {}: {}", run.run_id(), e);
                        None
                    }
                }
            }
            (true, None) => {
                log::debug!("Run {} has no directory; skipping report", run.run_id());
                None
            }
            (false, _) => None,
        };

        run.finish()?;

        Ok(PipelineOutcome {
            run_id: run.run_id().to_string(),
            n_train: split.train.len(),
            n_test: split.test.len(),
            evaluation,
            fit,
            artifact_path,
            report_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::InMemoryRun;

    fn write_csv(dir: &std::path::Path, body: &str) -> String {
        let path = dir.join("data.csv");
        std::fs::write(&path, body).unwrap();
        path.to_string_lossy().to_string()
    }

    fn config_for(dir: &std::path::Path, data_url: String) -> TrainConfig {
        TrainConfig {
            data_url,
            schema: crate::schema::Schema::inferred("DEATH_EVENT"),
            seed: Some(42),
            output_dir: dir.join("outputs"),
            runs_dir: dir.join("runs"),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn small_run_reaches_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from("x,DEATH_EVENT\n");
        for i in 0..20 {
            let label = if i % 2 == 0 { 0 } else { 1 };
            body.push_str(&format!("{},{}\n", i as f64 / 10.0 + label as f64, label));
        }
        let url = write_csv(dir.path(), &body);
        let mut pipeline = Pipeline::new(config_for(dir.path(), url), Hyperparameters::default()).unwrap();
        assert_eq!(pipeline.stage(), Stage::Idle);

        let mut run = InMemoryRun::default();
        let outcome = pipeline.run(&mut run).unwrap();
        assert_eq!(pipeline.stage(), Stage::Done);
        assert_eq!((outcome.n_train, outcome.n_test), (16, 4));
        assert_eq!(run.metrics().len(), 3);
        assert!(run.is_finished());
        assert!(outcome.artifact_path.exists());
        assert!(outcome.report_path.is_none());
    }

    #[test]
    fn missing_label_fails_while_loading() {
        let dir = tempfile::tempdir().unwrap();
        let url = write_csv(dir.path(), "x,y\n1,0\n2,1\n");
        let mut pipeline = Pipeline::new(config_for(dir.path(), url), Hyperparameters::default()).unwrap();

        let mut run = InMemoryRun::default();
        let err = pipeline.run(&mut run).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
        assert_eq!(pipeline.stage(), Stage::Failed);
        assert_eq!(pipeline.failed_at(), Some(Stage::Loading));
        assert!(run.metrics().is_empty());
        assert!(!dir.path().join("outputs").exists());
    }

    #[test]
    fn pipeline_runs_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let url = write_csv(dir.path(), "x,y\n1,0\n");
        let mut pipeline = Pipeline::new(config_for(dir.path(), url), Hyperparameters::default()).unwrap();
        let mut run = InMemoryRun::default();
        assert!(pipeline.run(&mut run).is_err());
        let err = pipeline.run(&mut run).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert_eq!(pipeline.stage(), Stage::Failed);
    }

    #[test]
    fn invalid_hyperparameters_are_rejected_up_front() {
        let params = Hyperparameters { c: -1.0, max_iter: 100 };
        assert!(matches!(
            Pipeline::new(TrainConfig::default(), params),
            Err(PipelineError::Config(_))
        ));
    }
}
