use std::time::Instant;

use anyhow::{Context, Result};

use heartcheck_classifiers::pipeline::{Pipeline, PipelineOutcome};
use heartcheck_classifiers::tracking::{JsonRun, RunContext};

use crate::train::input::TrainInput;

/// Run the training pipeline against a fresh run directory under
/// `runs_dir`.
pub fn run_training(input: &TrainInput) -> Result<PipelineOutcome> {
    let start_time = Instant::now();
    let mut run = JsonRun::create(&input.config.runs_dir)
        .with_context(|| format!("Failed to start a run under {}", input.config.runs_dir.display()))?;
    log::info!("Started run {}", run.run_id());

    let mut pipeline = Pipeline::new(input.config.clone(), input.hyperparameters)?;
    let outcome = pipeline.run(&mut run).map_err(|e| {
        let stage = pipeline
            .failed_at()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        anyhow::Error::new(e).context(format!("{} stage failed", stage))
    })?;

    log::info!(
        "Run {} finished in {:?}: accuracy {:.4} on {} test rows",
        outcome.run_id,
        start_time.elapsed(),
        outcome.accuracy(),
        outcome.n_test
    );
    Ok(outcome)
}

/// Machine-readable summary printed to stdout after a successful run.
pub fn outcome_summary(outcome: &PipelineOutcome, input: &TrainInput) -> serde_json::Value {
    serde_json::json!({
        "run_id": outcome.run_id,
        "Regularization Strength": input.hyperparameters.c,
        "Max iterations": input.hyperparameters.max_iter,
        "Accuracy": outcome.accuracy(),
        "n_train": outcome.n_train,
        "n_test": outcome.n_test,
        "converged": outcome.converged(),
        "confusion_matrix": outcome.evaluation.confusion.as_rows(),
        "model": outcome.artifact_path,
        "report": outcome.report_path,
    })
}
