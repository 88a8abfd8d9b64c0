//! Fitting and held-out evaluation.
use ndarray::{Array2, Axis};

use crate::config::{Hyperparameters, ModelConfig};
use crate::error::Result;
use crate::metrics::{ClassificationSummary, ConfusionMatrix};
use crate::models::{ClassifierModel, FitReport, LogisticRegression};
use crate::tracking::{MetricValue, RunContext, ACCURACY, MAX_ITERATIONS, REGULARIZATION_STRENGTH};

/// Test-set results for a fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub summary: ClassificationSummary,
}

/// Gather the rows of `x` at `indices`, in that order.
pub fn select_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

/// Fit a logistic regression on the training rows. A convergence warning is
/// logged and kept in the returned report; the partially optimised model is
/// still returned.
pub fn fit_model(
    x_train: &Array2<f64>,
    y_train: &[u8],
    params: Hyperparameters,
    config: &ModelConfig,
) -> Result<(LogisticRegression, FitReport)> {
    let mut model = LogisticRegression::new(params, config);
    log::info!(
        "Fitting {} (C={}, max_iter={}) on {} rows x {} features",
        model.name(),
        params.c,
        params.max_iter,
        x_train.nrows(),
        x_train.ncols()
    );
    let report = model.fit(x_train, y_train)?;
    match &report.warning {
        Some(warning) => log::warn!("{}", warning),
        None => log::info!(
            "Converged after {} iteration(s) (max |gradient| {:.3e})",
            report.n_iter,
            report.gradient_max_abs
        ),
    }
    Ok((model, report))
}

pub fn evaluate<M: ClassifierModel + ?Sized>(
    model: &M,
    x_test: &Array2<f64>,
    y_test: &[u8],
) -> Result<Evaluation> {
    let predictions = model.predict(x_test)?;
    let confusion = ConfusionMatrix::from_predictions(y_test, &predictions)?;
    let summary = confusion.summary();
    log::info!("Test accuracy: {:.4} ({} of {} rows)", confusion.accuracy(), confusion.correct(), confusion.total());
    log::info!("Confusion matrix:\n{}", confusion);
    log::debug!("Positive class scores: {}", summary);
    Ok(Evaluation {
        accuracy: confusion.accuracy(),
        confusion,
        summary,
    })
}

/// Report the run's three scalars: the two hyper-parameters and the test
/// accuracy.
pub fn log_run_metrics(
    run: &mut dyn RunContext,
    params: Hyperparameters,
    accuracy: f64,
) -> Result<()> {
    run.log_metric(REGULARIZATION_STRENGTH, MetricValue::Float(params.c))?;
    run.log_metric(MAX_ITERATIONS, MetricValue::from(params.max_iter))?;
    run.log_metric(ACCURACY, MetricValue::Float(accuracy))?;
    Ok(())
}
