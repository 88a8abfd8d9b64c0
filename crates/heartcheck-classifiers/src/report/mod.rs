//! HTML evaluation report for a finished run.
pub mod plots;
#[allow(clippy::module_inception)]
pub mod report;

use std::path::{Path, PathBuf};

use maud::html;
use serde::Serialize;

use crate::config::{Hyperparameters, TrainConfig};
use crate::error::{PipelineError, Result};
use crate::models::FitReport;
use crate::trainer::Evaluation;

pub use plots::{plot_coefficients, plot_confusion_matrix};
pub use report::{Report, ReportSection};

pub const REPORT_FILE_NAME: &str = "report.html";

/// Everything the report shows about one run.
pub struct EvaluationReport<'a> {
    pub run_id: &'a str,
    pub hyperparameters: Hyperparameters,
    pub config: &'a TrainConfig,
    pub n_train: usize,
    pub n_test: usize,
    pub evaluation: &'a Evaluation,
    pub fit: &'a FitReport,
    pub feature_names: &'a [String],
    pub coefficients: &'a [f64],
    pub intercept: f64,
}

#[derive(Serialize)]
struct ConfigView<'a> {
    hyperparameters: Hyperparameters,
    config: &'a TrainConfig,
}

impl<'a> EvaluationReport<'a> {
    pub fn build(&self) -> Result<Report> {
        let mut report = Report::new(
            "heartcheck",
            env!("CARGO_PKG_VERSION"),
            &format!("Heart failure classifier, run {}", self.run_id),
        );

        let eval = self.evaluation;
        {
            let mut overview = ReportSection::new("Overview");
            overview.add_content(html! {
                p {
                    "Logistic regression predicting " code { (self.config.schema.label) }
                    ", trained on " (self.n_train) " rows and evaluated on " (self.n_test) " held-out rows."
                }
                table {
                    tr { th { "Regularization Strength" } td { (self.hyperparameters.c) } }
                    tr { th { "Max iterations" } td { (self.hyperparameters.max_iter) } }
                    tr { th { "Accuracy" } td { (format!("{:.4}", eval.accuracy)) } }
                    tr { th { "Precision" } td { (format!("{:.4}", eval.summary.precision)) } }
                    tr { th { "Recall" } td { (format!("{:.4}", eval.summary.recall)) } }
                    tr { th { "F1" } td { (format!("{:.4}", eval.summary.f1)) } }
                }
                @match &self.fit.warning {
                    Some(warning) => {
                        p class="warning" { (warning.to_string()) }
                    }
                    None => {
                        p { "Solver converged after " (self.fit.n_iter) " iteration(s)." }
                    }
                }
            });
            report.add_section(overview);
        }

        {
            let mut confusion = ReportSection::new("Confusion Matrix");
            confusion.add_content(html! {
                table {
                    tr { th {} th { "predicted 0" } th { "predicted 1" } }
                    tr { th { "true 0" } td { (eval.confusion.true_negatives()) } td { (eval.confusion.false_positives()) } }
                    tr { th { "true 1" } td { (eval.confusion.false_negatives()) } td { (eval.confusion.true_positives()) } }
                }
            });
            confusion.add_plot(plot_confusion_matrix(&eval.confusion, "Test set confusion matrix"));
            report.add_section(confusion);
        }

        {
            let mut model = ReportSection::new("Model");
            model.add_content(html! {
                p { "Intercept: " (format!("{:.6}", self.intercept)) }
            });
            model.add_plot(plot_coefficients(self.feature_names, self.coefficients, "Fitted coefficients"));
            report.add_section(model);
        }

        {
            let view = ConfigView {
                hyperparameters: self.hyperparameters,
                config: self.config,
            };
            let json = serde_json::to_string_pretty(&view)?;
            let mut config = ReportSection::new("Configuration");
            config.add_content(html! {
                div class="code-container" {
                    pre { code { (json) } }
                }
            });
            report.add_section(config);
        }

        Ok(report)
    }

    /// Render the report into `dir/report.html`.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(REPORT_FILE_NAME);
        self.build()?.save_to_file(&path).map_err(|e| {
            PipelineError::Persistence(format!("Failed to write report {}: {}", path.display(), e))
        })?;
        log::info!("Report saved to: {}", path.display());
        Ok(path)
    }
}
