//! Evaluation metrics for binary predictions.
//!
//! Classes are ordered `[0, 1]`. In the confusion matrix rows are the true
//! class and columns the predicted class, so `counts[1][0]` is the number of
//! positives predicted as negative.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    /// Tally `y_true` against `y_pred`. Both must be 0/1 and of equal length.
    pub fn from_predictions(y_true: &[u8], y_pred: &[u8]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::Training(format!(
                "Cannot compare {} labels with {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        let mut counts = [[0usize; 2]; 2];
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t > 1 || p > 1 {
                return Err(PipelineError::Training(format!(
                    "Labels must be 0 or 1, got true={} predicted={}",
                    t, p
                )));
            }
            counts[t as usize][p as usize] += 1;
        }
        Ok(Self { counts })
    }

    pub fn true_negatives(&self) -> usize {
        self.counts[0][0]
    }

    pub fn false_positives(&self) -> usize {
        self.counts[0][1]
    }

    pub fn false_negatives(&self) -> usize {
        self.counts[1][0]
    }

    pub fn true_positives(&self) -> usize {
        self.counts[1][1]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        self.true_negatives() + self.true_positives()
    }

    /// Correct predictions over all predictions; 0 for an empty matrix.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.correct() as f64 / total as f64
        }
    }

    pub fn summary(&self) -> ClassificationSummary {
        ClassificationSummary::from(self)
    }

    pub fn as_rows(&self) -> Vec<Vec<usize>> {
        self.counts.iter().map(|row| row.to_vec()).collect()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "            pred=0  pred=1")?;
        writeln!(f, "  true=0  {:>7} {:>7}", self.counts[0][0], self.counts[0][1])?;
        write!(f, "  true=1  {:>7} {:>7}", self.counts[1][0], self.counts[1][1])
    }
}

/// Scores for the positive class derived from a confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl From<&ConfusionMatrix> for ClassificationSummary {
    fn from(cm: &ConfusionMatrix) -> Self {
        let tp = cm.true_positives() as f64;
        let fp = cm.false_positives() as f64;
        let fn_count = cm.false_negatives() as f64;

        let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        let recall = if tp + fn_count > 0.0 { tp / (tp + fn_count) } else { 0.0 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: cm.accuracy(),
            precision,
            recall,
            f1,
        }
    }
}

impl fmt::Display for ClassificationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "acc={:.4} prec={:.4} rec={:.4} f1={:.4}",
            self.accuracy, self.precision, self.recall, self.f1
        )
    }
}
