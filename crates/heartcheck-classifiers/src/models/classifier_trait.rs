use ndarray::{Array1, Array2};

use crate::error::Result;
use crate::models::logistic::FitReport;

/// Contract shared by binary classifiers. Labels use the 0/1 convention;
/// rows of `x` are samples.
pub trait ClassifierModel {
    /// Fit the model on `x`/`y`. A non-converged optimizer is reported in the
    /// returned `FitReport`, not as an error.
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<FitReport>;

    /// Probability of class 1 for every row.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard 0/1 predictions. Class 1 needs a probability strictly above 0.5.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<u8>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.iter().map(|&p| if p > 0.5 { 1 } else { 0 }).collect())
    }

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
