//! L2-regularized binary logistic regression.
//!
//! Minimises `0.5 * ||w||^2 + C * sum_i logloss_i` (the intercept is not
//! penalized). The objective is optimised in its `1 / (C * n)` scaled form
//! with damped Newton steps: each iteration solves the Hessian system by
//! Cholesky decomposition and backtracks until the Armijo condition holds.
//! Running out of iterations is not an error; the partially optimised
//! weights are kept and a `ConvergenceWarning` is returned in the report.
use std::fmt;

use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::{Hyperparameters, ModelConfig};
use crate::error::{PipelineError, Result};
use crate::models::classifier_trait::ClassifierModel;

const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-10;

/// Optimizer hit `max_iter` before the gradient fell below `tol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceWarning {
    pub max_iter: usize,
    pub gradient_max_abs: f64,
    pub tol: f64,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConvergenceWarning: solver stopped after max_iter={} iterations with max |gradient| {:.3e} > tol {:.1e}; increase max_iter or scale the features",
            self.max_iter, self.gradient_max_abs, self.tol
        )
    }
}

/// Outcome of a `fit` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub n_iter: usize,
    pub converged: bool,
    pub gradient_max_abs: f64,
    pub objective: f64,
    pub warning: Option<ConvergenceWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
    /// Fitted weights, one per feature column. `None` until fitted.
    pub coefficients: Option<Vec<f64>>,
    pub intercept: f64,
    pub n_iter: usize,
    pub converged: bool,
}

impl LogisticRegression {
    pub fn new(params: Hyperparameters, config: &ModelConfig) -> Self {
        Self {
            c: params.c,
            max_iter: params.max_iter,
            tol: config.tol,
            fit_intercept: config.fit_intercept,
            coefficients: None,
            intercept: 0.0,
            n_iter: 0,
            converged: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or_else(|| {
            PipelineError::Training("Model must be fitted before predicting".to_string())
        })?;
        if x.ncols() != coefficients.len() {
            return Err(PipelineError::Training(format!(
                "Expected {} feature columns, got {}",
                coefficients.len(),
                x.ncols()
            )));
        }
        let w = Array1::from_vec(coefficients.clone());
        Ok(x.dot(&w) + self.intercept)
    }

    /// Fraction of rows whose prediction matches `y`.
    pub fn score(&self, x: &Array2<f64>, y: &[u8]) -> Result<f64> {
        let predictions = self.predict(x)?;
        if predictions.is_empty() {
            return Err(PipelineError::Training("Cannot score an empty matrix".to_string()));
        }
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p == t)
            .count();
        Ok(correct as f64 / predictions.len() as f64)
    }

    fn check_inputs(&self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(PipelineError::Training(format!(
                "Cannot fit on an empty matrix of shape ({}, {})",
                n_samples, n_features
            )));
        }
        if y.len() != n_samples {
            return Err(PipelineError::Training(format!(
                "Feature matrix has {} rows but {} labels were given",
                n_samples,
                y.len()
            )));
        }
        if let Some(pos) = x.iter().position(|v| !v.is_finite()) {
            return Err(PipelineError::Training(format!(
                "Feature matrix contains a non-finite value at row {}, column {}",
                pos / n_features + 1,
                pos % n_features + 1
            )));
        }
        if let Some(bad) = y.iter().find(|&&v| v > 1) {
            return Err(PipelineError::Training(format!("Labels must be 0 or 1, got {}", bad)));
        }
        let positives = y.iter().filter(|&&v| v == 1).count();
        if positives == 0 || positives == n_samples {
            return Err(PipelineError::Training(format!(
                "Training labels contain a single class (positives: {} of {})",
                positives, n_samples
            )));
        }
        Ok(())
    }
}

impl ClassifierModel for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<FitReport> {
        self.check_inputs(x, y)?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let design = if self.fit_intercept {
            let ones = Array2::<f64>::ones((n_samples, 1));
            concatenate(Axis(1), &[x.view(), ones.view()])
                .map_err(|e| PipelineError::Training(format!("Failed to build design matrix: {}", e)))?
        } else {
            x.to_owned()
        };
        let target = Array1::from_iter(y.iter().map(|&v| v as f64));

        let problem = Objective {
            design: &design,
            target: &target,
            n_features,
            alpha: 1.0 / (self.c * n_samples as f64),
        };

        let mut theta = Array1::<f64>::zeros(design.ncols());
        let mut value = problem.value(&theta);
        let mut gradient = problem.gradient(&theta);
        let mut n_iter = 0;
        let mut converged = max_abs(&gradient) <= self.tol;

        while !converged && n_iter < self.max_iter {
            let hessian = problem.hessian(&theta);
            let direction = cholesky_solve(&hessian, &gradient).ok_or_else(|| {
                PipelineError::Training("Hessian is singular; cannot compute a Newton step".to_string())
            })?;

            let slope = gradient.dot(&direction);
            let mut step = 1.0;
            let mut candidate = &theta - &direction;
            let mut candidate_value = problem.value(&candidate);
            while candidate_value > value - ARMIJO * step * slope && step > MIN_STEP {
                step *= 0.5;
                candidate = &theta - &(&direction * step);
                candidate_value = problem.value(&candidate);
            }

            theta = candidate;
            value = candidate_value;
            gradient = problem.gradient(&theta);
            n_iter += 1;
            converged = max_abs(&gradient) <= self.tol;

            log::trace!(
                "iter {:>3}: objective={:.6e} max|grad|={:.3e} step={:.3e}",
                n_iter,
                value,
                max_abs(&gradient),
                step
            );

            if !value.is_finite() {
                return Err(PipelineError::Training(
                    "Objective diverged to a non-finite value".to_string(),
                ));
            }
        }

        self.coefficients = Some(theta.iter().take(n_features).copied().collect());
        self.intercept = if self.fit_intercept { theta[n_features] } else { 0.0 };
        self.n_iter = n_iter;
        self.converged = converged;

        let gradient_max_abs = max_abs(&gradient);
        let warning = if converged {
            None
        } else {
            Some(ConvergenceWarning {
                max_iter: self.max_iter,
                gradient_max_abs,
                tol: self.tol,
            })
        };

        Ok(FitReport {
            n_iter,
            converged,
            gradient_max_abs,
            objective: value,
            warning,
        })
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

/// Scaled regularized log-loss over an (optionally intercept-augmented)
/// design matrix. Only the first `n_features` parameters are penalized.
struct Objective<'a> {
    design: &'a Array2<f64>,
    target: &'a Array1<f64>,
    n_features: usize,
    alpha: f64,
}

impl<'a> Objective<'a> {
    fn n(&self) -> f64 {
        self.design.nrows() as f64
    }

    fn penalty_mask(&self, theta: &Array1<f64>) -> Array1<f64> {
        let mut w = theta.clone();
        for v in w.iter_mut().skip(self.n_features) {
            *v = 0.0;
        }
        w
    }

    fn value(&self, theta: &Array1<f64>) -> f64 {
        let z = self.design.dot(theta);
        let loss: f64 = z
            .iter()
            .zip(self.target.iter())
            .map(|(&zi, &yi)| softplus(zi) - yi * zi)
            .sum();
        let w = self.penalty_mask(theta);
        loss / self.n() + 0.5 * self.alpha * w.dot(&w)
    }

    fn gradient(&self, theta: &Array1<f64>) -> Array1<f64> {
        let residual = self.design.dot(theta).mapv(sigmoid) - self.target;
        self.design.t().dot(&residual) / self.n() + self.penalty_mask(theta) * self.alpha
    }

    fn hessian(&self, theta: &Array1<f64>) -> Array2<f64> {
        let weights = self.design.dot(theta).mapv(|z| {
            let p = sigmoid(z);
            p * (1.0 - p)
        });
        let weighted = self.design * &weights.insert_axis(Axis(1));
        let mut h = self.design.t().dot(&weighted) / self.n();
        for j in 0..self.n_features {
            h[[j, j]] += self.alpha;
        }
        h
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow.
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn max_abs(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

/// Solve `a * x = b` for symmetric positive-definite `a`. Retries with a
/// growing diagonal ridge when the factorization breaks down.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let scale = (a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64).max(f64::MIN_POSITIVE);
    let mut ridge = 0.0;
    for _ in 0..8 {
        if let Some(x) = cholesky_solve_inner(a, b, ridge) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
        ridge = if ridge == 0.0 { 1e-12 * scale } else { ridge * 100.0 };
    }
    None
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>, ridge: f64) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] + ridge - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(c: f64, max_iter: usize) -> LogisticRegression {
        LogisticRegression::new(Hyperparameters { c, max_iter }, &ModelConfig::default())
    }

    fn toy_data() -> (Array2<f64>, Vec<u8>) {
        // Overlapping classes along the first feature, noise in the second.
        let x = Array2::from_shape_vec(
            (10, 2),
            vec![
                0.1, 1.0, 0.4, -1.0, 0.6, 1.0, 0.9, -1.0, 1.2, 1.0, //
                1.5, -1.0, 1.8, 1.0, 2.1, -1.0, 2.4, 1.0, 2.7, -1.0,
            ],
        )
        .unwrap();
        let y = vec![0, 0, 0, 1, 0, 1, 0, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn sigmoid_and_softplus_are_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(softplus(800.0).is_finite());
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn fits_and_converges_on_overlapping_classes() {
        let (x, y) = toy_data();
        let mut clf = model(1.0, 100);
        let report = clf.fit(&x, &y).unwrap();
        assert!(report.converged, "report: {:?}", report);
        assert!(report.warning.is_none());
        assert!(report.gradient_max_abs <= 1e-4);

        let coef = clf.coefficients.as_ref().unwrap();
        assert_eq!(coef.len(), 2);
        assert!(coef[0] > 0.0, "first feature should push towards class 1");

        let acc = clf.score(&x, &y).unwrap();
        assert!(acc >= 0.7, "accuracy {}", acc);
    }

    #[test]
    fn probabilities_are_in_unit_interval() {
        let (x, y) = toy_data();
        let mut clf = model(1.0, 100);
        clf.fit(&x, &y).unwrap();
        let proba = clf.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn stronger_regularization_shrinks_weights() {
        let (x, y) = toy_data();
        let mut loose = model(100.0, 100);
        let mut tight = model(0.01, 100);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();
        let norm = |m: &LogisticRegression| {
            m.coefficients.as_ref().unwrap().iter().map(|v| v * v).sum::<f64>()
        };
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn iteration_cap_yields_warning_not_error() {
        let (x, y) = toy_data();
        let mut clf = model(1.0, 1);
        let report = clf.fit(&x, &y).unwrap();
        assert_eq!(report.n_iter, 1);
        assert!(!report.converged);
        let warning = report.warning.expect("expected a convergence warning");
        assert!(warning.to_string().starts_with("ConvergenceWarning"));
        assert!(clf.is_fitted());
    }

    #[test]
    fn single_class_is_a_training_error() {
        let (x, _) = toy_data();
        let mut clf = model(1.0, 100);
        let err = clf.fit(&x, &vec![1u8; 10]).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn nan_feature_is_a_training_error() {
        let (mut x, y) = toy_data();
        x[[3, 1]] = f64::NAN;
        let mut clf = model(1.0, 100);
        let err = clf.fit(&x, &y).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn predicting_before_fit_fails() {
        let (x, _) = toy_data();
        assert!(model(1.0, 10).predict(&x).is_err());
    }

    #[test]
    fn probability_of_exactly_one_half_predicts_class_zero() {
        let mut clf = model(1.0, 10);
        clf.coefficients = Some(vec![0.0, 0.0]);
        clf.intercept = 0.0;
        let x = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, -3.0, 0.5]).unwrap();
        assert_eq!(clf.predict_proba(&x).unwrap().to_vec(), vec![0.5, 0.5]);
        assert_eq!(clf.predict(&x).unwrap(), vec![0, 0]);

        clf.intercept = 1e-9;
        assert_eq!(clf.predict(&x).unwrap(), vec![1, 1]);
    }

    #[test]
    fn cholesky_solves_spd_system() {
        let a = Array2::from_shape_vec((2, 2), vec![4.0, 1.0, 1.0, 3.0]).unwrap();
        let b = Array1::from_vec(vec![1.0, 2.0]);
        let x = cholesky_solve(&a, &b).unwrap();
        let back = a.dot(&x);
        assert!((back[0] - 1.0).abs() < 1e-10);
        assert!((back[1] - 2.0).abs() < 1e-10);
    }
}
