//! Logistic regression by Newton iterations, with an optional ridge (L2) penalty.
//!
//! Features are standardized (population standard deviation) before fitting and the
//! stored model applies the same transform at scoring time. The objective is
//!
//! ```text
//! -(1/n) Σ [yᵢ ηᵢ - log(1 + e^ηᵢ)] + (λ/2) Σⱼ βⱼ²
//! ```
//!
//! with the intercept left unpenalized. `λ = 0` gives plain maximum likelihood.

use crate::algorithms::check_training_set;
use crate::algorithms::linalg::{cholesky, cholesky_solve};
use crate::error::FitError;
use ndarray::{Array1, Array2, ArrayView2, Axis, s};
use serde::{Deserialize, Serialize};

/// Floor on IRLS weights so the Hessian stays positive definite once fitted
/// probabilities saturate at 0 or 1.
const MIN_WEIGHT: f64 = 1e-10;

/// Solver settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticOptions {
    pub lambda: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LogisticOptions {
    fn default() -> Self {
        Self {
            lambda: 0.0,
            max_iter: 100,
            tol: 1e-8,
        }
    }
}

impl LogisticOptions {
    pub fn ridge(lambda: f64) -> Self {
        Self {
            lambda,
            ..Self::default()
        }
    }
}

/// A fitted logistic model on standardized features.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    means: Array1<f64>,
    scales: Array1<f64>,
    /// Intercept first, then one coefficient per standardized feature.
    beta: Array1<f64>,
    iterations: usize,
    converged: bool,
}

impl LogisticModel {
    pub fn intercept(&self) -> f64 {
        self.beta[0]
    }

    /// Coefficients on the standardized feature scale.
    pub fn coefficients(&self) -> Array1<f64> {
        self.beta.slice(s![1..]).to_owned()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Probability of the target class for each row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, FitError> {
        if x.ncols() != self.means.len() {
            return Err(FitError::ShapeMismatch(format!(
                "model has {} features, input has {}",
                self.means.len(),
                x.ncols()
            )));
        }
        let z = design(standardize(x, &self.means, &self.scales).view());
        Ok(z.dot(&self.beta).iter().map(|&eta| sigmoid(eta)).collect())
    }
}

/// Fit by damped Newton steps. Non-convergence (e.g. perfectly separable classes
/// without a penalty) is logged and the last iterate is kept.
pub fn fit_logistic(
    x: ArrayView2<'_, f64>,
    targets: &[bool],
    options: &LogisticOptions,
) -> Result<LogisticModel, FitError> {
    check_training_set(x, targets)?;
    if !(options.lambda >= 0.0 && options.lambda.is_finite()) {
        return Err(FitError::InvalidHyperparameter(format!(
            "lambda must be finite and non-negative, got {}",
            options.lambda
        )));
    }

    let n = x.nrows() as f64;
    let means = x
        .mean_axis(Axis(0))
        .ok_or_else(|| FitError::ShapeMismatch("empty training set".into()))?;
    let scales = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 0.0 { s } else { 1.0 });
    let z = design(standardize(x, &means, &scales).view());
    let y: Array1<f64> = targets.iter().map(|&t| if t { 1.0 } else { 0.0 }).collect();

    let p = z.ncols();
    let mut penalty = Array2::<f64>::eye(p) * options.lambda;
    penalty[[0, 0]] = 0.0;

    let objective = |beta: &Array1<f64>| -> f64 {
        let eta = z.dot(beta);
        let loglik: f64 = eta
            .iter()
            .zip(y.iter())
            .map(|(&e, &yi)| yi * e - softplus(e))
            .sum();
        let ridge: f64 = beta.iter().skip(1).map(|b| b * b).sum();
        -loglik / n + 0.5 * options.lambda * ridge
    };

    let mut beta = Array1::<f64>::zeros(p);
    let mut current = objective(&beta);
    let mut converged = false;
    let mut iterations = 0;

    while iterations < options.max_iter {
        iterations += 1;
        let mu = z.dot(&beta).mapv(sigmoid);
        let w = mu.mapv(|m| (m * (1.0 - m)).max(MIN_WEIGHT));
        let grad = z.t().dot(&(&mu - &y)) / n + penalty.dot(&beta);
        let zw = &z * &w.view().insert_axis(Axis(1));
        let hessian = z.t().dot(&zw) / n + &penalty;

        let factor = cholesky(hessian.view())?;
        let step = cholesky_solve(&factor, grad.view());

        let mut t = 1.0;
        let mut candidate = &beta - &(&step * t);
        let mut value = objective(&candidate);
        let mut halvings = 0;
        while !(value <= current) && halvings < 30 {
            t *= 0.5;
            candidate = &beta - &(&step * t);
            value = objective(&candidate);
            halvings += 1;
        }
        if !value.is_finite() || candidate.iter().any(|b| !b.is_finite()) {
            return Err(FitError::NonFinite);
        }

        let delta = step.iter().fold(0.0_f64, |m, s| m.max((s * t).abs()));
        beta = candidate;
        current = value;
        tracing::trace!(iteration = iterations, objective = current, delta, "Newton step");
        if delta < options.tol {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(
            iterations,
            lambda = options.lambda,
            "Logistic solver did not converge; classes may be separable"
        );
    }

    Ok(LogisticModel {
        means,
        scales,
        beta,
        iterations,
        converged,
    })
}

fn standardize(x: ArrayView2<'_, f64>, means: &Array1<f64>, scales: &Array1<f64>) -> Array2<f64> {
    (&x - &means.view().insert_axis(Axis(0))) / &scales.view().insert_axis(Axis(0))
}

/// Prepend the intercept column.
fn design(x: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut z = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
    z.slice_mut(s![.., 1..]).assign(&x);
    z
}

pub(crate) fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// `log(1 + e^x)` without overflow.
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Overlapping 1-D classes so the MLE exists.
    fn overlapping() -> (Array2<f64>, Vec<bool>) {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = vec![false, false, true, false, true, false, true, true];
        (x, y)
    }

    #[test]
    fn test_sigmoid_and_softplus_are_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-800.0) >= 0.0 && sigmoid(-800.0) < 1e-300);
        assert_eq!(sigmoid(800.0), 1.0);
        assert!((softplus(0.0) - 2.0_f64.ln()).abs() < 1e-12);
        assert!((softplus(800.0) - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_converges_and_orders_scores() {
        let (x, y) = overlapping();
        let model = fit_logistic(x.view(), &y, &LogisticOptions::default()).unwrap();
        assert!(model.converged());
        assert!(model.coefficients()[0] > 0.0);
        let p = model.predict_proba(array![[0.0], [4.5], [9.0]].view()).unwrap();
        assert!(p[0] < p[1] && p[1] < p[2]);
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_mle_matches_mean_of_fitted_probabilities() {
        // Score equation for the intercept: Σ μᵢ = Σ yᵢ at the optimum.
        let (x, y) = overlapping();
        let model = fit_logistic(x.view(), &y, &LogisticOptions::default()).unwrap();
        let p = model.predict_proba(x.view()).unwrap();
        let total: f64 = p.iter().sum();
        assert!((total - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_ridge_shrinks_coefficients() {
        let (x, y) = overlapping();
        let plain = fit_logistic(x.view(), &y, &LogisticOptions::default()).unwrap();
        let ridge = fit_logistic(x.view(), &y, &LogisticOptions::ridge(1.0)).unwrap();
        assert!(ridge.coefficients()[0].abs() < plain.coefficients()[0].abs());
    }

    #[test]
    fn test_separable_data_still_scores() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = vec![false, false, false, true, true, true];
        let model = fit_logistic(x.view(), &y, &LogisticOptions::default()).unwrap();
        let p = model.predict_proba(x.view()).unwrap();
        assert!(p[0] < 0.01 && p[5] > 0.99);
    }

    #[test]
    fn test_rejects_single_class_and_bad_lambda() {
        let x = array![[1.0], [2.0]];
        assert_eq!(
            fit_logistic(x.view(), &[true, true], &LogisticOptions::default()).unwrap_err(),
            FitError::MissingClass("non-target")
        );
        assert!(matches!(
            fit_logistic(x.view(), &[true, false], &LogisticOptions::ridge(-1.0)),
            Err(FitError::InvalidHyperparameter(_))
        ));
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = overlapping();
        let model = fit_logistic(x.view(), &y, &LogisticOptions::default()).unwrap();
        assert!(model.predict_proba(array![[1.0, 2.0]].view()).is_err());
    }
}
