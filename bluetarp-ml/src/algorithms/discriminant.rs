//! Gaussian discriminant analysis — linear (pooled covariance) and quadratic
//! (per-class covariance) — with posteriors from Bayes' rule.

use crate::algorithms::check_training_set;
use crate::algorithms::linalg::{cholesky, column_means, log_det, mahalanobis_sq, scatter};
use crate::error::FitError;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// How class covariances are estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceKind {
    /// One within-class covariance shared by both classes (LDA).
    Pooled,
    /// A separate covariance per class (QDA).
    PerClass,
}

/// Per-class Gaussian parameters. Index 0 is non-target, 1 is target.
#[derive(Debug, Clone)]
struct ClassDensity {
    log_prior: f64,
    mean: Array1<f64>,
    factor: Array2<f64>,
    log_det: f64,
}

impl ClassDensity {
    /// Log discriminant up to a constant shared by both classes.
    fn score(&self, row: ndarray::ArrayView1<'_, f64>) -> f64 {
        let diff = &row - &self.mean;
        self.log_prior - 0.5 * self.log_det - 0.5 * mahalanobis_sq(&self.factor, diff.view())
    }
}

#[derive(Debug, Clone)]
pub struct DiscriminantModel {
    kind: CovarianceKind,
    classes: [ClassDensity; 2],
}

impl DiscriminantModel {
    pub fn kind(&self) -> CovarianceKind {
        self.kind
    }

    pub fn class_mean(&self, target: bool) -> &Array1<f64> {
        &self.classes[usize::from(target)].mean
    }

    /// Posterior probability of the target class for each row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, FitError> {
        let width = self.classes[0].mean.len();
        if x.ncols() != width {
            return Err(FitError::ShapeMismatch(format!(
                "model has {} features, input has {}",
                width,
                x.ncols()
            )));
        }
        Ok(x.axis_iter(Axis(0))
            .map(|row| {
                let neg = self.classes[0].score(row);
                let pos = self.classes[1].score(row);
                crate::algorithms::logistic::sigmoid(pos - neg)
            })
            .collect())
    }
}

/// Estimate class priors, means and covariances.
///
/// Pooled covariance uses the `n - 2` denominator; per-class covariance uses
/// `n_c - 1`. A per-class fit needs more observations in each class than features.
pub fn fit_discriminant(
    x: ArrayView2<'_, f64>,
    targets: &[bool],
    kind: CovarianceKind,
) -> Result<DiscriminantModel, FitError> {
    let counts = check_training_set(x, targets)?;
    let p = x.ncols();
    let n = x.nrows();

    let split = |want: bool| -> Array2<f64> {
        let rows: Vec<usize> = (0..n).filter(|&i| targets[i] == want).collect();
        x.select(Axis(0), &rows)
    };
    let groups = [split(false), split(true)];
    let means = [column_means(groups[0].view()), column_means(groups[1].view())];
    let scatters = [
        scatter(groups[0].view(), &means[0]),
        scatter(groups[1].view(), &means[1]),
    ];

    let factors: [(Array2<f64>, f64); 2] = match kind {
        CovarianceKind::Pooled => {
            if n <= 2 {
                return Err(FitError::TooFewObservations {
                    class: "combined",
                    found: n,
                    needed: 3,
                });
            }
            let pooled = (&scatters[0] + &scatters[1]) / (n - 2) as f64;
            let l = cholesky(pooled.view())?;
            let ld = log_det(&l);
            [(l.clone(), ld), (l, ld)]
        }
        CovarianceKind::PerClass => {
            let per_class = |c: usize| -> Result<(Array2<f64>, f64), FitError> {
                let nc = counts[c];
                if nc <= p {
                    return Err(FitError::TooFewObservations {
                        class: class_label(c == 1),
                        found: nc,
                        needed: p + 1,
                    });
                }
                let cov = &scatters[c] / (nc - 1) as f64;
                let l = cholesky(cov.view())?;
                let ld = log_det(&l);
                Ok((l, ld))
            };
            [per_class(0)?, per_class(1)?]
        }
    };

    let [(f0, d0), (f1, d1)] = factors;
    let [m0, m1] = means;
    let total = n as f64;
    let classes = [
        ClassDensity {
            log_prior: (counts[0] as f64 / total).ln(),
            mean: m0,
            factor: f0,
            log_det: d0,
        },
        ClassDensity {
            log_prior: (counts[1] as f64 / total).ln(),
            mean: m1,
            factor: f1,
            log_det: d1,
        },
    ];
    tracing::debug!(?kind, n_neg = counts[0], n_pos = counts[1], "Fitted discriminant");
    Ok(DiscriminantModel { kind, classes })
}

fn class_label(target: bool) -> &'static str {
    if target { "target" } else { "non-target" }
}
