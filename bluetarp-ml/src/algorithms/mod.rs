//! Classifier families — logistic, ridge logistic, LDA, QDA, KNN — and the
//! numerical routines behind them.

pub mod classical;
pub mod discriminant;
pub mod knn;
pub mod linalg;
pub mod logistic;

pub use classical::{Classifier, ModelFamily, ModelHandle, ModelSpec, ScoreModel};

use crate::error::FitError;
use ndarray::ArrayView2;

/// Shared training-set checks. Returns `[non-target count, target count]`.
pub(crate) fn check_training_set(
    x: ArrayView2<'_, f64>,
    targets: &[bool],
) -> Result<[usize; 2], FitError> {
    if x.nrows() != targets.len() {
        return Err(FitError::ShapeMismatch(format!(
            "{} feature rows but {} targets",
            x.nrows(),
            targets.len()
        )));
    }
    if x.ncols() == 0 {
        return Err(FitError::ShapeMismatch("no feature columns".into()));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NonFinite);
    }
    let positives = targets.iter().filter(|&&t| t).count();
    let negatives = targets.len() - positives;
    if positives == 0 {
        return Err(FitError::MissingClass("target"));
    }
    if negatives == 0 {
        return Err(FitError::MissingClass("non-target"));
    }
    Ok([negatives, positives])
}
