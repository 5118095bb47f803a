//! Classifier families and the uniform fit / score interface.

use crate::algorithms::discriminant::{CovarianceKind, DiscriminantModel, fit_discriminant};
use crate::algorithms::knn::{KnnModel, fit_knn};
use crate::algorithms::logistic::{LogisticModel, LogisticOptions, fit_logistic};
use crate::error::FitError;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that can be trained on a feature matrix and binary targets.
pub trait Classifier {
    type Fitted: ScoreModel;

    /// Short label used in logs, errors and reports.
    fn name(&self) -> String;

    fn fit(&self, features: ArrayView2<'_, f64>, targets: &[bool])
    -> Result<Self::Fitted, FitError>;
}

/// A trained model that assigns each row a score in `[0, 1]`; larger means
/// more likely to be a target.
pub trait ScoreModel {
    fn predict_score(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, FitError>;
}

/// Model family without hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LogisticRegression,
    Lda,
    Qda,
    Knn,
    RidgeLogistic,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 5] = [
        ModelFamily::LogisticRegression,
        ModelFamily::Lda,
        ModelFamily::Qda,
        ModelFamily::Knn,
        ModelFamily::RidgeLogistic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::LogisticRegression => "logistic_regression",
            Self::Lda => "lda",
            Self::Qda => "qda",
            Self::Knn => "knn",
            Self::RidgeLogistic => "ridge_logistic",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A model family together with its hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression,
    Lda,
    Qda,
    Knn { neighbors: usize },
    RidgeLogistic { lambda: f64 },
}

impl ModelSpec {
    pub fn family(&self) -> ModelFamily {
        match self {
            Self::LogisticRegression => ModelFamily::LogisticRegression,
            Self::Lda => ModelFamily::Lda,
            Self::Qda => ModelFamily::Qda,
            Self::Knn { .. } => ModelFamily::Knn,
            Self::RidgeLogistic { .. } => ModelFamily::RidgeLogistic,
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Knn { neighbors } => write!(f, "knn(k={neighbors})"),
            Self::RidgeLogistic { lambda } => write!(f, "ridge_logistic(lambda={lambda:e})"),
            other => f.write_str(other.family().label()),
        }
    }
}

/// Opaque fitted model for any [`ModelSpec`].
#[derive(Debug, Clone)]
pub enum ModelHandle {
    Logistic(LogisticModel),
    Discriminant(DiscriminantModel),
    Knn(KnnModel),
}

impl Classifier for ModelSpec {
    type Fitted = ModelHandle;

    fn name(&self) -> String {
        self.to_string()
    }

    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        targets: &[bool],
    ) -> Result<ModelHandle, FitError> {
        match *self {
            Self::LogisticRegression => {
                fit_logistic(features, targets, &LogisticOptions::default()).map(ModelHandle::Logistic)
            }
            Self::RidgeLogistic { lambda } => {
                if !(lambda > 0.0 && lambda.is_finite()) {
                    return Err(FitError::InvalidHyperparameter(format!(
                        "ridge lambda must be positive, got {lambda}"
                    )));
                }
                fit_logistic(features, targets, &LogisticOptions::ridge(lambda))
                    .map(ModelHandle::Logistic)
            }
            Self::Lda => fit_discriminant(features, targets, CovarianceKind::Pooled)
                .map(ModelHandle::Discriminant),
            Self::Qda => fit_discriminant(features, targets, CovarianceKind::PerClass)
                .map(ModelHandle::Discriminant),
            Self::Knn { neighbors } => fit_knn(features, targets, neighbors).map(ModelHandle::Knn),
        }
    }
}

impl ScoreModel for ModelHandle {
    fn predict_score(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, FitError> {
        let scores = match self {
            Self::Logistic(m) => m.predict_proba(features)?,
            Self::Discriminant(m) => m.predict_proba(features)?,
            Self::Knn(m) => m.predict_proba(features)?,
        };
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(FitError::NonFinite);
        }
        Ok(scores)
    }
}
