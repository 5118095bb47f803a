//! # bluetarp-ml — blue-tarp pixel classifier comparison
//!
//! Cross-validated comparison of binary classifiers that flag blue-tarp pixels
//! in RGB imagery. Every model is scored on one shared, seeded fold
//! assignment so the resulting ROC curves are directly comparable.
//!
//! Pipeline:
//! 1. [`data`] loads the labelled pixel table into an immutable [`Dataset`].
//! 2. [`training::folds`] assigns every observation to one of k folds.
//! 3. [`algorithms`] fits logistic, ridge logistic, LDA, QDA and KNN models.
//! 4. [`training::cross_validation`] collects one out-of-fold score per row.
//! 5. [`eval`] turns scores into confusion counts, ROC/AUC and an optimal threshold.
//! 6. [`training::runner`] ties it together into a [`ComparisonReport`].

pub mod algorithms;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod training;

pub use algorithms::{Classifier, ModelFamily, ModelSpec, ScoreModel};
pub use config::{ConfigOverrides, EvaluationConfig, ThresholdPolicy, load_config};
pub use data::{CsvSource, Dataset, Observation, PixelClass};
pub use error::{FitError, MetricsError, MlError};
pub use eval::{MetricsSummary, summarize};
pub use training::{
    ComparisonReport, ComparisonRunner, CrossValidator, FoldAssignment, ScoreVector, assign,
};
