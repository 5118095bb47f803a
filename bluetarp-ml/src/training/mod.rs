//! Fold assignment, cross-validation, hyperparameter sweeps and the comparison runner.

pub mod cross_validation;
pub mod folds;
pub mod reproducibility;
pub mod runner;
pub mod sweep;

pub use cross_validation::{CrossValidator, CvOutput, ExecutionMode, FoldRecord, ScoreVector};
pub use folds::{FoldAssignment, assign};
pub use reproducibility::{DatasetRecord, RunProvenance};
pub use runner::{ComparisonReport, ComparisonRunner, ModelOutcome, ModelResult, resolve_threshold};
pub use sweep::{GridSweep, SelectionCriterion, SweepOutcome, SweepResult, SweepTrial, TrialOutcome};
