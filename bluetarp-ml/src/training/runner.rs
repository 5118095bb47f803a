//! Comparison runner: every enabled model on one shared fold assignment.

use crate::algorithms::{ModelFamily, ModelSpec};
use crate::config::{EvaluationConfig, ModelPlan, ThresholdPolicy};
use crate::data::Dataset;
use crate::error::{MlError, Result};
use crate::eval::{MetricsSummary, RocCurve, summarize};
use crate::training::cross_validation::{CrossValidator, CvOutput, ExecutionMode, FoldRecord, ScoreVector};
use crate::training::folds::assign;
use crate::training::reproducibility::RunProvenance;
use crate::training::sweep::{GridSweep, SweepResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// Threshold used when a balanced threshold cannot be derived.
const FALLBACK_THRESHOLD: f64 = 0.5;

/// Metrics and bookkeeping for a model that completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    /// Spec after tuning.
    pub spec: ModelSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep: Option<SweepResult>,
    pub threshold_policy: ThresholdPolicy,
    pub threshold: f64,
    pub metrics: MetricsSummary,
    pub folds: Vec<FoldRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreVector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome {
    Completed {
        family: ModelFamily,
        #[serde(flatten)]
        result: Box<ModelResult>,
    },
    Failed {
        family: ModelFamily,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fold: Option<usize>,
    },
}

impl ModelOutcome {
    pub fn family(&self) -> ModelFamily {
        match self {
            Self::Completed { family, .. } | Self::Failed { family, .. } => *family,
        }
    }

    pub fn result(&self) -> Option<&ModelResult> {
        match self {
            Self::Completed { result, .. } => Some(result),
            Self::Failed { .. } => None,
        }
    }
}

/// Output of one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub provenance: RunProvenance,
    pub execution: ExecutionMode,
    pub elapsed_ms: u64,
    pub models: Vec<ModelOutcome>,
}

impl ComparisonReport {
    pub fn outcome(&self, family: ModelFamily) -> Option<&ModelOutcome> {
        self.models.iter().find(|m| m.family() == family)
    }

    pub fn completed(&self) -> impl Iterator<Item = (ModelFamily, &ModelResult)> {
        self.models
            .iter()
            .filter_map(|m| m.result().map(|r| (m.family(), r)))
    }

    pub fn failed_count(&self) -> usize {
        self.models
            .iter()
            .filter(|m| matches!(m, ModelOutcome::Failed { .. }))
            .count()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        tracing::info!(path = %path.display(), "Report written");
        Ok(())
    }
}

/// Runs the configured models against one dataset.
#[derive(Debug)]
pub struct ComparisonRunner<'a> {
    dataset: &'a Dataset,
    config: &'a EvaluationConfig,
    include_scores: bool,
}

impl<'a> ComparisonRunner<'a> {
    pub fn new(dataset: &'a Dataset, config: &'a EvaluationConfig) -> Self {
        Self {
            dataset,
            config,
            include_scores: false,
        }
    }

    /// Keep every model's out-of-fold scores in the report.
    pub fn with_scores(mut self, include: bool) -> Self {
        self.include_scores = include;
        self
    }

    /// Assign folds once, then evaluate each enabled model in family order.
    ///
    /// A model that cannot be fit becomes a [`ModelOutcome::Failed`]; other
    /// errors abort the run.
    pub fn run(&self) -> Result<ComparisonReport> {
        self.config.validate()?;
        let started = Instant::now();
        let cv_config = &self.config.cross_validation;
        let folds = assign(self.dataset.len(), cv_config.folds, cv_config.seed)?;
        let cv = CrossValidator::new(self.dataset, &folds)?.with_mode(cv_config.execution_mode());
        let targets = self.dataset.all_targets();

        tracing::info!(
            observations = self.dataset.len(),
            targets = self.dataset.target_count(),
            folds = folds.k(),
            seed = folds.seed(),
            "Starting comparison"
        );

        let mut models = Vec::new();
        for plan in self.config.models.plans() {
            let outcome = match self.run_plan(&cv, &plan, &targets) {
                Ok(result) => ModelOutcome::Completed {
                    family: plan.family,
                    result: Box::new(result),
                },
                Err(e @ (MlError::Fit { .. } | MlError::Metrics(_))) => {
                    tracing::warn!(model = %plan.family, error = %e, "Model failed");
                    ModelOutcome::Failed {
                        family: plan.family,
                        fold: e.fold(),
                        error: e.to_string(),
                    }
                }
                Err(e) => return Err(e),
            };
            models.push(outcome);
        }

        let report = ComparisonReport {
            provenance: RunProvenance::capture(self.dataset, &folds),
            execution: cv.mode(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            models,
        };
        tracing::info!(
            run_id = %report.provenance.run_id,
            failed = report.failed_count(),
            elapsed_ms = report.elapsed_ms,
            "Comparison complete"
        );
        Ok(report)
    }

    fn run_plan(&self, cv: &CrossValidator<'_>, plan: &ModelPlan, targets: &[bool]) -> Result<ModelResult> {
        let (spec, sweep, output): (ModelSpec, Option<SweepResult>, CvOutput) =
            match (plan.needs_sweep(), plan.criterion) {
                (true, Some(criterion)) => {
                    let outcome = GridSweep::new(plan.candidates.clone(), criterion)?.run(cv)?;
                    (outcome.result.best_spec(), Some(outcome.result), outcome.best_output)
                }
                _ => {
                    let spec = plan
                        .candidates
                        .first()
                        .copied()
                        .ok_or_else(|| MlError::invariant(format!("{} has no candidates", plan.family)))?;
                    (spec, None, cv.evaluate(&spec)?)
                }
            };

        let scores = output.scores.as_slice();
        let threshold = resolve_threshold(plan.threshold, targets, scores);
        let metrics = summarize(targets, scores, threshold)?;
        tracing::info!(
            model = %spec,
            threshold,
            auc = ?metrics.auc(),
            accuracy = metrics.accuracy(),
            "Model evaluated"
        );

        Ok(ModelResult {
            spec,
            sweep,
            threshold_policy: plan.threshold,
            threshold,
            metrics,
            folds: output.folds,
            scores: self.include_scores.then_some(output.scores),
        })
    }
}

/// Decision threshold for `policy` given the out-of-fold scores.
pub fn resolve_threshold(policy: ThresholdPolicy, targets: &[bool], scores: &[f64]) -> f64 {
    match policy {
        ThresholdPolicy::Fixed { value } => value,
        ThresholdPolicy::Balanced => match RocCurve::compute(targets, scores) {
            Some(roc) => roc.optimal().threshold,
            None => {
                tracing::warn!(
                    fallback = FALLBACK_THRESHOLD,
                    "Balanced threshold undefined without both classes"
                );
                FALLBACK_THRESHOLD
            }
        },
    }
}
