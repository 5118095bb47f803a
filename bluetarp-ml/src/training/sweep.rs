//! Grid sweeps over one model family, scored on a shared fold assignment.

use crate::algorithms::ModelSpec;
use crate::error::{MlError, Result};
use crate::eval::RocCurve;
use crate::training::cross_validation::{CrossValidator, CvOutput};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probabilities are clamped this far from 0 and 1 before taking logs.
const DEVIANCE_EPS: f64 = 1e-15;

/// How sweep candidates are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionCriterion {
    /// Mean binomial deviance of the out-of-fold scores; lower wins.
    Deviance,
    /// Area under the ROC curve; higher wins.
    Auc,
}

impl SelectionCriterion {
    pub fn evaluate(&self, targets: &[bool], scores: &[f64]) -> Result<f64> {
        if targets.len() != scores.len() || targets.is_empty() {
            return Err(MlError::invalid_argument(format!(
                "cannot score {} predictions against {} targets",
                scores.len(),
                targets.len()
            )));
        }
        match self {
            Self::Deviance => Ok(mean_deviance(targets, scores)),
            Self::Auc => RocCurve::compute(targets, scores)
                .map(|roc| roc.auc())
                .ok_or_else(|| MlError::invalid_argument("AUC needs both classes present")),
        }
    }

    /// Strict improvement; equal values keep the incumbent.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Deviance => candidate < incumbent,
            Self::Auc => candidate > incumbent,
        }
    }
}

impl fmt::Display for SelectionCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deviance => f.write_str("deviance"),
            Self::Auc => f.write_str("auc"),
        }
    }
}

/// `-2/n * sum(y ln p + (1 - y) ln(1 - p))`.
pub fn mean_deviance(targets: &[bool], scores: &[f64]) -> f64 {
    let total: f64 = targets
        .iter()
        .zip(scores)
        .map(|(&y, &p)| {
            let p = p.clamp(DEVIANCE_EPS, 1.0 - DEVIANCE_EPS);
            if y { p.ln() } else { (1.0 - p).ln() }
        })
        .sum();
    -2.0 * total / targets.len() as f64
}

/// Result of evaluating one grid candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialOutcome {
    Scored { value: f64 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepTrial {
    pub spec: ModelSpec,
    pub outcome: TrialOutcome,
}

/// Every trial plus the index of the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub criterion: SelectionCriterion,
    pub trials: Vec<SweepTrial>,
    pub best: usize,
}

impl SweepResult {
    pub fn best_spec(&self) -> ModelSpec {
        self.trials[self.best].spec
    }

    pub fn best_value(&self) -> Option<f64> {
        match self.trials[self.best].outcome {
            TrialOutcome::Scored { value } => Some(value),
            TrialOutcome::Failed { .. } => None,
        }
    }
}

/// Sweep result together with the winner's cross-validation output, so the
/// caller does not have to refit it.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub result: SweepResult,
    pub best_output: CvOutput,
}

/// Exhaustive search over a fixed list of candidates.
#[derive(Debug, Clone)]
pub struct GridSweep {
    candidates: Vec<ModelSpec>,
    criterion: SelectionCriterion,
}

impl GridSweep {
    pub fn new(candidates: Vec<ModelSpec>, criterion: SelectionCriterion) -> Result<Self> {
        if candidates.is_empty() {
            return Err(MlError::invalid_argument("sweep grid is empty"));
        }
        Ok(Self {
            candidates,
            criterion,
        })
    }

    pub fn candidates(&self) -> &[ModelSpec] {
        &self.candidates
    }

    pub fn criterion(&self) -> SelectionCriterion {
        self.criterion
    }

    /// Cross-validate each candidate on `cv`'s folds and keep the best.
    ///
    /// Failed candidates are recorded and skipped. If none succeeds the first
    /// failure is returned.
    pub fn run(&self, cv: &CrossValidator<'_>) -> Result<SweepOutcome> {
        let targets = cv.dataset().all_targets();
        let mut trials = Vec::with_capacity(self.candidates.len());
        let mut best: Option<(usize, f64, CvOutput)> = None;
        let mut first_error = None;

        for spec in &self.candidates {
            let scored = cv.evaluate(spec).and_then(|out| {
                let value = self.criterion.evaluate(&targets, out.scores.as_slice())?;
                Ok((value, out))
            });
            match scored {
                Ok((value, out)) => {
                    tracing::debug!(model = %spec, criterion = %self.criterion, value, "Sweep trial scored");
                    let better = best
                        .as_ref()
                        .is_none_or(|(_, incumbent, _)| self.criterion.improves(value, *incumbent));
                    if better {
                        best = Some((trials.len(), value, out));
                    }
                    trials.push(SweepTrial {
                        spec: *spec,
                        outcome: TrialOutcome::Scored { value },
                    });
                }
                Err(e) => {
                    tracing::warn!(model = %spec, error = %e, "Sweep trial failed");
                    trials.push(SweepTrial {
                        spec: *spec,
                        outcome: TrialOutcome::Failed {
                            error: e.to_string(),
                        },
                    });
                    first_error.get_or_insert(e);
                }
            }
        }

        let Some((index, value, best_output)) = best else {
            return Err(first_error
                .unwrap_or_else(|| MlError::invariant("sweep finished without any trial")));
        };
        tracing::info!(
            model = %self.candidates[index],
            criterion = %self.criterion,
            value,
            trials = trials.len(),
            "Sweep selected candidate"
        );
        Ok(SweepOutcome {
            result: SweepResult {
                criterion: self.criterion,
                trials,
                best: index,
            },
            best_output,
        })
    }
}
