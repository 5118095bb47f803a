//! k-fold cross-validation producing out-of-fold scores aligned with row ids.

use crate::algorithms::{Classifier, ScoreModel};
use crate::data::Dataset;
use crate::error::{MlError, Result};
use crate::training::folds::FoldAssignment;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One out-of-fold score per observation, indexed by id (`1..=n`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreVector {
    scores: Vec<f64>,
}

impl ScoreVector {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<f64> {
        id.checked_sub(1).and_then(|i| self.scores.get(i).copied())
    }

    /// Scores in id order.
    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }
}

/// Write-once slots backing a [`ScoreVector`] while folds complete.
#[derive(Debug)]
struct ScoreSlots {
    slots: Vec<Option<f64>>,
}

impl ScoreSlots {
    fn new(n: usize) -> Self {
        Self {
            slots: vec![None; n],
        }
    }

    fn write(&mut self, id: usize, score: f64) -> Result<()> {
        let slot = id
            .checked_sub(1)
            .and_then(|i| self.slots.get_mut(i))
            .ok_or_else(|| MlError::invariant(format!("score for unknown id {id}")))?;
        if slot.is_some() {
            return Err(MlError::invariant(format!("id {id} scored twice")));
        }
        *slot = Some(score);
        Ok(())
    }

    fn finish(self) -> Result<ScoreVector> {
        let mut scores = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Some(s) => scores.push(s),
                None => return Err(MlError::invariant(format!("id {} never scored", i + 1))),
            }
        }
        Ok(ScoreVector { scores })
    }
}

/// Sizes recorded for one held-out fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldRecord {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
}

/// Out-of-fold scores plus per-fold bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvOutput {
    pub scores: ScoreVector,
    pub folds: Vec<FoldRecord>,
}

/// Whether fold iterations run one after another or on the rayon pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

/// Drives a classifier through every fold of a fixed assignment.
#[derive(Debug, Clone, Copy)]
pub struct CrossValidator<'a> {
    dataset: &'a Dataset,
    folds: &'a FoldAssignment,
    mode: ExecutionMode,
}

impl<'a> CrossValidator<'a> {
    pub fn new(dataset: &'a Dataset, folds: &'a FoldAssignment) -> Result<Self> {
        if folds.len() != dataset.len() {
            return Err(MlError::invalid_argument(format!(
                "fold assignment covers {} ids but dataset has {}",
                folds.len(),
                dataset.len()
            )));
        }
        Ok(Self {
            dataset,
            folds,
            mode: ExecutionMode::Sequential,
        })
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn folds(&self) -> &'a FoldAssignment {
        self.folds
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Fit on every fold's complement and score the held-out rows.
    ///
    /// The first failing fold (in fold order) aborts the whole evaluation.
    pub fn evaluate<C>(&self, model: &C) -> Result<CvOutput>
    where
        C: Classifier + Sync,
    {
        let name = model.name();
        let started = Instant::now();
        let fold_numbers: Vec<usize> = self.folds.fold_numbers().collect();

        let results: Vec<Result<FoldScores>> = match self.mode {
            ExecutionMode::Sequential => {
                let mut out = Vec::with_capacity(fold_numbers.len());
                for &fold in &fold_numbers {
                    let result = self.run_fold(model, &name, fold);
                    let failed = result.is_err();
                    out.push(result);
                    if failed {
                        break;
                    }
                }
                out
            }
            ExecutionMode::Parallel => fold_numbers
                .par_iter()
                .map(|&fold| self.run_fold(model, &name, fold))
                .collect(),
        };

        let mut slots = ScoreSlots::new(self.dataset.len());
        let mut records = Vec::with_capacity(results.len());
        for result in results {
            let fold_scores = result?;
            for (&id, &score) in fold_scores.test_ids.iter().zip(&fold_scores.scores) {
                slots.write(id, score)?;
            }
            records.push(fold_scores.record);
        }
        let scores = slots.finish()?;

        tracing::info!(
            model = %name,
            folds = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cross-validation complete"
        );
        Ok(CvOutput {
            scores,
            folds: records,
        })
    }

    fn run_fold<C: Classifier>(&self, model: &C, name: &str, fold: usize) -> Result<FoldScores> {
        let train_ids = self.folds.train_ids(fold);
        let test_ids = self.folds.test_ids(fold);
        let train_x = self.dataset.features(&train_ids)?;
        let train_y = self.dataset.targets(&train_ids)?;
        let test_x = self.dataset.features(&test_ids)?;

        let handle = model
            .fit(train_x.view(), &train_y)
            .map_err(|e| MlError::fit(name, fold, e))?;
        let scores = handle
            .predict_score(test_x.view())
            .map_err(|e| MlError::fit(name, fold, e))?;
        if scores.len() != test_ids.len() {
            return Err(MlError::invariant(format!(
                "{name} returned {} scores for {} rows on fold {fold}",
                scores.len(),
                test_ids.len()
            )));
        }

        tracing::debug!(model = %name, fold, train = train_ids.len(), test = test_ids.len(), "Fold scored");
        Ok(FoldScores {
            record: FoldRecord {
                fold,
                train_size: train_ids.len(),
                test_size: test_ids.len(),
            },
            test_ids,
            scores,
        })
    }
}

struct FoldScores {
    record: FoldRecord,
    test_ids: Vec<usize>,
    scores: Vec<f64>,
}

/// Convenience wrapper: sequential cross-validation returning only the scores.
pub fn evaluate<C>(dataset: &Dataset, folds: &FoldAssignment, model: &C) -> Result<ScoreVector>
where
    C: Classifier + Sync,
{
    Ok(CrossValidator::new(dataset, folds)?.evaluate(model)?.scores)
}
