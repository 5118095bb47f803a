//! Seeded, balanced k-fold assignment.

use crate::error::{MlError, Result};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

/// Mapping from observation id (`1..=n`) to fold number (`1..=k`).
///
/// Only [`assign`] builds one, so every fold number is in range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoldAssignment {
    k: usize,
    seed: u64,
    /// `folds[id - 1]` is the fold of observation `id`.
    folds: Vec<usize>,
}

/// Partition ids `1..=n` into `k` folds whose sizes differ by at most one.
///
/// The label sequence `1, 2, .., k, 1, 2, ..` of length `n` is shuffled with a
/// ChaCha8 stream seeded from `seed`, so identical arguments always reproduce the
/// same assignment on every platform.
pub fn assign(n: usize, k: usize, seed: u64) -> Result<FoldAssignment> {
    if k < 2 {
        return Err(MlError::invalid_argument(format!(
            "fold count must be at least 2, got {k}"
        )));
    }
    if n < k {
        return Err(MlError::invalid_argument(format!(
            "cannot split {n} observations into {k} folds"
        )));
    }

    let mut folds: Vec<usize> = (0..n).map(|i| i % k + 1).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    folds.shuffle(&mut rng);

    tracing::debug!(n, k, seed, "Assigned folds");
    Ok(FoldAssignment { k, seed, folds })
}

impl FoldAssignment {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of observations covered.
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    pub fn fold_of(&self, id: usize) -> Option<usize> {
        id.checked_sub(1).and_then(|i| self.folds.get(i).copied())
    }

    /// Ids held out in fold `fold`, ascending.
    pub fn test_ids(&self, fold: usize) -> Vec<usize> {
        self.ids_where(|f| f == fold)
    }

    /// Ids used for training when `fold` is held out, ascending.
    pub fn train_ids(&self, fold: usize) -> Vec<usize> {
        self.ids_where(|f| f != fold)
    }

    /// Size of each fold, index 0 being fold 1.
    pub fn fold_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &f in &self.folds {
            sizes[f - 1] += 1;
        }
        sizes
    }

    /// Fold numbers `1..=k`.
    pub fn fold_numbers(&self) -> std::ops::RangeInclusive<usize> {
        1..=self.k
    }

    fn ids_where(&self, pred: impl Fn(usize) -> bool) -> Vec<usize> {
        self.folds
            .iter()
            .enumerate()
            .filter(|&(_, &f)| pred(f))
            .map(|(i, _)| i + 1)
            .collect()
    }
}
