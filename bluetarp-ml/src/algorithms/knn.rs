//! Brute-force k-nearest-neighbours scoring over Euclidean distance.

use crate::algorithms::check_training_set;
use crate::error::FitError;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use std::cmp::Ordering;

/// A "fitted" KNN model: the training rows and their labels.
#[derive(Debug, Clone)]
pub struct KnnModel {
    train: Array2<f64>,
    targets: Vec<bool>,
    neighbors: usize,
}

impl KnnModel {
    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Fraction of the `k` nearest training rows that are targets, per test row.
    ///
    /// Rows at equal distance are ordered by training position, so the earlier
    /// training row wins the last neighbour slot. Test rows are scored in parallel;
    /// the output order matches the input order.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>, FitError> {
        if x.ncols() != self.train.ncols() {
            return Err(FitError::ShapeMismatch(format!(
                "model has {} features, input has {}",
                self.train.ncols(),
                x.ncols()
            )));
        }
        let rows: Vec<ArrayView1<'_, f64>> = x.axis_iter(Axis(0)).collect();
        Ok(rows.par_iter().map(|row| self.score_row(*row)).collect())
    }

    fn score_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut dist: Vec<(f64, usize)> = self
            .train
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(i, t)| {
                let d: f64 = t.iter().zip(row.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
                (d, i)
            })
            .collect();

        let k = self.neighbors;
        if k < dist.len() {
            dist.select_nth_unstable_by(k - 1, by_distance_then_position);
        }
        let hits = dist[..k].iter().filter(|(_, i)| self.targets[*i]).count();
        hits as f64 / k as f64
    }
}

fn by_distance_then_position(a: &(f64, usize), b: &(f64, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

/// Store the training set. `neighbors` must be in `1..=n_train`.
pub fn fit_knn(
    x: ArrayView2<'_, f64>,
    targets: &[bool],
    neighbors: usize,
) -> Result<KnnModel, FitError> {
    check_training_set(x, targets)?;
    if neighbors == 0 || neighbors > x.nrows() {
        return Err(FitError::InvalidHyperparameter(format!(
            "neighbors must be in 1..={}, got {}",
            x.nrows(),
            neighbors
        )));
    }
    Ok(KnnModel {
        train: x.to_owned(),
        targets: targets.to_vec(),
        neighbors,
    })
}
