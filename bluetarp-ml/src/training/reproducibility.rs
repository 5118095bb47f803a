//! Reproducibility records: what was evaluated, with which seed and folds.

use crate::data::{Dataset, PixelClass};
use crate::training::folds::FoldAssignment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identity of the dataset a run was computed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub observations: usize,
    pub targets: usize,
    /// SHA-256 over the canonical rows.
    pub fingerprint: String,
    pub class_counts: BTreeMap<PixelClass, usize>,
}

impl DatasetRecord {
    pub fn capture(dataset: &Dataset) -> Self {
        Self {
            observations: dataset.len(),
            targets: dataset.target_count(),
            fingerprint: dataset.fingerprint(),
            class_counts: dataset.class_counts(),
        }
    }
}

/// Everything needed to rerun an evaluation and get identical scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProvenance {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub crate_version: String,
    pub platform: String,
    pub seed: u64,
    pub folds: usize,
    pub fold_sizes: Vec<usize>,
    pub dataset: DatasetRecord,
}

impl RunProvenance {
    pub fn capture(dataset: &Dataset, assignment: &FoldAssignment) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            seed: assignment.seed(),
            folds: assignment.k(),
            fold_sizes: assignment.fold_sizes(),
            dataset: DatasetRecord::capture(dataset),
        }
    }

    /// True when `other` used the same data, seed and partition.
    pub fn same_inputs(&self, other: &RunProvenance) -> bool {
        self.dataset.fingerprint == other.dataset.fingerprint
            && self.seed == other.seed
            && self.folds == other.folds
            && self.fold_sizes == other.fold_sizes
    }
}
