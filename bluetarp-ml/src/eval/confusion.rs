//! Confusion counts and the rates derived from them.

use serde::{Deserialize, Serialize};

/// Decision rule shared by every model: target iff the score is strictly above
/// the threshold. A score exactly at the threshold is classified negative.
pub fn predict_target(score: f64, threshold: f64) -> bool {
    score > threshold
}

/// Binary confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    /// Tally predictions at `threshold`. Infinite thresholds are allowed here:
    /// `+inf` classifies everything negative, `-inf` everything positive.
    pub fn at_threshold(targets: &[bool], scores: &[f64], threshold: f64) -> Self {
        let mut counts = Self::default();
        for (&target, &score) in targets.iter().zip(scores) {
            counts.record(target, predict_target(score, threshold));
        }
        counts
    }

    pub fn record(&mut self, target: bool, predicted: bool) {
        match (predicted, target) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn positives(&self) -> usize {
        self.true_positives + self.false_negatives
    }

    pub fn negatives(&self) -> usize {
        self.true_negatives + self.false_positives
    }

    /// TP / (TP + FN); undefined without positives.
    pub fn tpr(&self) -> Option<f64> {
        ratio(self.true_positives, self.positives())
    }

    /// TN / (TN + FP); undefined without negatives.
    pub fn tnr(&self) -> Option<f64> {
        ratio(self.true_negatives, self.negatives())
    }

    pub fn fpr(&self) -> Option<f64> {
        ratio(self.false_positives, self.negatives())
    }

    /// TP / (TP + FP); undefined when nothing is predicted positive.
    pub fn precision(&self) -> Option<f64> {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.true_positives + self.true_negatives, self.total())
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_score_is_negative() {
        assert!(!predict_target(0.5, 0.5));
        assert!(predict_target(0.5000001, 0.5));
    }

    #[test]
    fn test_counts_and_rates() {
        let targets = [true, true, false, false, false];
        let scores = [0.9, 0.2, 0.7, 0.1, 0.3];
        let c = ConfusionCounts::at_threshold(&targets, &scores, 0.5);
        assert_eq!(
            c,
            ConfusionCounts {
                true_positives: 1,
                false_positives: 1,
                true_negatives: 2,
                false_negatives: 1,
            }
        );
        assert_eq!(c.tpr(), Some(0.5));
        assert_eq!(c.tnr(), Some(2.0 / 3.0));
        assert_eq!(c.precision(), Some(0.5));
        assert_eq!(c.accuracy(), Some(0.6));
    }

    #[test]
    fn test_infinite_thresholds() {
        let targets = [true, false, true];
        let scores = [0.2, 0.8, 1.0];
        let none = ConfusionCounts::at_threshold(&targets, &scores, f64::INFINITY);
        assert_eq!(none.tpr(), Some(0.0));
        assert_eq!(none.fpr(), Some(0.0));
        let all = ConfusionCounts::at_threshold(&targets, &scores, f64::NEG_INFINITY);
        assert_eq!(all.tpr(), Some(1.0));
        assert_eq!(all.fpr(), Some(1.0));
    }

    #[test]
    fn test_undefined_rates() {
        let c = ConfusionCounts::at_threshold(&[false, false], &[0.1, 0.2], 0.5);
        assert_eq!(c.tpr(), None);
        assert_eq!(c.precision(), None);
        assert_eq!(c.tnr(), Some(1.0));
        assert_eq!(ConfusionCounts::default().accuracy(), None);
    }
}
