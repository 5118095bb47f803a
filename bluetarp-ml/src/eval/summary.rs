//! Threshold-dependent and threshold-free metrics for one score vector.

use crate::error::MetricsError;
use crate::eval::confusion::ConfusionCounts;
use crate::eval::roc::{RocCurve, RocPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A metric that could not be computed for the given inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedMetric {
    Tpr,
    Tnr,
    Precision,
    Auc,
    OptimalThreshold,
}

impl fmt::Display for UndefinedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tpr => "tpr",
            Self::Tnr => "tnr",
            Self::Precision => "precision",
            Self::Auc => "auc",
            Self::OptimalThreshold => "optimal_threshold",
        })
    }
}

/// Everything reported for a model at a given decision threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    threshold: f64,
    confusion: ConfusionCounts,
    tpr: Option<f64>,
    tnr: Option<f64>,
    precision: Option<f64>,
    accuracy: f64,
    auc: Option<f64>,
    optimal_threshold: Option<f64>,
    roc: Vec<RocPoint>,
    undefined: Vec<UndefinedMetric>,
}

impl MetricsSummary {
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn confusion(&self) -> ConfusionCounts {
        self.confusion
    }

    pub fn true_positives(&self) -> usize {
        self.confusion.true_positives
    }

    pub fn false_positives(&self) -> usize {
        self.confusion.false_positives
    }

    pub fn true_negatives(&self) -> usize {
        self.confusion.true_negatives
    }

    pub fn false_negatives(&self) -> usize {
        self.confusion.false_negatives
    }

    pub fn tpr(&self) -> Option<f64> {
        self.tpr
    }

    pub fn tnr(&self) -> Option<f64> {
        self.tnr
    }

    /// FP / negatives, the same value the ROC points use.
    pub fn fpr(&self) -> Option<f64> {
        self.confusion.fpr()
    }

    pub fn precision(&self) -> Option<f64> {
        self.precision
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn auc(&self) -> Option<f64> {
        self.auc
    }

    /// Finite threshold maximising (TPR + TNR) / 2.
    pub fn optimal_threshold(&self) -> Option<f64> {
        self.optimal_threshold
    }

    /// Curve ordered from `+inf` down to `-inf`; empty when AUC is undefined.
    pub fn roc(&self) -> &[RocPoint] {
        &self.roc
    }

    pub fn undefined(&self) -> &[UndefinedMetric] {
        &self.undefined
    }

    pub fn is_defined(&self, metric: UndefinedMetric) -> bool {
        !self.undefined.contains(&metric)
    }
}

/// Compute a [`MetricsSummary`] from aligned targets and scores.
///
/// Predictions use `score > threshold`. Rates whose denominator is zero are
/// reported as undefined rather than failing.
pub fn summarize(
    targets: &[bool],
    scores: &[f64],
    threshold: f64,
) -> Result<MetricsSummary, MetricsError> {
    if targets.len() != scores.len() {
        return Err(MetricsError::LengthMismatch {
            targets: targets.len(),
            scores: scores.len(),
        });
    }
    if targets.is_empty() {
        return Err(MetricsError::Empty);
    }
    if !(0.0..=1.0).contains(&threshold) {
        return Err(MetricsError::ThresholdOutOfRange(threshold));
    }
    if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
        return Err(MetricsError::NonFiniteScore(i + 1));
    }

    let confusion = ConfusionCounts::at_threshold(targets, scores, threshold);
    let roc = RocCurve::compute(targets, scores);
    let tpr = confusion.tpr();
    let tnr = confusion.tnr();
    let precision = confusion.precision();

    let mut undefined = Vec::new();
    for (metric, value) in [
        (UndefinedMetric::Tpr, tpr),
        (UndefinedMetric::Tnr, tnr),
        (UndefinedMetric::Precision, precision),
    ] {
        if value.is_none() {
            undefined.push(metric);
        }
    }
    if roc.is_none() {
        undefined.push(UndefinedMetric::Auc);
        undefined.push(UndefinedMetric::OptimalThreshold);
    }
    if !undefined.is_empty() {
        tracing::warn!(
            undefined = ?undefined,
            positives = confusion.positives(),
            negatives = confusion.negatives(),
            "Some metrics are undefined for this score vector"
        );
    }

    let accuracy = (confusion.true_positives + confusion.true_negatives) as f64 / targets.len() as f64;
    Ok(MetricsSummary {
        threshold,
        confusion,
        tpr,
        tnr,
        precision,
        accuracy,
        auc: roc.as_ref().map(RocCurve::auc),
        optimal_threshold: roc.as_ref().map(|r| r.optimal().threshold),
        roc: roc.map(|r| r.points().to_vec()).unwrap_or_default(),
        undefined,
    })
}
