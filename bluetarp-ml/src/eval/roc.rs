//! ROC curve, trapezoidal AUC, and the balanced-accuracy optimal threshold.

use serde::{Deserialize, Serialize};

/// One operating point. `threshold` may be `±inf` at the curve ends, written
/// as `"inf"` / `"-inf"` in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    #[serde(with = "extended_threshold")]
    pub threshold: f64,
    pub fpr: f64,
    pub tpr: f64,
}

impl RocPoint {
    /// (TPR + TNR) / 2.
    pub fn balanced_accuracy(&self) -> f64 {
        (self.tpr + 1.0 - self.fpr) / 2.0
    }
}

/// ROC curve ordered by decreasing threshold, so both rates are non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    points: Vec<RocPoint>,
    auc: f64,
    optimal: RocPoint,
}

impl RocCurve {
    /// Build the curve, or `None` when either class is absent (rates undefined).
    ///
    /// Candidate thresholds are `+inf`, every distinct score in descending order,
    /// and `-inf`; a row counts as positive when its score is strictly above the
    /// threshold. The optimal point maximises balanced accuracy over the finite
    /// candidates, preferring the lower threshold on ties.
    pub fn compute(targets: &[bool], scores: &[f64]) -> Option<Self> {
        let positives = targets.iter().filter(|&&t| t).count();
        let negatives = targets.len().saturating_sub(positives);
        if positives == 0 || negatives == 0 || targets.len() != scores.len() {
            return None;
        }
        let p = positives as f64;
        let n = negatives as f64;

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let mut points = Vec::with_capacity(scores.len() + 2);
        points.push(RocPoint {
            threshold: f64::INFINITY,
            fpr: 0.0,
            tpr: 0.0,
        });

        let (mut tp, mut fp) = (0usize, 0usize);
        let mut i = 0;
        while i < order.len() {
            let current = scores[order[i]];
            // Rows scoring exactly `current` are still negative at this threshold.
            points.push(RocPoint {
                threshold: current,
                fpr: fp as f64 / n,
                tpr: tp as f64 / p,
            });
            while i < order.len() && scores[order[i]] == current {
                if targets[order[i]] {
                    tp += 1;
                } else {
                    fp += 1;
                }
                i += 1;
            }
        }
        points.push(RocPoint {
            threshold: f64::NEG_INFINITY,
            fpr: 1.0,
            tpr: 1.0,
        });

        let auc = trapezoidal_auc(&points);
        let mut optimal = points[1];
        for point in points[1..points.len() - 1].iter() {
            if point.balanced_accuracy() >= optimal.balanced_accuracy() {
                optimal = *point;
            }
        }

        Some(Self {
            points,
            auc,
            optimal,
        })
    }

    pub fn points(&self) -> &[RocPoint] {
        &self.points
    }

    pub fn auc(&self) -> f64 {
        self.auc
    }

    /// Operating point with the highest (TPR + TNR) / 2.
    pub fn optimal(&self) -> RocPoint {
        self.optimal
    }
}

/// JSON has no infinities; the curve's sentinel thresholds travel as strings.
mod extended_threshold {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a number, \"inf\" or \"-inf\"",
                )),
            },
        }
    }
}

fn trapezoidal_auc(points: &[RocPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum()
}
