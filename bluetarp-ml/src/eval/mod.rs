//! Metrics engine: confusion counts, ROC/AUC and per-threshold summaries.

pub mod confusion;
pub mod roc;
pub mod summary;

pub use confusion::{ConfusionCounts, predict_target};
pub use roc::{RocCurve, RocPoint};
pub use summary::{MetricsSummary, UndefinedMetric, summarize};
