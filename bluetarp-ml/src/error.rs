//! Error types for the bluetarp-ml crate.

use thiserror::Error;

/// Top-level error type for evaluation runs.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Input error at line {line}: {reason}")]
    Input { line: u64, reason: String },

    #[error("Fit error for {model} on fold {fold}: {source}")]
    Fit {
        model: String,
        fold: usize,
        #[source]
        source: FitError,
    },

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MlError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn input(line: u64, reason: impl Into<String>) -> Self {
        Self::Input {
            line,
            reason: reason.into(),
        }
    }

    pub fn fit(model: impl Into<String>, fold: usize, source: FitError) -> Self {
        Self::Fit {
            model: model.into(),
            fold,
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Fold index carried by a fit failure, if any.
    pub fn fold(&self) -> Option<usize> {
        match self {
            Self::Fit { fold, .. } => Some(*fold),
            _ => None,
        }
    }
}

/// Reasons a model cannot be fit on (or score) a training subset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("no {0} observations in training data")]
    MissingClass(&'static str),

    #[error("{class} class has {found} observations, need at least {needed}")]
    TooFewObservations {
        class: &'static str,
        found: usize,
        needed: usize,
    },

    #[error("covariance matrix is singular")]
    Singular,

    #[error("invalid hyperparameter: {0}")]
    InvalidHyperparameter(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("non-finite value produced during fitting")]
    NonFinite,
}

/// Errors raised while summarizing a score vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("targets length {targets} != scores length {scores}")]
    LengthMismatch { targets: usize, scores: usize },

    #[error("threshold {0} outside [0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("score at position {0} is not finite")]
    NonFiniteScore(usize),

    #[error("no observations to summarize")]
    Empty,
}

pub type Result<T, E = MlError> = std::result::Result<T, E>;
