//! Evaluation configuration and layered loading.
//!
//! Layers, later ones winning: built-in defaults, the user-level
//! `config.toml`, an explicit TOML file, `BLUETARP_*` environment variables
//! (`__` separates nesting levels), then command-line overrides.

use crate::algorithms::{ModelFamily, ModelSpec};
use crate::error::{MlError, Result};
use crate::training::cross_validation::ExecutionMode;
use crate::training::sweep::SelectionCriterion;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for a comparison run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cross_validation: CrossValidationConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

/// Where the pixel table comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file with `Class,Red,Green,Blue` columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: default_delimiter(),
        }
    }
}

fn default_delimiter() -> char {
    ','
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationConfig {
    #[serde(default = "default_folds")]
    pub folds: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Run folds on the rayon pool. Scores are identical either way.
    #[serde(default)]
    pub parallel_folds: bool,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            folds: default_folds(),
            seed: default_seed(),
            parallel_folds: false,
        }
    }
}

impl CrossValidationConfig {
    pub fn execution_mode(&self) -> ExecutionMode {
        if self.parallel_folds {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        }
    }
}

fn default_folds() -> usize {
    10
}

fn default_seed() -> u64 {
    42
}

/// How a model's decision threshold is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Use this threshold as-is.
    Fixed { value: f64 },
    /// Use the threshold maximising (TPR + TNR) / 2 on the out-of-fold scores.
    Balanced,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::Fixed { value: 0.5 }
    }
}

/// Settings shared by the families without hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub threshold: ThresholdPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: ThresholdPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Used when no grid is given.
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
    /// Candidate k values; when set, k is tuned on the shared folds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbor_grid: Option<Vec<usize>>,
    #[serde(default = "default_knn_criterion")]
    pub criterion: SelectionCriterion,
    #[serde(default)]
    pub threshold: ThresholdPolicy,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            neighbors: default_neighbors(),
            neighbor_grid: None,
            criterion: default_knn_criterion(),
            threshold: ThresholdPolicy::default(),
        }
    }
}

fn default_neighbors() -> usize {
    5
}

fn default_knn_criterion() -> SelectionCriterion {
    SelectionCriterion::Auc
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fixed penalty strength; skips the sweep when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
    #[serde(default = "default_lambda_grid")]
    pub lambda_grid: Vec<f64>,
    #[serde(default = "default_ridge_criterion")]
    pub criterion: SelectionCriterion,
    #[serde(default)]
    pub threshold: ThresholdPolicy,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lambda: None,
            lambda_grid: default_lambda_grid(),
            criterion: default_ridge_criterion(),
            threshold: ThresholdPolicy::default(),
        }
    }
}

/// 20 values spaced evenly in log10 from 1e-1 down to 1e-5.
fn default_lambda_grid() -> Vec<f64> {
    (0..20)
        .map(|i| 10f64.powf(-1.0 - 4.0 * i as f64 / 19.0))
        .collect()
}

fn default_ridge_criterion() -> SelectionCriterion {
    SelectionCriterion::Deviance
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default)]
    pub logistic_regression: ModelConfig,
    #[serde(default)]
    pub lda: ModelConfig,
    #[serde(default)]
    pub qda: ModelConfig,
    #[serde(default)]
    pub knn: KnnConfig,
    #[serde(default)]
    pub ridge_logistic: RidgeConfig,
}

/// What to run for one enabled family.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPlan {
    pub family: ModelFamily,
    /// A single candidate means no sweep.
    pub candidates: Vec<ModelSpec>,
    pub criterion: Option<SelectionCriterion>,
    pub threshold: ThresholdPolicy,
}

impl ModelPlan {
    fn fixed(spec: ModelSpec, threshold: ThresholdPolicy) -> Self {
        Self {
            family: spec.family(),
            candidates: vec![spec],
            criterion: None,
            threshold,
        }
    }

    pub fn needs_sweep(&self) -> bool {
        self.candidates.len() > 1
    }
}

impl ModelsConfig {
    /// Plans for every enabled family, in [`ModelFamily::ALL`] order.
    pub fn plans(&self) -> Vec<ModelPlan> {
        let mut plans = Vec::new();
        for family in ModelFamily::ALL {
            match family {
                ModelFamily::LogisticRegression if self.logistic_regression.enabled => plans.push(
                    ModelPlan::fixed(ModelSpec::LogisticRegression, self.logistic_regression.threshold),
                ),
                ModelFamily::Lda if self.lda.enabled => {
                    plans.push(ModelPlan::fixed(ModelSpec::Lda, self.lda.threshold))
                }
                ModelFamily::Qda if self.qda.enabled => {
                    plans.push(ModelPlan::fixed(ModelSpec::Qda, self.qda.threshold))
                }
                ModelFamily::Knn if self.knn.enabled => plans.push(match &self.knn.neighbor_grid {
                    Some(grid) if !grid.is_empty() => ModelPlan {
                        family,
                        candidates: grid
                            .iter()
                            .map(|&neighbors| ModelSpec::Knn { neighbors })
                            .collect(),
                        criterion: Some(self.knn.criterion),
                        threshold: self.knn.threshold,
                    },
                    _ => ModelPlan::fixed(
                        ModelSpec::Knn {
                            neighbors: self.knn.neighbors,
                        },
                        self.knn.threshold,
                    ),
                }),
                ModelFamily::RidgeLogistic if self.ridge_logistic.enabled => {
                    plans.push(match self.ridge_logistic.lambda {
                        Some(lambda) => ModelPlan::fixed(
                            ModelSpec::RidgeLogistic { lambda },
                            self.ridge_logistic.threshold,
                        ),
                        None => ModelPlan {
                            family,
                            candidates: self
                                .ridge_logistic
                                .lambda_grid
                                .iter()
                                .map(|&lambda| ModelSpec::RidgeLogistic { lambda })
                                .collect(),
                            criterion: Some(self.ridge_logistic.criterion),
                            threshold: self.ridge_logistic.threshold,
                        },
                    })
                }
                _ => {}
            }
        }
        plans
    }

    fn thresholds(&self) -> [(ModelFamily, ThresholdPolicy); 5] {
        [
            (ModelFamily::LogisticRegression, self.logistic_regression.threshold),
            (ModelFamily::Lda, self.lda.threshold),
            (ModelFamily::Qda, self.qda.threshold),
            (ModelFamily::Knn, self.knn.threshold),
            (ModelFamily::RidgeLogistic, self.ridge_logistic.threshold),
        ]
    }
}

impl EvaluationConfig {
    /// Reject settings that could only fail later, mid-run.
    pub fn validate(&self) -> Result<()> {
        if !self.data.delimiter.is_ascii() {
            return Err(MlError::invalid_argument(format!(
                "delimiter {:?} is not a single ASCII character",
                self.data.delimiter
            )));
        }
        if self.cross_validation.folds < 2 {
            return Err(MlError::invalid_argument(format!(
                "need at least 2 folds, got {}",
                self.cross_validation.folds
            )));
        }
        for (family, policy) in self.models.thresholds() {
            if let ThresholdPolicy::Fixed { value } = policy {
                if !(0.0..=1.0).contains(&value) {
                    return Err(MlError::invalid_argument(format!(
                        "{family} threshold {value} outside [0, 1]"
                    )));
                }
            }
        }

        let knn = &self.models.knn;
        if knn.neighbors == 0 {
            return Err(MlError::invalid_argument("knn neighbors must be at least 1"));
        }
        if let Some(grid) = &knn.neighbor_grid {
            if grid.is_empty() {
                return Err(MlError::invalid_argument("knn neighbor_grid is empty"));
            }
            if grid.contains(&0) {
                return Err(MlError::invalid_argument("knn neighbor_grid contains 0"));
            }
        }

        let ridge = &self.models.ridge_logistic;
        if ridge.lambda.is_none() && ridge.lambda_grid.is_empty() {
            return Err(MlError::invalid_argument("ridge lambda_grid is empty"));
        }
        let lambdas = ridge.lambda.iter().chain(&ridge.lambda_grid);
        if let Some(bad) = lambdas.copied().find(|l| !(l.is_finite() && *l > 0.0)) {
            return Err(MlError::invalid_argument(format!(
                "ridge lambda must be positive, got {bad}"
            )));
        }

        if self.models.plans().is_empty() {
            return Err(MlError::invalid_argument("no models enabled"));
        }
        Ok(())
    }

    /// Render as TOML, e.g. for `config show`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MlError::config(e.to_string()))
    }
}

/// Command-line values layered on top of every other source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub data_path: Option<PathBuf>,
    pub folds: Option<usize>,
    pub seed: Option<u64>,
    pub parallel_folds: Option<bool>,
}

/// Assemble and validate the effective configuration.
pub fn load_config(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<EvaluationConfig> {
    let mut figment = Figment::from(Serialized::defaults(EvaluationConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "bluetarp", "bluetarp") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(file) = file {
        if !file.exists() {
            return Err(MlError::config(format!(
                "config file {} not found",
                file.display()
            )));
        }
        figment = figment.merge(Toml::file(file));
    }

    // BLUETARP_CROSS_VALIDATION__SEED, BLUETARP_MODELS__KNN__NEIGHBORS, ...
    figment = figment.merge(Env::prefixed("BLUETARP_").split("__"));

    if let Some(path) = &overrides.data_path {
        figment = figment.merge(Serialized::default("data.path", path));
    }
    if let Some(folds) = overrides.folds {
        figment = figment.merge(Serialized::default("cross_validation.folds", folds));
    }
    if let Some(seed) = overrides.seed {
        figment = figment.merge(Serialized::default("cross_validation.seed", seed));
    }
    if let Some(parallel) = overrides.parallel_folds {
        figment = figment.merge(Serialized::default("cross_validation.parallel_folds", parallel));
    }

    let config: EvaluationConfig = figment
        .extract()
        .map_err(|e| MlError::config(e.to_string()))?;
    config.validate()?;
    tracing::debug!(
        folds = config.cross_validation.folds,
        seed = config.cross_validation.seed,
        models = config.models.plans().len(),
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EvaluationConfig::default();
        assert_eq!(config.cross_validation.folds, 10);
        assert_eq!(config.cross_validation.seed, 42);
        assert_eq!(config.data.delimiter, ',');
        assert_eq!(config.models.knn.neighbors, 5);
        assert_eq!(config.models.ridge_logistic.lambda_grid.len(), 20);
        assert_eq!(config.models.lda.threshold, ThresholdPolicy::Fixed { value: 0.5 });
        config.validate().unwrap();
    }

    #[test]
    fn test_lambda_grid_endpoints() {
        let grid = default_lambda_grid();
        assert!((grid[0] - 1e-1).abs() < 1e-12);
        assert!((grid[19] - 1e-5).abs() < 1e-15);
        assert!(grid.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_plans_follow_family_order() {
        let mut config = EvaluationConfig::default();
        config.models.qda.enabled = false;
        config.models.knn.neighbor_grid = Some(vec![1, 5, 9]);
        let plans = config.models.plans();
        let families: Vec<_> = plans.iter().map(|p| p.family).collect();
        assert_eq!(
            families,
            vec![
                ModelFamily::LogisticRegression,
                ModelFamily::Lda,
                ModelFamily::Knn,
                ModelFamily::RidgeLogistic
            ]
        );
        assert!(!plans[0].needs_sweep());
        assert_eq!(plans[2].candidates.len(), 3);
        assert_eq!(plans[2].criterion, Some(SelectionCriterion::Auc));
        assert_eq!(plans[3].criterion, Some(SelectionCriterion::Deviance));
    }

    #[test]
    fn test_fixed_lambda_skips_sweep() {
        let mut config = EvaluationConfig::default();
        config.models.ridge_logistic.lambda = Some(1e-3);
        let plan = config
            .models
            .plans()
            .into_iter()
            .find(|p| p.family == ModelFamily::RidgeLogistic)
            .unwrap();
        assert_eq!(plan.candidates, vec![ModelSpec::RidgeLogistic { lambda: 1e-3 }]);
        assert_eq!(plan.criterion, None);
    }

    #[test]
    fn test_validate_rejections() {
        let mut c = EvaluationConfig::default();
        c.cross_validation.folds = 1;
        assert!(c.validate().is_err());

        let mut c = EvaluationConfig::default();
        c.models.ridge_logistic.threshold = ThresholdPolicy::Fixed { value: 1.2 };
        assert!(c.validate().is_err());

        let mut c = EvaluationConfig::default();
        c.models.knn.neighbor_grid = Some(vec![]);
        assert!(c.validate().is_err());

        let mut c = EvaluationConfig::default();
        c.models.knn.neighbors = 0;
        assert!(c.validate().is_err());

        let mut c = EvaluationConfig::default();
        c.models.ridge_logistic.lambda_grid = vec![0.1, 0.0];
        assert!(c.validate().is_err());

        let mut c = EvaluationConfig::default();
        c.models.logistic_regression.enabled = false;
        c.models.lda.enabled = false;
        c.models.qda.enabled = false;
        c.models.knn.enabled = false;
        c.models.ridge_logistic.enabled = false;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_threshold_policy_serde() {
        let policy: ThresholdPolicy = serde_json::from_str(r#"{"policy":"balanced"}"#).unwrap();
        assert_eq!(policy, ThresholdPolicy::Balanced);
        let policy: ThresholdPolicy =
            serde_json::from_str(r#"{"policy":"fixed","value":0.25}"#).unwrap();
        assert_eq!(policy, ThresholdPolicy::Fixed { value: 0.25 });
    }

    #[test]
    fn test_load_layers_file_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[cross_validation]
folds = 5
seed = 7

[models.ridge_logistic]
lambda = 0.01
threshold = {{ policy = "balanced" }}

[models.qda]
enabled = false
"#
        )
        .unwrap();

        let overrides = ConfigOverrides {
            seed: Some(99),
            ..Default::default()
        };
        let config = load_config(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.cross_validation.folds, 5);
        assert_eq!(config.cross_validation.seed, 99);
        assert_eq!(config.models.ridge_logistic.lambda, Some(0.01));
        assert_eq!(config.models.ridge_logistic.threshold, ThresholdPolicy::Balanced);
        assert!(!config.models.qda.enabled);
        assert!(config.models.lda.enabled);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cross_validation]\nfolds = 1").unwrap();
        let err = load_config(Some(file.path()), &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, MlError::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(
            Some(Path::new("/nonexistent/bluetarp.toml")),
            &ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MlError::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = EvaluationConfig::default();
        config.models.knn.neighbor_grid = Some(vec![3, 5]);
        config.models.lda.threshold = ThresholdPolicy::Balanced;
        let rendered = config.to_toml().unwrap();
        let parsed: EvaluationConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
