//! End-to-end tests: CSV on disk through folds, models, metrics and the report.

use bluetarp_ml::algorithms::ModelSpec;
use bluetarp_ml::config::{ConfigOverrides, EvaluationConfig, ThresholdPolicy, load_config};
use bluetarp_ml::data::{CsvSource, PixelClass};
use bluetarp_ml::error::MlError;
use bluetarp_ml::eval::summarize;
use bluetarp_ml::training::{
    ComparisonRunner, CrossValidator, ExecutionMode, ModelOutcome, assign,
};
use bluetarp_ml::{Dataset, ModelFamily};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

/// Deterministic pseudo-image: tarps are bright blue, everything else is not.
fn write_pixel_table(rows: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Class,Red,Green,Blue").unwrap();
    let classes = ["Blue Tarp", "Rooftop", "Soil", "Various Non-Tarp", "Vegetation"];
    for i in 0..rows {
        let class = classes[i % classes.len()];
        let (jr, jg, jb) = ((i * 37 % 23) as u8, (i * 53 % 19) as u8, (i * 71 % 29) as u8);
        let (r, g, b) = match class {
            "Blue Tarp" => (30 + jr, 100 + jg, 190 + jb),
            "Rooftop" => (170 + jr, 160 + jg, 150 + jb),
            "Soil" => (150 + jr, 120 + jg, 80 + jb),
            "Various Non-Tarp" => (110 + jr, 110 + jg, 100 + jb),
            _ => (60 + jr, 130 + jg, 50 + jb),
        };
        writeln!(file, "{class},{r},{g},{b}").unwrap();
    }
    file.flush().unwrap();
    file
}

fn small_config() -> EvaluationConfig {
    let mut config = EvaluationConfig::default();
    config.models.knn.neighbor_grid = Some(vec![1, 3, 5, 7]);
    config.models.ridge_logistic.lambda_grid = vec![1e-1, 1e-2, 1e-3, 1e-4];
    config
}

#[test]
fn full_comparison_from_csv() {
    let table = write_pixel_table(200);
    let dataset = CsvSource::new(table.path()).load().unwrap();
    assert_eq!(dataset.len(), 200);
    assert_eq!(dataset.target_count(), 40);
    assert_eq!(dataset.class_counts().get(&PixelClass::BlueTarp), Some(&40));

    let config = small_config();
    let report = ComparisonRunner::new(&dataset, &config)
        .with_scores(true)
        .run()
        .unwrap();

    assert_eq!(report.models.len(), 5);
    assert_eq!(report.failed_count(), 0);
    assert_eq!(report.provenance.folds, 10);
    assert_eq!(report.provenance.seed, 42);
    assert_eq!(report.provenance.fold_sizes.iter().sum::<usize>(), 200);
    assert_eq!(report.provenance.dataset.fingerprint, dataset.fingerprint());

    for (family, result) in report.completed() {
        let scores = result.scores.as_ref().unwrap();
        assert_eq!(scores.len(), 200, "{family}");
        assert_eq!(result.folds.iter().map(|f| f.test_size).sum::<usize>(), 200);
        assert!(result.metrics.auc().unwrap() > 0.95, "{family}");
        let c = result.metrics.confusion();
        assert_eq!(c.total(), 200);
        assert_eq!(c.positives(), 40);
    }

    let knn = report.outcome(ModelFamily::Knn).unwrap().result().unwrap();
    assert_eq!(knn.sweep.as_ref().unwrap().trials.len(), 4);
    assert!(matches!(knn.spec, ModelSpec::Knn { .. }));
}

#[test]
fn report_scores_match_direct_cross_validation() {
    let table = write_pixel_table(120);
    let dataset = CsvSource::new(table.path()).load().unwrap();
    let mut config = EvaluationConfig::default();
    config.cross_validation.folds = 6;
    config.cross_validation.seed = 5;
    config.models.ridge_logistic.lambda = Some(1e-2);

    let report = ComparisonRunner::new(&dataset, &config)
        .with_scores(true)
        .run()
        .unwrap();
    let folds = assign(dataset.len(), 6, 5).unwrap();
    let cv = CrossValidator::new(&dataset, &folds).unwrap();

    for (family, result) in report.completed() {
        let direct = cv.evaluate(&result.spec).unwrap();
        assert_eq!(result.scores.as_ref(), Some(&direct.scores), "{family}");
    }
}

#[test]
fn ridge_threshold_is_configurable() {
    let table = write_pixel_table(100);
    let dataset = CsvSource::new(table.path()).load().unwrap();
    let mut config = EvaluationConfig::default();
    config.models.ridge_logistic.lambda = Some(1e-3);
    config.models.ridge_logistic.threshold = ThresholdPolicy::Fixed { value: 0.25 };

    let report = ComparisonRunner::new(&dataset, &config).run().unwrap();
    let ridge = report
        .outcome(ModelFamily::RidgeLogistic)
        .unwrap()
        .result()
        .unwrap();
    assert_eq!(ridge.threshold, 0.25);
    assert_eq!(ridge.metrics.threshold(), 0.25);
}

#[test]
fn degenerate_dataset_isolates_failures() {
    // Five targets over three folds: some training set keeps at most three,
    // too few for a 3x3 target covariance.
    let rows = (0..30).map(|i| {
        let j = i as u8;
        if i < 5 {
            (PixelClass::BlueTarp, 20 + j, 90 + j, 200 + j)
        } else {
            (PixelClass::Soil, 120 + j, 100 + j % 7, 60 + j % 11)
        }
    });
    let dataset = Dataset::from_rows(rows).unwrap();
    let mut config = EvaluationConfig::default();
    config.cross_validation.folds = 3;
    config.models.ridge_logistic.lambda = Some(1e-2);

    let report = ComparisonRunner::new(&dataset, &config).run().unwrap();
    match report.outcome(ModelFamily::Qda).unwrap() {
        ModelOutcome::Failed { fold, error, .. } => {
            assert!(fold.is_some());
            assert!(error.contains("qda"), "{error}");
        }
        other => panic!("QDA should fail, got {other:?}"),
    }
    assert!(report.outcome(ModelFamily::Knn).unwrap().result().is_some());
}

#[test]
fn malformed_row_reports_line() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Class,Red,Green,Blue\nSoil,1,2,3\nSoil,1,300,3").unwrap();
    let err = CsvSource::new(file.path()).load().unwrap_err();
    match err {
        MlError::Input { line, .. } => assert_eq!(line, 3),
        other => panic!("expected input error, got {other}"),
    }
}

#[test]
fn separable_scores_summary() {
    let targets: Vec<bool> = (0..10).map(|i| i < 3).collect();
    let scores: Vec<f64> = targets.iter().map(|&t| if t { 0.9 } else { 0.1 }).collect();
    let m = summarize(&targets, &scores, 0.5).unwrap();
    assert_eq!(
        (m.true_positives(), m.false_positives(), m.true_negatives(), m.false_negatives()),
        (3, 0, 7, 0)
    );
    assert_eq!(m.accuracy(), 1.0);
    assert_eq!(m.auc(), Some(1.0));
}

#[test]
fn config_file_drives_runner() {
    let table = write_pixel_table(60);
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[cross_validation]
folds = 4
parallel_folds = true

[models.lda]
enabled = false

[models.ridge_logistic]
lambda = 0.001
"#
    )
    .unwrap();

    let overrides = ConfigOverrides {
        data_path: Some(table.path().to_path_buf()),
        ..Default::default()
    };
    let config = load_config(Some(file.path()), &overrides).unwrap();
    assert_eq!(config.data.path.as_deref(), Some(table.path()));

    let dataset = CsvSource::new(table.path()).load().unwrap();
    let report = ComparisonRunner::new(&dataset, &config).run().unwrap();
    assert_eq!(report.execution, ExecutionMode::Parallel);
    assert_eq!(report.provenance.folds, 4);
    assert!(report.outcome(ModelFamily::Lda).is_none());
    assert_eq!(report.models.len(), 4);
}
