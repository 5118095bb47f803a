//! Plain-text summary table for a comparison report.

use bluetarp_ml::training::{ComparisonReport, ModelOutcome};

const HEADERS: [&str; 11] = [
    "model", "spec", "threshold", "TP", "FP", "TN", "FN", "TPR", "TNR", "precision", "AUC",
];

fn rate(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

/// Model and spec columns are left-aligned, numbers right-aligned.
fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &w))| {
            if i < 2 {
                format!("{cell:<w$}")
            } else {
                format!("{cell:>w$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

/// Render one row per model, failures included, with aligned columns.
pub fn render(report: &ComparisonReport) -> String {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(report.models.len());
    let mut failures = Vec::new();

    for outcome in &report.models {
        match outcome {
            ModelOutcome::Completed { family, result } => {
                let m = &result.metrics;
                rows.push(vec![
                    family.to_string(),
                    result.spec.to_string(),
                    format!("{:.4}", result.threshold),
                    m.true_positives().to_string(),
                    m.false_positives().to_string(),
                    m.true_negatives().to_string(),
                    m.false_negatives().to_string(),
                    rate(m.tpr()),
                    rate(m.tnr()),
                    rate(m.precision()),
                    rate(m.auc()),
                ]);
            }
            ModelOutcome::Failed { family, error, .. } => {
                let mut row = vec![family.to_string(), "FAILED".to_string()];
                row.resize(HEADERS.len(), "-".to_string());
                rows.push(row);
                failures.push(format!("{family}: {error}"));
            }
        }
    }

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let p = &report.provenance;
    let mut out = format!(
        "run {}  |  {} observations ({} targets)  |  {} folds, seed {}\n\n",
        p.run_id, p.dataset.observations, p.dataset.targets, p.folds, p.seed
    );
    out.push_str(&format_row(HEADERS.iter().copied(), &widths));
    out.push('\n');
    let total: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    out.push_str(&"-".repeat(total));
    for row in &rows {
        out.push('\n');
        out.push_str(&format_row(row.iter().map(String::as_str), &widths));
    }
    for failure in failures {
        out.push_str("\n\n");
        out.push_str(&failure);
    }
    out
}
