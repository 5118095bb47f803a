//! CLI subcommand handlers.

use crate::table;
use crate::{Commands, ConfigAction};
use anyhow::Context;
use bluetarp_ml::config::{ConfigOverrides, EvaluationConfig, load_config};
use bluetarp_ml::data::CsvSource;
use bluetarp_ml::training::{ComparisonRunner, assign};
use std::path::Path;

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, config_path: Option<&Path>) -> anyhow::Result<()> {
    match command {
        Commands::Evaluate {
            data,
            seed,
            folds,
            parallel,
            output,
            include_scores,
        } => {
            let overrides = ConfigOverrides {
                data_path: data,
                folds,
                seed,
                parallel_folds: parallel.then_some(true),
            };
            let rendered = handle_evaluate(config_path, &overrides, output.as_deref(), include_scores)?;
            println!("{rendered}");
            Ok(())
        }
        Commands::Folds { n, k, seed } => {
            println!("{}", handle_folds(n, k, seed)?);
            Ok(())
        }
        Commands::Config { action } => handle_config(action, config_path),
    }
}

fn handle_evaluate(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    output: Option<&Path>,
    include_scores: bool,
) -> anyhow::Result<String> {
    let config = load_config(config_path, overrides).context("Failed to load configuration")?;
    let data_path = config
        .data
        .path
        .clone()
        .context("No pixel table given: pass --data or set data.path")?;
    let delimiter = u8::try_from(config.data.delimiter)
        .with_context(|| format!("Unsupported delimiter {:?}", config.data.delimiter))?;

    let dataset = CsvSource::new(&data_path)
        .with_delimiter(delimiter)
        .load()
        .with_context(|| format!("Failed to load {}", data_path.display()))?;

    let report = ComparisonRunner::new(&dataset, &config)
        .with_scores(include_scores)
        .run()
        .context("Comparison failed")?;

    if let Some(path) = output {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }
    Ok(table::render(&report))
}

fn handle_folds(n: usize, k: usize, seed: u64) -> anyhow::Result<String> {
    let folds = assign(n, k, seed)?;
    let mut out = format!("{n} observations, {k} folds, seed {seed}\n");
    for (i, size) in folds.fold_sizes().iter().enumerate() {
        out.push_str(&format!("  fold {:>3}: {size}\n", i + 1));
    }
    Ok(out.trim_end().to_string())
}

fn handle_config(action: ConfigAction, config_path: Option<&Path>) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, &ConfigOverrides::default())
                .context("Failed to load config")?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigAction::Init { path } => {
            let created = init_config(&path)?;
            if created {
                println!("Created default configuration at: {}", path.display());
            } else {
                println!("Configuration file already exists at: {}", path.display());
            }
            Ok(())
        }
    }
}

/// Write the default configuration unless the file already exists.
fn init_config(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, EvaluationConfig::default().to_toml()?)?;
    Ok(true)
}
