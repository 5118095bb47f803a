//! bluetarp CLI — cross-validated comparison of blue-tarp pixel classifiers.

mod commands;
mod table;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// bluetarp: compare tarp detectors on one shared set of folds
#[derive(Parser, Debug)]
#[command(name = "bluetarp", version, about, long_about = None)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Cross-validate every enabled model and print a metrics table
    Evaluate {
        /// Pixel table with Class,Red,Green,Blue columns
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Random seed for the fold assignment
        #[arg(long)]
        seed: Option<u64>,

        /// Number of folds
        #[arg(short = 'k', long)]
        folds: Option<usize>,

        /// Run folds on all cores
        #[arg(long)]
        parallel: bool,

        /// Write the full JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include every out-of-fold score in the JSON report
        #[arg(long)]
        include_scores: bool,
    },
    /// Print the fold sizes a seed produces
    Folds {
        /// Number of observations
        #[arg(short, long)]
        n: usize,

        /// Number of folds
        #[arg(short, long, default_value_t = 10)]
        k: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Inspect or create configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write the default configuration to a file
    Init {
        #[arg(default_value = "bluetarp.toml")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "bluetarp", "bluetarp")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "bluetarp.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    commands::handle_command(cli.command, cli.config.as_deref())
}
