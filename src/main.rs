//! revenue-pipeline - Revenue ingestion, regression and correction
//!
//! Two batch stages over a PostgreSQL table of revenue records.
//!
//! # Usage
//!
//! ```bash
//! # Stage 1: load a CSV/spreadsheet, clean it and append it to the store
//! revenue-pipeline ingest data/revenue.xlsx
//!
//! # Stage 2: fit, report and write back corrections
//! revenue-pipeline train --output-dir reports
//!
//! # Plan corrections without writing them
//! revenue-pipeline train --dry-run
//!
//! # Show the effective configuration
//! revenue-pipeline check-config
//! ```
//!
//! # Environment Variables
//!
//! - `REVENUE_CONFIG`: Path to pipeline.toml (default: ./pipeline.toml)
//! - `REVENUE_DB_HOST`, `REVENUE_DB_PORT`, `REVENUE_DB_NAME`, `REVENUE_DB_USER`: Connection overrides
//! - `REVENUE_DB_PASSWORD` (or `PGPASSWORD`): Database password, never read from files
//! - `DATABASE_URL`: Full connection URL, wins over the individual fields
//! - `REVENUE_TABLE`: Destination table (default: predictions)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use revenue_pipeline::config::PipelineConfig;
use revenue_pipeline::ingest::FileFormat;
use revenue_pipeline::ml_engine::metrics_lines;
use revenue_pipeline::pipeline::{ingest_file, train_and_correct, IngestSummary, TrainingReport};
use revenue_pipeline::storage::PgRecordStore;
use revenue_pipeline::PipelineError;

#[derive(Parser, Debug)]
#[command(name = "revenue-pipeline")]
#[command(about = "Revenue data ingestion, regression and correction pipeline")]
#[command(version)]
struct CliArgs {
    /// Path to a pipeline.toml (overrides REVENUE_CONFIG and ./pipeline.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Load a CSV or spreadsheet, clean it and append the rows to the store
    Ingest {
        /// Input file (.csv, .xlsx, .xls)
        file: PathBuf,
        /// Force the input format instead of using the file extension
        #[arg(long, value_name = "csv|xlsx|xls")]
        format: Option<FileFormat>,
        /// Destination table (overrides config)
        #[arg(long)]
        table: Option<String>,
    },

    /// Fit the revenue model, write reports and correct outlying rows
    Train {
        /// Source table (overrides config)
        #[arg(long)]
        table: Option<String>,
        /// Directory for the plot and results CSV (overrides config)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Skip rendering the PNG plot
        #[arg(long)]
        no_plot: bool,
        /// Plan corrections but do not write them
        #[arg(long)]
        dry_run: bool,
    },

    /// Load and validate the configuration, then print the effective values
    CheckConfig,
}

/// Log a stage failure with its kind before it is wrapped for the caller.
fn log_failure(e: PipelineError) -> PipelineError {
    error!(kind = e.kind(), error = %e, "Stage failed");
    e
}

async fn run_ingest(
    config: &PipelineConfig,
    file: &Path,
    format: Option<FileFormat>,
) -> Result<IngestSummary> {
    let table = config.database.table.as_str();
    let mut store = PgRecordStore::connect(&config.database)
        .await
        .map_err(log_failure)
        .context("Failed to connect to PostgreSQL")?;

    // Close the connection on every path before surfacing the result.
    let result = ingest_body(&mut store, file, format, table).await;
    store.close().await;

    result
        .map_err(log_failure)
        .with_context(|| format!("Ingest of {} failed", file.display()))
}

async fn ingest_body(
    store: &mut PgRecordStore,
    file: &Path,
    format: Option<FileFormat>,
    table: &str,
) -> Result<IngestSummary, PipelineError> {
    store.ensure_table(table).await?;
    ingest_file(store, file, format, table, Utc::now()).await
}

async fn run_train(config: &PipelineConfig, dry_run: bool) -> Result<TrainingReport> {
    let mut store = PgRecordStore::connect(&config.database)
        .await
        .map_err(log_failure)
        .context("Failed to connect to PostgreSQL")?;

    let result = train_and_correct(&mut store, config, dry_run).await;
    store.close().await;

    result.map_err(log_failure).context("Training stage failed")
}

fn print_training_report(report: &TrainingReport) {
    let lines = metrics_lines(&report.evaluation.full, &report.evaluation.test);
    let (complete, test) = lines.split_at(3);
    println!("Complete Dataset Metrics:");
    for line in &complete[1..] {
        println!("{line}");
    }
    println!();
    println!("Test Set Metrics:");
    for line in &test[1..] {
        println!("{line}");
    }
    println!();
    println!("Complete results saved to '{}'", report.results_path.display());
    if let Some(plot) = &report.plot_path {
        println!("Plot saved to '{}'", plot.display());
    }
    if report.plan.skipped_zero_actual > 0 {
        println!(
            "Skipped {} row(s) with zero actual revenue",
            report.plan.skipped_zero_actual
        );
    }
    if report.applied > 0 {
        println!("Database updated with {} corrected value(s)", report.applied);
    } else if !report.plan.is_empty() {
        println!(
            "{} correction(s) planned, none written",
            report.plan.corrections.len()
        );
    } else {
        println!("No corrections needed");
    }
}

fn print_config(config: &PipelineConfig) -> Result<()> {
    let rendered = config.to_toml().context("Failed to render configuration")?;
    println!("{rendered}");
    println!(
        "# password: {}",
        if config.database.password.is_some() { "set (redacted)" } else { "not set" }
    );
    if config.database.url.is_some() {
        println!("# DATABASE_URL: set (redacted), overrides [database] connection fields");
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = PipelineConfig::load(args.config.as_deref())
        .context("Failed to load pipeline configuration")?;

    match args.command {
        SubCommand::Ingest { file, format, table } => {
            if let Some(table) = table {
                config.database.table = table;
            }
            config.validate().context("Invalid command-line overrides")?;

            info!(file = %file.display(), table = %config.database.table, "Starting ingest");
            let summary = run_ingest(&config, &file, format).await?;
            println!(
                "Successfully pushed {} rows to {} ({} dropped during cleaning)",
                summary.rows_written, config.database.table, summary.stats.dropped_rows
            );
        }

        SubCommand::Train {
            table,
            output_dir,
            no_plot,
            dry_run,
        } => {
            if let Some(table) = table {
                config.database.table = table;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            if no_plot {
                config.output.plot = false;
            }
            config.validate().context("Invalid command-line overrides")?;

            info!(table = %config.database.table, dry_run, "Starting training");
            let report = run_train(&config, dry_run).await?;
            print_training_report(&report);
        }

        SubCommand::CheckConfig => {
            print_config(&config)?;
            info!("Configuration is valid");
        }
    }

    Ok(())
}
