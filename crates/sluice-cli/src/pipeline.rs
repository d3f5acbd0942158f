//! `pipeline` sub-commands: trigger a full run, list recent runs.

use clap::Subcommand;
use sluice_core::{AppConfig, PipelineRun};
use sluice_pipeline::Pipeline;
use sqlx::SqlitePool;

#[derive(Debug, Subcommand)]
pub enum PipelineCommands {
    /// Extract, transform, store, and analyze in one tracked run
    Run,
    /// List the most recent pipeline runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

pub(crate) async fn run(
    pool: SqlitePool,
    config: &AppConfig,
    command: PipelineCommands,
) -> anyhow::Result<()> {
    match command {
        PipelineCommands::Run => run_pipeline(pool, config).await,
        PipelineCommands::Runs { limit } => list_runs(&pool, limit).await,
    }
}

/// # Errors
///
/// Returns an error if the HTTP client cannot be built or any pipeline step
/// fails. A failed run is recorded before the error is returned.
async fn run_pipeline(pool: SqlitePool, config: &AppConfig) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(pool, config)?;
    let outcome = pipeline.run_full_pipeline().await?;

    println!(
        "run {} succeeded: {} records processed",
        outcome.run.id.unwrap_or_default(),
        outcome.run.records_processed.unwrap_or_default()
    );
    for path in &outcome.report_paths {
        println!("  report: {}", path.display());
    }
    Ok(())
}

async fn list_runs(pool: &SqlitePool, limit: i64) -> anyhow::Result<()> {
    let runs = sluice_pipeline::recent_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no pipeline runs recorded; run `pipeline run` first");
        return Ok(());
    }

    println!(
        "{:<6} {:<8} {:<20} {:<20} {:>8}  error",
        "id", "status", "started", "completed", "records"
    );
    for run in &runs {
        println!("{}", format_run_row(run));
    }
    Ok(())
}

pub(crate) fn format_run_row(run: &PipelineRun) -> String {
    let fmt_time = |t: chrono::DateTime<chrono::Utc>| t.format("%Y-%m-%d %H:%M:%S").to_string();
    format!(
        "{:<6} {:<8} {:<20} {:<20} {:>8}  {}",
        run.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
        run.status.as_str(),
        fmt_time(run.started_at),
        run.completed_at.map_or_else(|| "-".to_string(), fmt_time),
        run.records_processed
            .map_or_else(|| "-".to_string(), |n| n.to_string()),
        run.error_message.as_deref().unwrap_or(""),
    )
}
