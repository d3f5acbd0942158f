mod pipeline;
mod report;

use clap::{Parser, Subcommand};
use sluice_pipeline::ReportFormat;
use tracing_subscriber::EnvFilter;

use crate::pipeline::PipelineCommands;

#[derive(Debug, Parser)]
#[command(name = "sluice")]
#[command(about = "Extract, clean, store, and analyze placeholder API data")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run the pipeline or inspect past runs
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Print the analytics summary for the stored data
    Analytics {
        /// Number of most-commented posts to include
        #[arg(long)]
        top_n: Option<i64>,
    },
    /// Render the current analytics to a report file
    Report {
        /// Output format: json or csv
        #[arg(long, default_value = "json", value_parser = parse_format)]
        format: ReportFormat,
    },
    /// Show the resolved configuration
    Status,
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
    /// Insert sample users, posts, comments, and runs into an empty database
    Seed,
}

fn parse_format(value: &str) -> Result<ReportFormat, String> {
    value.parse().map_err(|e: sluice_pipeline::ReportError| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = sluice_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("sluice: no command given; run `sluice --help` for usage");
        return Ok(());
    };

    match command {
        Commands::Status => print_status(&config),
        Commands::Db { command } => {
            let pool = sluice_db::connect_pool_from_config(&config).await?;
            run_db(&pool, command).await?;
            pool.close().await;
        }
        Commands::Pipeline { command } => {
            let pool = connect_migrated(&config).await?;
            pipeline::run(pool.clone(), &config, command).await?;
            pool.close().await;
        }
        Commands::Analytics { top_n } => {
            let pool = connect_migrated(&config).await?;
            report::run_analytics(&pool, top_n.unwrap_or(config.engagement_top_n)).await?;
            pool.close().await;
        }
        Commands::Report { format } => {
            let pool = connect_migrated(&config).await?;
            report::run_report(&pool, &config, format).await?;
            pool.close().await;
        }
    }

    Ok(())
}

async fn connect_migrated(config: &sluice_core::AppConfig) -> anyhow::Result<sqlx::SqlitePool> {
    let pool = sluice_db::connect_pool_from_config(config).await?;
    let applied = sluice_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }
    Ok(pool)
}

async fn run_db(pool: &sqlx::SqlitePool, command: DbCommands) -> anyhow::Result<()> {
    match command {
        DbCommands::Migrate => {
            let applied = sluice_db::run_migrations(pool).await?;
            println!("migrations applied: {applied}");
        }
        DbCommands::Ping => {
            sluice_db::health_check(pool).await?;
            println!("database ok");
        }
        DbCommands::Seed => {
            sluice_db::run_migrations(pool).await?;
            let summary = sluice_db::seed_mock_data(pool).await?;
            if summary.is_empty() {
                println!("database already has users; seed skipped");
            } else {
                println!(
                    "seeded {} users, {} posts, {} comments, {} pipeline runs",
                    summary.users, summary.posts, summary.comments, summary.pipeline_runs
                );
            }
        }
    }
    Ok(())
}

fn print_status(config: &sluice_core::AppConfig) {
    println!("environment:    {}", config.env);
    println!("database:       {}", config.database_scheme());
    println!("api base url:   {}", config.api_base_url);
    println!("data dir:       {}", config.data_dir.display());
    println!("reports dir:    {}", config.reports_dir.display());
    println!(
        "schedule:       {}",
        config.pipeline_schedule.as_deref().unwrap_or("disabled")
    );
}
