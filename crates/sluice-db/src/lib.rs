use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sluice_core::AppConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
const BUSY_TIMEOUT_SECS: u64 = 5;

// Path relative to crates/sluice-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: DEFAULT_MIN_CONNECTIONS.min(config.db_max_connections),
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    /// A uniqueness, check, or foreign-key constraint rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// The unit of work was already committed or rolled back.
    #[error("unit of work session is closed")]
    SessionClosed,
    #[error("stored row could not be decoded: {0}")]
    Decode(String),
    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation()
                || db_err.is_check_violation()
                || db_err.is_foreign_key_violation()
            {
                return DbError::Constraint(db_err.message().to_owned());
            }
        }
        DbError::Sqlx(err)
    }
}

/// Connect to a `SQLite` pool using explicit URL and config.
///
/// The database file and its parent directory are created when missing, and
/// the connection runs in WAL mode so readers do not block the pipeline's
/// writer.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the URL is malformed or the connection cannot
/// be established, or [`DbError::Io`] if the parent directory cannot be
/// created.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));

    ensure_parent_dir(options.get_filename())?;

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Connect using the settings carried by [`AppConfig`].
///
/// # Errors
///
/// See [`connect_pool`].
pub async fn connect_pool_from_config(config: &AppConfig) -> Result<SqlitePool, DbError> {
    connect_pool(&config.database_url, PoolConfig::from_app_config(config)).await
}

/// Open a private in-memory database with all migrations applied.
///
/// Every connection to `sqlite::memory:` gets its own database, so the pool is
/// pinned to a single connection that never expires.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or a migration fails.
pub async fn connect_in_memory() -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist on a fresh database; treat
    // absence as zero applied.
    let applied_before = count_applied_migrations(pool).await;

    MIGRATOR.run(pool).await?;

    let applied_after = count_applied_migrations(pool).await;
    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

async fn count_applied_migrations(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &SqlitePool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}

fn ensure_parent_dir(filename: &Path) -> Result<(), std::io::Error> {
    if filename.as_os_str() == ":memory:" {
        return Ok(());
    }
    match filename.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}


mod session;

pub mod analytics;
pub mod comments;
pub mod pipeline_runs;
pub mod posts;
pub mod repository;
pub mod seed;
pub mod unit_of_work;
pub mod users;

pub use analytics::{analytics_report, generate_report};
pub use comments::{CommentMapping, CommentRepository, CommentRow};
pub use pipeline_runs::{PipelineRunMapping, PipelineRunRepository, PipelineRunRow};
pub use posts::{PostMapping, PostRepository, PostRow};
pub use repository::{EntityMapping, Repository, RowQuery};
pub use seed::{seed_mock_data, SeedSummary};
pub use unit_of_work::{transaction, UnitOfWork};
pub use users::{UserMapping, UserRepository, UserRow};
