//! Storage mapping and history queries for `pipeline_runs`.
//!
//! Runs are inserted with a `NULL` id so `SQLite` assigns one, then saved again
//! through the same upsert once the run reaches a terminal state.

use chrono::{DateTime, Utc};
use sluice_core::{PipelineRun, PipelineStatus, RunMetadata};
use sqlx::types::Json;

use crate::repository::{EntityMapping, Repository, RowQuery};
use crate::DbError;

pub type PipelineRunRepository = Repository<PipelineRunMapping>;

const RUN_COLUMNS: &str =
    "id, status, started_at, completed_at, error_message, records_processed, metadata";

/// A row from the `pipeline_runs` table.
///
/// `status` is one of `pending`, `running`, `success`, `failed`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PipelineRunRow {
    pub id: i64,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub records_processed: Option<i64>,
    pub metadata: Option<Json<RunMetadata>>,
}

pub struct PipelineRunMapping;

impl EntityMapping for PipelineRunMapping {
    type Entity = PipelineRun;
    type Row = PipelineRunRow;

    const TABLE: &'static str = "pipeline_runs";
    const COLUMNS: &'static str = RUN_COLUMNS;

    const UPSERT_SQL: &'static str = "INSERT INTO pipeline_runs \
         (id, status, started_at, completed_at, error_message, records_processed, metadata) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT (id) DO UPDATE SET \
             status = excluded.status, \
             completed_at = excluded.completed_at, \
             error_message = excluded.error_message, \
             records_processed = excluded.records_processed, \
             metadata = excluded.metadata \
         RETURNING id, status, started_at, completed_at, error_message, records_processed, metadata";

    const UPDATE_SQL: &'static str = "UPDATE pipeline_runs SET \
             status = ?2, started_at = ?3, completed_at = ?4, error_message = ?5, \
             records_processed = ?6, metadata = ?7 \
         WHERE id = ?1 \
         RETURNING id, status, started_at, completed_at, error_message, records_processed, metadata";

    fn id(entity: &PipelineRun) -> Option<i64> {
        entity.id
    }

    fn bind<'q>(
        query: RowQuery<'q, PipelineRunRow>,
        run: &'q PipelineRun,
    ) -> RowQuery<'q, PipelineRunRow> {
        query
            .bind(run.id)
            .bind(run.status.as_str())
            .bind(run.started_at)
            .bind(run.completed_at)
            .bind(run.error_message.as_deref())
            .bind(run.records_processed)
            .bind(run.metadata.as_ref().map(Json))
    }

    fn into_entity(row: PipelineRunRow) -> Result<PipelineRun, DbError> {
        let status = row
            .status
            .parse::<PipelineStatus>()
            .map_err(|e| DbError::Decode(e.to_string()))?;
        Ok(PipelineRun {
            id: Some(row.id),
            status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
            records_processed: row.records_processed,
            metadata: row.metadata.map(|json| json.0),
        })
    }
}

impl Repository<PipelineRunMapping> {
    /// Up to `limit` runs, most recently started first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_recent(&self, limit: i64) -> Result<Vec<PipelineRun>, DbError> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM pipeline_runs ORDER BY started_at DESC, id DESC LIMIT ?1"
        );
        self.fetch_all(sqlx::query_as(&sql).bind(limit.max(0))).await
    }
}
