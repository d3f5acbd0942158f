//! End-to-end pipeline run: extract, archive, transform, store, analyze.
//!
//! Every invocation is tracked by one [`PipelineRun`] row. The row is written
//! as `Running` before any work starts and rewritten exactly once at the end,
//! either `Success` with record counts or `Failed` with the error text.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use sluice_core::{
    AnalyticsReport, AppConfig, CoreError, PipelineRun, DEFAULT_ENGAGEMENT_TOP_N,
};
use sluice_db::{analytics_report, DbError, UnitOfWork};
use sluice_extract::{ExtractConfig, ExtractError, Extractor, PlaceholderClient, Resource};
use sqlx::sqlite::SqlitePool;
use thiserror::Error;

use crate::archive::{ArchiveError, FileArchive};
use crate::report::{ReportError, ReportFormat, ReportRenderer};
use crate::transform::{transform_snapshot, CleanBatch};

/// A step-level failure. Recorded on the run, then returned to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("storage failed: {0}")]
    Db(#[from] DbError),

    #[error("archiving failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("report rendering failed: {0}")]
    Report(#[from] ReportError),

    #[error(transparent)]
    Run(#[from] CoreError),
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run: PipelineRun,
    pub report: AnalyticsReport,
    pub report_paths: Vec<PathBuf>,
}

pub struct Pipeline<E> {
    pool: SqlitePool,
    extractor: E,
    archive: FileArchive,
    renderer: ReportRenderer,
    top_n: i64,
}

impl Pipeline<PlaceholderClient> {
    /// Pipeline against the configured HTTP source and directories.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the HTTP client cannot be built.
    pub fn from_config(pool: SqlitePool, config: &AppConfig) -> Result<Self, ExtractError> {
        let extractor = PlaceholderClient::new(&ExtractConfig::from_app_config(config))?;
        Ok(Self::new(
            pool,
            extractor,
            FileArchive::new(&config.data_dir),
            ReportRenderer::new(&config.reports_dir),
        )
        .with_top_n(config.engagement_top_n))
    }
}

impl<E: Extractor + 'static> Pipeline<E> {
    /// Erase the extractor type so pipelines over different sources share
    /// one type.
    #[must_use]
    pub fn boxed(self) -> Pipeline<Box<dyn Extractor>> {
        Pipeline {
            pool: self.pool,
            extractor: Box::new(self.extractor),
            archive: self.archive,
            renderer: self.renderer,
            top_n: self.top_n,
        }
    }
}

impl<E: Extractor> Pipeline<E> {
    pub fn new(
        pool: SqlitePool,
        extractor: E,
        archive: FileArchive,
        renderer: ReportRenderer,
    ) -> Self {
        Self {
            pool,
            extractor,
            archive,
            renderer,
            top_n: DEFAULT_ENGAGEMENT_TOP_N,
        }
    }

    #[must_use]
    pub fn with_top_n(mut self, top_n: i64) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    /// Execute one full run and record its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] from the first failing step. The run row is
    /// marked `Failed` before returning; if even that write fails the
    /// original error is still the one returned.
    pub async fn run_full_pipeline(&self) -> Result<PipelineOutcome, PipelineError> {
        let started_at = Utc::now();
        let mut pending = PipelineRun::pending(started_at);
        pending.mark_running()?;
        let mut run = save_run(&self.pool, &pending).await?;
        tracing::info!(run_id = ?run.id, "pipeline run started");

        let result = self.run_steps(&run, started_at).await;
        match result {
            Ok(outcome) => {
                tracing::info!(
                    run_id = ?outcome.run.id,
                    records = ?outcome.run.records_processed,
                    "pipeline run succeeded"
                );
                Ok(outcome)
            }
            Err(err) => {
                self.fail_run_best_effort(&mut run, &err).await;
                Err(err)
            }
        }
    }

    /// Most recent runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_recent_runs(&self, limit: i64) -> Result<Vec<PipelineRun>, DbError> {
        recent_runs(&self.pool, limit).await
    }

    async fn run_steps(
        &self,
        run: &PipelineRun,
        started_at: DateTime<Utc>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let date = started_at.date_naive();

        let snapshot = self.extractor.extract_all().await?;
        for resource in Resource::ALL {
            self.archive
                .save_raw(snapshot.records(resource), resource.label(), date)
                .await?;
        }

        let batch = transform_snapshot(&snapshot, Utc::now());
        self.archive_processed(&batch, date).await?;

        store_batch(&self.pool, &batch).await?;

        let report = analytics_report(&self.pool, self.top_n).await?;
        let mut report_paths = Vec::with_capacity(2);
        for format in [ReportFormat::Json, ReportFormat::Csv] {
            report_paths.push(self.renderer.render(&report, format).await?);
        }

        let mut finished = run.clone();
        finished.mark_succeeded(
            Utc::now(),
            i64::try_from(batch.total()).unwrap_or(i64::MAX),
            batch.metadata(),
        )?;
        let run = save_run(&self.pool, &finished).await?;

        Ok(PipelineOutcome {
            run,
            report,
            report_paths,
        })
    }

    async fn archive_processed(
        &self,
        batch: &CleanBatch,
        date: NaiveDate,
    ) -> Result<(), ArchiveError> {
        self.archive
            .save_processed(&batch.users, Resource::Users.label(), date)
            .await?;
        self.archive
            .save_processed(&batch.posts, Resource::Posts.label(), date)
            .await?;
        self.archive
            .save_processed(&batch.comments, Resource::Comments.label(), date)
            .await?;
        Ok(())
    }

    async fn fail_run_best_effort(&self, run: &mut PipelineRun, err: &PipelineError) {
        tracing::error!(run_id = ?run.id, error = %err, "pipeline run failed");

        if let Err(mark_err) = run.mark_failed(Utc::now(), err.to_string()) {
            tracing::error!(run_id = ?run.id, error = %mark_err, "cannot mark run as failed");
            return;
        }
        if let Err(save_err) = save_run(&self.pool, run).await {
            tracing::error!(
                run_id = ?run.id,
                error = %save_err,
                "failed to record pipeline run failure"
            );
        }
    }
}

/// Upsert every cleaned entity in one unit of work: users, posts, and
/// comments become visible together or not at all.
///
/// # Errors
///
/// Returns [`DbError`] on the first failed write; nothing is committed.
pub async fn store_batch(pool: &SqlitePool, batch: &CleanBatch) -> Result<(), DbError> {
    let uow = UnitOfWork::begin(pool).await?;
    for user in &batch.users {
        uow.users().add(user).await?;
    }
    for post in &batch.posts {
        uow.posts().add(post).await?;
    }
    for comment in &batch.comments {
        uow.comments().add(comment).await?;
    }
    uow.commit().await?;

    tracing::info!(
        users = batch.users.len(),
        posts = batch.posts.len(),
        comments = batch.comments.len(),
        "stored cleaned records"
    );
    Ok(())
}

/// Most recent runs on `pool`, newest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn recent_runs(pool: &SqlitePool, limit: i64) -> Result<Vec<PipelineRun>, DbError> {
    let uow = UnitOfWork::begin(pool).await?;
    let runs = uow.pipeline_runs().get_recent(limit).await?;
    uow.rollback().await?;
    Ok(runs)
}

async fn save_run(pool: &SqlitePool, run: &PipelineRun) -> Result<PipelineRun, DbError> {
    let uow = UnitOfWork::begin(pool).await?;
    let saved = uow.pipeline_runs().add(run).await?;
    uow.commit().await?;
    Ok(saved)
}
