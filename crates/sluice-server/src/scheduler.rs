//! Cron-driven pipeline runs.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::runner::PipelineRunner;

/// Start the scheduler with the pipeline job when `schedule` is set.
///
/// The returned handle must be kept alive; dropping it stops the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler fails to start.
pub async fn build_scheduler(
    runner: PipelineRunner,
    schedule: Option<&str>,
) -> Result<Option<JobScheduler>, JobSchedulerError> {
    let Some(schedule) = schedule else {
        tracing::info!("SLUICE_PIPELINE_SCHEDULE not set; scheduled runs disabled");
        return Ok(None);
    };

    let scheduler = JobScheduler::new().await?;
    register_pipeline_job(&scheduler, runner, schedule).await?;
    scheduler.start().await?;
    Ok(Some(scheduler))
}

async fn register_pipeline_job(
    scheduler: &JobScheduler,
    runner: PipelineRunner,
    schedule: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(schedule, move |_uuid, _lock| {
        let runner = runner.clone();
        Box::pin(async move {
            run_scheduled(&runner).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(schedule, "scheduler: pipeline job registered");
    Ok(())
}

async fn run_scheduled(runner: &PipelineRunner) {
    tracing::info!("scheduler: starting pipeline run");
    match runner.run_if_idle().await {
        None => tracing::warn!("scheduler: a pipeline run is already active; skipping"),
        Some(Ok(outcome)) => tracing::info!(
            run_id = ?outcome.run.id,
            records = ?outcome.run.records_processed,
            "scheduler: pipeline run complete"
        ),
        Some(Err(e)) => tracing::error!(error = %e, "scheduler: pipeline run failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::test_support::runner;

    #[tokio::test]
    async fn missing_schedule_disables_the_scheduler() {
        let pool = sluice_db::connect_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let scheduler = build_scheduler(runner(pool, dir.path(), false), None)
            .await
            .unwrap();
        assert!(scheduler.is_none());
    }

    #[tokio::test]
    async fn invalid_cron_expression_is_rejected() {
        let pool = sluice_db::connect_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();

        let result = build_scheduler(runner(pool, dir.path(), false), Some("every tuesday")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn scheduled_run_records_a_pipeline_run() {
        let pool = sluice_db::connect_in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(pool.clone(), dir.path(), false);

        run_scheduled(&runner).await;

        let runs = sluice_pipeline::recent_runs(&pool, 5).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, sluice_core::PipelineStatus::Success);
    }
}
