//! Background pipeline execution guarded by an in-process run lock.
//!
//! At most one run is active per process. HTTP triggers return immediately
//! with a task id whose progress is kept in memory until an hour after it
//! finishes; scheduled runs execute in the foreground of their job and are
//! skipped while another run holds the lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use sluice_extract::Extractor;
use sluice_pipeline::{Pipeline, PipelineError, PipelineOutcome};
use tokio::sync::Mutex;
use uuid::Uuid;

pub type SharedPipeline = Pipeline<Box<dyn Extractor>>;

/// How long a finished task stays queryable by id.
const FINISHED_TASK_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub task_id: Uuid,
    pub status: TaskState,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub run_id: Option<i64>,
    pub records_processed: Option<i64>,
    pub error: Option<String>,
}

impl TaskStatus {
    fn running(task_id: Uuid) -> Self {
        Self {
            task_id,
            status: TaskState::Running,
            submitted_at: Utc::now(),
            finished_at: None,
            run_id: None,
            records_processed: None,
            error: None,
        }
    }

    fn finish(&mut self, result: &Result<PipelineOutcome, PipelineError>) {
        self.finished_at = Some(Utc::now());
        match result {
            Ok(outcome) => {
                self.status = TaskState::Completed;
                self.run_id = outcome.run.id;
                self.records_processed = outcome.run.records_processed;
            }
            Err(e) => {
                self.status = TaskState::Failed;
                self.error = Some(e.to_string());
            }
        }
    }
}

#[derive(Clone)]
pub struct PipelineRunner {
    pipeline: Arc<SharedPipeline>,
    pub(crate) run_lock: Arc<Mutex<()>>,
    tasks: Arc<Mutex<HashMap<Uuid, TaskStatus>>>,
    task_ttl: TimeDelta,
}

impl PipelineRunner {
    pub fn new(pipeline: SharedPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            run_lock: Arc::new(Mutex::new(())),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            task_ttl: TimeDelta::seconds(FINISHED_TASK_TTL_SECS),
        }
    }

    #[must_use]
    pub fn with_task_ttl(mut self, task_ttl: TimeDelta) -> Self {
        self.task_ttl = task_ttl;
        self
    }

    /// Start a run on a background task. Returns `None` while another run is
    /// active.
    pub async fn trigger(&self) -> Option<TaskStatus> {
        let guard = Arc::clone(&self.run_lock).try_lock_owned().ok()?;
        let task_id = Uuid::new_v4();
        let status = TaskStatus::running(task_id);
        {
            let mut tasks = self.tasks.lock().await;
            let cutoff = status.submitted_at - self.task_ttl;
            // Running tasks never expire.
            tasks.retain(|_, task| task.finished_at.is_none_or(|at| at > cutoff));
            tasks.insert(task_id, status.clone());
        }
        tracing::info!(%task_id, "pipeline task submitted");

        let runner = self.clone();
        tokio::spawn(async move {
            let result = runner.pipeline.run_full_pipeline().await;
            if let Some(task) = runner.tasks.lock().await.get_mut(&task_id) {
                task.finish(&result);
            }
            drop(guard);
            match result {
                Ok(_) => tracing::info!(%task_id, "pipeline task completed"),
                Err(e) => tracing::warn!(%task_id, error = %e, "pipeline task failed"),
            }
        });

        Some(status)
    }

    /// Run to completion on the caller's task, or return `None` without
    /// running if another run is active.
    pub async fn run_if_idle(&self) -> Option<Result<PipelineOutcome, PipelineError>> {
        let _guard = self.run_lock.try_lock().ok()?;
        Some(self.pipeline.run_full_pipeline().await)
    }

    pub async fn status(&self, task_id: Uuid) -> Option<TaskStatus> {
        self.tasks.lock().await.get(&task_id).cloned()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use serde_json::json;
    use sluice_extract::{ExtractError, RawRecord, Resource};
    use sluice_pipeline::{FileArchive, ReportRenderer};
    use sqlx::SqlitePool;

    use super::*;

    /// One user with one post and two comments, or a failure on every call.
    pub(crate) struct Canned {
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl Extractor for Canned {
        async fn extract(&self, resource: Resource) -> Result<Vec<RawRecord>, ExtractError> {
            if self.fail {
                return Err(ExtractError::UnexpectedShape {
                    resource,
                    found: "null",
                });
            }
            Ok(match resource {
                Resource::Users => vec![json!({
                    "id": 1, "name": "Leanne Graham", "username": "Bret",
                    "email": "sincere@april.biz"
                })],
                Resource::Posts => vec![json!({ "id": 1, "userId": 1, "title": "t", "body": "b" })],
                Resource::Comments => vec![
                    json!({ "id": 1, "postId": 1, "name": "n", "email": "e@x.io", "body": "b" }),
                    json!({ "id": 2, "postId": 1, "name": "n", "email": "e@x.io", "body": "b" }),
                ],
            })
        }
    }

    pub(crate) fn runner(pool: SqlitePool, dir: &std::path::Path, fail: bool) -> PipelineRunner {
        let pipeline = Pipeline::new(
            pool,
            Canned { fail },
            FileArchive::new(dir.join("data")),
            ReportRenderer::new(dir.join("reports")),
        );
        PipelineRunner::new(pipeline.boxed())
    }

    /// Poll until the task leaves `Running`.
    pub(crate) async fn wait_for(runner: &PipelineRunner, task_id: Uuid) -> TaskStatus {
        for _ in 0..200 {
            if let Some(status) = runner.status(task_id).await {
                if status.status != TaskState::Running {
                    return status;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("task {task_id} did not finish");
    }
}
