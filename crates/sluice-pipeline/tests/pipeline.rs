//! Full pipeline runs against an in-memory store and a canned extractor.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sluice_core::{Address, Company, PipelineStatus, User};
use sluice_db::{connect_in_memory, DbError, UnitOfWork};
use sluice_extract::{ExtractError, Extractor, RawRecord, Resource};
use sluice_pipeline::{
    store_batch, ArchiveArea, CleanBatch, FileArchive, Pipeline, PipelineError, ReportRenderer,
};
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

struct Canned {
    fail_on: Option<Resource>,
}

#[async_trait]
impl Extractor for Canned {
    async fn extract(&self, resource: Resource) -> Result<Vec<RawRecord>, ExtractError> {
        if self.fail_on == Some(resource) {
            return Err(ExtractError::UnexpectedShape {
                resource,
                found: "object",
            });
        }
        Ok(match resource {
            Resource::Users => vec![
                raw_user(1, "Leanne Graham", "Bret"),
                raw_user(2, "Ervin Howell", "Antonette"),
            ],
            Resource::Posts => vec![
                json!({ "id": 1, "userId": 1, "title": "first", "body": "a" }),
                json!({ "id": 2, "userId": 1, "title": "second", "body": "b" }),
                json!({ "userId": 2, "title": "no id", "body": "dropped" }),
            ],
            Resource::Comments => vec![
                json!({ "id": 1, "postId": 2, "name": "c1", "email": "x@y.z", "body": "hi" }),
                json!({ "id": 2, "postId": 2, "name": "c2", "email": "x@y.z", "body": "hi" }),
                json!({ "id": 3, "postId": 1, "name": "c3", "email": "x@y.z", "body": "hi" }),
            ],
        })
    }
}

fn raw_user(id: i64, name: &str, username: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "username": username,
        "email": format!("{}@example.com", username.to_lowercase()),
        "phone": "555-0100",
        "website": "example.org",
        "address": { "street": "Main", "suite": "1", "city": "Town", "zipcode": "00000" },
        "company": { "name": "Acme", "catchPhrase": "things", "bs": "stuff" }
    })
}

async fn pipeline(fail_on: Option<Resource>) -> (Pipeline<Canned>, TempDir) {
    let pool = connect_in_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        pool,
        Canned { fail_on },
        FileArchive::new(dir.path().join("data")),
        ReportRenderer::new(dir.path().join("reports")),
    );
    (pipeline, dir)
}

async fn user_count(pool: &SqlitePool) -> usize {
    let uow = UnitOfWork::begin(pool).await.unwrap();
    uow.users().get_all().await.unwrap().len()
}

#[tokio::test]
async fn successful_run_stores_records_and_reports() {
    let (pipeline, dir) = pipeline(None).await;

    let outcome = pipeline.run_full_pipeline().await.unwrap();

    let run = &outcome.run;
    assert!(run.id.is_some());
    assert_eq!(run.status, PipelineStatus::Success);
    assert!(run.completed_at.is_some());
    assert!(run.error_message.is_none());
    // 2 users + 2 valid posts + 3 comments; the post without an id is skipped.
    assert_eq!(run.records_processed, Some(7));
    let metadata = run.metadata.as_ref().unwrap();
    assert_eq!(metadata.get("posts_processed"), Some(&json!(2)));

    assert_eq!(outcome.report.total_users, 2);
    assert_eq!(outcome.report.total_posts, 2);
    assert_eq!(outcome.report.total_comments, 3);
    assert_eq!(outcome.report.most_active_user.as_deref(), Some("Leanne Graham"));
    assert_eq!(outcome.report.engagement_metrics[0].title, "second");

    let archive = FileArchive::new(dir.path().join("data"));
    let date = run.started_at.date_naive();
    let expected = vec!["comments.json", "posts.json", "users.json"];
    assert_eq!(archive.list_files(ArchiveArea::Raw, Some(date)).await.unwrap(), expected);
    assert_eq!(
        archive.list_files(ArchiveArea::Processed, Some(date)).await.unwrap(),
        expected
    );
    let raw_posts = archive.load_raw("posts", date).await.unwrap().unwrap();
    assert_eq!(raw_posts.as_array().map(Vec::len), Some(3));

    assert_eq!(outcome.report_paths.len(), 2);
    assert!(outcome.report_paths.iter().all(|p| p.exists()));
    assert_eq!(pipeline.renderer().list_reports().await.unwrap().len(), 2);

    let recent = pipeline.get_recent_runs(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0], outcome.run);
}

#[tokio::test]
async fn running_twice_upserts_instead_of_duplicating() {
    let (pipeline, _dir) = pipeline(None).await;

    pipeline.run_full_pipeline().await.unwrap();
    let second = pipeline.run_full_pipeline().await.unwrap();

    assert_eq!(second.report.total_users, 2);
    assert_eq!(second.report.total_posts, 2);
    assert_eq!(second.report.total_comments, 3);
    let recent = pipeline.get_recent_runs(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|r| r.status == PipelineStatus::Success));
}

#[tokio::test]
async fn extraction_failure_marks_run_failed_and_stores_nothing() {
    let (pipeline, dir) = pipeline(Some(Resource::Comments)).await;

    let err = pipeline.run_full_pipeline().await.unwrap_err();
    assert!(matches!(err, PipelineError::Extract(_)), "got {err:?}");

    let recent = pipeline.get_recent_runs(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    let run = &recent[0];
    assert_eq!(run.status, PipelineStatus::Failed);
    assert!(run.completed_at.is_some());
    assert!(run.records_processed.is_none());
    assert_eq!(run.error_message.as_deref(), Some(err.to_string().as_str()));

    assert_eq!(user_count(pipeline.pool()).await, 0);
    assert!(!dir.path().join("reports").exists());
}

#[tokio::test]
async fn archive_failure_is_a_step_failure() {
    let pool = connect_in_memory().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the data directory should be.
    let blocked = dir.path().join("data");
    std::fs::write(&blocked, b"not a directory").unwrap();
    let pipeline = Pipeline::new(
        pool,
        Canned { fail_on: None },
        FileArchive::new(&blocked),
        ReportRenderer::new(dir.path().join("reports")),
    );

    let err = pipeline.run_full_pipeline().await.unwrap_err();
    assert!(matches!(err, PipelineError::Archive(_)), "got {err:?}");

    let recent = pipeline.get_recent_runs(1).await.unwrap();
    assert_eq!(recent[0].status, PipelineStatus::Failed);
    assert_eq!(user_count(pipeline.pool()).await, 0);
}

fn user(id: i64, email: &str) -> User {
    User {
        id,
        name: format!("User {id}"),
        username: format!("user{id}"),
        email: email.to_owned(),
        phone: String::new(),
        website: String::new(),
        address: Address::default(),
        company: Company::default(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn store_batch_is_all_or_nothing() {
    let pool = connect_in_memory().await.unwrap();
    let batch = CleanBatch {
        users: vec![user(1, "same@example.com"), user(2, "same@example.com")],
        ..CleanBatch::default()
    };

    let err = store_batch(&pool, &batch).await.unwrap_err();

    assert!(matches!(err, DbError::Constraint(_)), "got {err:?}");
    assert_eq!(user_count(&pool).await, 0);
}
