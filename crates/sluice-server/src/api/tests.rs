use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use chrono::TimeZone;
use serde_json::Value;
use sluice_core::AnalyticsReport;
use sluice_pipeline::ReportFormat;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::runner::test_support::{runner, wait_for};

struct TestApp {
    app: Router,
    state: AppState,
    _dir: TempDir,
}

async fn test_app() -> TestApp {
    let pool = sluice_db::connect_in_memory().await.expect("pool");
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState {
        pool: pool.clone(),
        runner: runner(pool, dir.path(), false),
        renderer: ReportRenderer::new(dir.path().join("reports")),
        top_n: 3,
    };
    TestApp {
        app: build_app(state.clone()),
        state,
        _dir: dir,
    }
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    (status, serde_json::from_slice(&body).expect("json parse"))
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 10);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let conflict = ApiError::new("req-1", "conflict", "busy").into_response();
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    let other = ApiError::new("req-1", "internal_error", "boom").into_response();
    assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_reports_ok_and_echoes_request_id() {
    let test = test_app().await;
    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header(REQUEST_ID_HEADER, "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(REQUEST_ID_HEADER).unwrap(),
        "req-abc"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["meta"]["request_id"], "req-abc");
}

#[tokio::test]
async fn generated_request_id_is_returned_when_absent() {
    let test = test_app().await;
    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
    assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn trigger_returns_task_that_can_be_polled() {
    let test = test_app().await;

    let (status, json) = send(&test.app, Method::POST, "/api/v1/pipeline/run").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["data"]["status"], "running");
    let task_id = json["data"]["task_id"].as_str().unwrap().to_owned();

    wait_for(&test.state.runner, task_id.parse().unwrap()).await;

    let (status, json) = send(
        &test.app,
        Method::GET,
        &format!("/api/v1/pipeline/status/{task_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "completed");
    assert_eq!(json["data"]["records_processed"], 4);

    let (_, json) = send(&test.app, Method::GET, "/api/v1/pipeline/runs").await;
    let runs = json["data"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["status"], "success");
}

#[tokio::test]
async fn trigger_while_running_is_a_conflict() {
    let test = test_app().await;
    let _held = test.state.runner.run_lock.try_lock().unwrap();

    let (status, json) = send(&test.app, Method::POST, "/api/v1/pipeline/run").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "conflict");
}

#[tokio::test]
async fn unknown_or_malformed_task_ids_are_not_found() {
    let test = test_app().await;

    let uri = format!("/api/v1/pipeline/status/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&test.app, Method::GET, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&test.app, Method::GET, "/api/v1/pipeline/status/pipeline_1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn runs_are_limited_newest_first() {
    let test = test_app().await;
    sluice_db::seed_mock_data(&test.state.pool).await.unwrap();

    let (status, json) = send(&test.app, Method::GET, "/api/v1/pipeline/runs?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    let runs = json["data"].as_array().unwrap();
    assert_eq!(runs.len(), 2);
    let first = runs[0]["started_at"].as_str().unwrap();
    let second = runs[1]["started_at"].as_str().unwrap();
    assert!(
        chrono::DateTime::parse_from_rfc3339(first).unwrap()
            > chrono::DateTime::parse_from_rfc3339(second).unwrap()
    );
}

#[tokio::test]
async fn analytics_endpoints_reflect_stored_rows() {
    let test = test_app().await;
    let seeded = sluice_db::seed_mock_data(&test.state.pool).await.unwrap();

    let (status, json) = send(&test.app, Method::GET, "/api/v1/analytics/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total_users"], seeded.users);
    assert_eq!(json["data"]["total_posts"], seeded.posts);
    assert_eq!(json["data"]["total_comments"], seeded.comments);
    assert_eq!(json["data"]["engagement_metrics"].as_array().unwrap().len(), 3);

    let (_, json) = send(&test.app, Method::GET, "/api/v1/analytics/users/stats").await;
    assert_eq!(json["data"]["total_users"], seeded.users);
    assert!(json["data"]["most_active_user"].is_string());
    assert!(json["data"].get("total_comments").is_none());

    let (_, json) = send(&test.app, Method::GET, "/api/v1/analytics/engagement").await;
    assert_eq!(json["data"]["total_comments"], seeded.comments);
    assert_eq!(json["data"]["top_posts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn reports_can_be_listed_downloaded_and_deleted() {
    let test = test_app().await;
    let report = AnalyticsReport::empty(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    test.state
        .renderer
        .render(&report, ReportFormat::Csv)
        .await
        .unwrap();
    let filename = "analytics_2026-03-01_09-00-00-000.csv";

    let (status, json) = send(&test.app, Method::GET, "/api/v1/reports").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["filename"], filename);
    assert_eq!(json["data"][0]["format"], "csv");

    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/reports/{filename}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.starts_with(b"# Analytics Report Summary"));

    let uri = format!("/api/v1/reports/{filename}");
    let (status, json) = send(&test.app, Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deleted"], true);

    let (status, _) = send(&test.app, Method::DELETE, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&test.app, Method::GET, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsafe_report_names_are_bad_requests() {
    let test = test_app().await;

    let (status, json) = send(&test.app, Method::GET, "/api/v1/reports/..secret.json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}
