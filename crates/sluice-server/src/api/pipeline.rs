use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use sluice_core::PipelineRun;
use uuid::Uuid;

use crate::middleware::RequestId;
use crate::runner::TaskStatus;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RunsQuery {
    pub limit: Option<i64>,
}

/// Start a background run; 409 while another is active.
pub(super) async fn trigger_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<TaskStatus>>), ApiError> {
    let Some(task) = state.runner.trigger().await else {
        return Err(ApiError::new(
            req_id.0,
            "conflict",
            "a pipeline run is already in progress",
        ));
    };
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::new(task, req_id.0))))
}

pub(super) async fn task_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(task_id): Path<String>,
) -> Result<Json<ApiResponse<TaskStatus>>, ApiError> {
    let status = match Uuid::parse_str(&task_id) {
        Ok(id) => state.runner.status(id).await,
        Err(_) => None,
    };
    let Some(status) = status else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("task {task_id} not found"),
        ));
    };
    Ok(Json(ApiResponse::new(status, req_id.0)))
}

pub(super) async fn list_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<ApiResponse<Vec<PipelineRun>>>, ApiError> {
    let runs = sluice_pipeline::recent_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(runs, req_id.0)))
}
