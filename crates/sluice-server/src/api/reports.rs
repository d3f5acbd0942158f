use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use sluice_pipeline::{ReportError, ReportFile};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct Deleted {
    filename: String,
    deleted: bool,
}

fn map_report_error(request_id: String, error: &ReportError) -> ApiError {
    match error {
        ReportError::InvalidFilename(_) | ReportError::UnsupportedFormat(_) => {
            ApiError::new(request_id, "bad_request", error.to_string())
        }
        ReportError::NotFound(_) => ApiError::new(request_id, "not_found", "report not found"),
        _ => {
            tracing::error!(error = %error, "report storage failed");
            ApiError::new(request_id, "internal_error", "report storage failed")
        }
    }
}

pub(super) async fn list_reports(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ReportFile>>>, ApiError> {
    let reports = state
        .renderer
        .list_reports()
        .await
        .map_err(|e| map_report_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(reports, req_id.0)))
}

/// Raw report contents served as an attachment.
pub(super) async fn download_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (format, body) = state
        .renderer
        .read_report(&filename)
        .await
        .map_err(|e| map_report_error(req_id.0.clone(), &e))?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

pub(super) async fn delete_report(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(filename): Path<String>,
) -> Result<Json<ApiResponse<Deleted>>, ApiError> {
    let deleted = state
        .renderer
        .delete_report(&filename)
        .await
        .map_err(|e| map_report_error(req_id.0.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(req_id.0, "not_found", "report not found"));
    }
    Ok(Json(ApiResponse::new(Deleted { filename, deleted }, req_id.0)))
}
