use axum::{extract::State, Extension, Json};
use serde::Serialize;
use sluice_core::{AnalyticsReport, EngagementMetric};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct UserStats {
    total_users: i64,
    total_posts: i64,
    average_posts_per_user: f64,
    most_active_user: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct Engagement {
    total_posts: i64,
    total_comments: i64,
    top_posts: Vec<EngagementMetric>,
}

impl From<AnalyticsReport> for UserStats {
    fn from(report: AnalyticsReport) -> Self {
        Self {
            total_users: report.total_users,
            total_posts: report.total_posts,
            average_posts_per_user: report.average_posts_per_user,
            most_active_user: report.most_active_user,
        }
    }
}

impl From<AnalyticsReport> for Engagement {
    fn from(report: AnalyticsReport) -> Self {
        Self {
            total_posts: report.total_posts,
            total_comments: report.total_comments,
            top_posts: report.engagement_metrics,
        }
    }
}

async fn current_report(state: &AppState, req_id: &RequestId) -> Result<AnalyticsReport, ApiError> {
    sluice_db::analytics_report(&state.pool, state.top_n)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))
}

pub(super) async fn summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<AnalyticsReport>>, ApiError> {
    let report = current_report(&state, &req_id).await?;
    Ok(Json(ApiResponse::new(report, req_id.0)))
}

pub(super) async fn user_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<UserStats>>, ApiError> {
    let report = current_report(&state, &req_id).await?;
    Ok(Json(ApiResponse::new(report.into(), req_id.0)))
}

pub(super) async fn engagement(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Engagement>>, ApiError> {
    let report = current_report(&state, &req_id).await?;
    Ok(Json(ApiResponse::new(report.into(), req_id.0)))
}
