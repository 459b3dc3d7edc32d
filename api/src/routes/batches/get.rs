use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use db::models::{attendance_record, batch, class_session};
use util::state::AppState;

use super::common::{AttendancePercentageResponse, BatchResponse, SessionResponse};
use crate::response::ApiResponse;
use crate::routes::common::db_error_status;

/// GET /api/batches/{batch_id}
///
/// Batch detail with live seat availability, counted from the same rows the
/// capacity check uses.
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<BatchResponse>>) {
    let db = state.db();

    let found = match batch::Model::get_by_id(db, batch_id).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Batch not found")),
            );
        }
        Err(e) => {
            return (
                db_error_status(&e),
                Json(ApiResponse::error("Failed to fetch batch")),
            );
        }
    };

    let enrolled = match batch::Model::enrolled_count(db, batch_id).await {
        Ok(n) => n,
        Err(e) => {
            return (
                db_error_status(&e),
                Json(ApiResponse::error("Failed to count enrollments")),
            );
        }
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            BatchResponse::from_with_counts(found, enrolled),
            "Batch fetched",
        )),
    )
}

/// GET /api/batches/{batch_id}/sessions
///
/// Materialized sessions in ascending (date, start time) order.
pub async fn list_sessions(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Vec<SessionResponse>>>) {
    match class_session::Model::list_for_batch(state.db(), batch_id).await {
        Ok(sessions) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                sessions.into_iter().map(Into::into).collect(),
                "Sessions fetched",
            )),
        ),
        Err(e) => (
            db_error_status(&e),
            Json(ApiResponse::error("Failed to fetch sessions")),
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub from: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct UpcomingCountResponse {
    pub batch_id: i64,
    pub from: String,
    pub upcoming: u64,
}

/// GET /api/batches/{batch_id}/sessions/upcoming-count
pub async fn upcoming_count(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
    Query(query): Query<UpcomingQuery>,
) -> (StatusCode, Json<ApiResponse<UpcomingCountResponse>>) {
    let from = query.from.unwrap_or_else(Utc::now);

    match batch::Model::upcoming_count(state.db(), batch_id, from).await {
        Ok(upcoming) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                UpcomingCountResponse {
                    batch_id,
                    from: from.to_rfc3339(),
                    upcoming,
                },
                "Upcoming sessions counted",
            )),
        ),
        Err(e) => (
            db_error_status(&e),
            Json(ApiResponse::error("Failed to count sessions")),
        ),
    }
}

/// GET /api/batches/{batch_id}/attendance/{student_id}
pub async fn attendance_percentage(
    State(state): State<AppState>,
    Path((batch_id, student_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<AttendancePercentageResponse>>) {
    match attendance_record::Model::percentage_for_batch(state.db(), student_id, batch_id).await {
        Ok(percentage) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                AttendancePercentageResponse {
                    batch_id,
                    student_id,
                    percentage,
                },
                "Attendance percentage computed",
            )),
        ),
        Err(e) => (
            db_error_status(&e),
            Json(ApiResponse::error("Failed to compute attendance")),
        ),
    }
}
