use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use db::models::{enrollment, enrollment_status_history};
use util::state::AppState;

use super::common::{EnrollmentDetailResponse, ProgressResponse};
use crate::response::ApiResponse;
use crate::routes::common::{db_error_status, enrollment_error_status};

/// GET /api/enrollments/{enrollment_id}
///
/// Enrollment detail plus its full status history, oldest first.
pub async fn get_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<EnrollmentDetailResponse>>) {
    let db = state.db();

    let found = match enrollment::Model::get_by_id(db, enrollment_id).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Enrollment not found")),
            );
        }
        Err(e) => {
            return (
                db_error_status(&e),
                Json(ApiResponse::error("Failed to fetch enrollment")),
            );
        }
    };

    let history =
        match enrollment_status_history::Model::list_for_enrollment(db, enrollment_id).await {
            Ok(entries) => entries,
            Err(e) => {
                return (
                    db_error_status(&e),
                    Json(ApiResponse::error("Failed to fetch status history")),
                );
            }
        };

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            EnrollmentDetailResponse {
                enrollment: found.into(),
                history: history.into_iter().map(Into::into).collect(),
            },
            "Enrollment fetched",
        )),
    )
}

/// GET /api/enrollments/{enrollment_id}/progress
///
/// Recomputes progress on demand from completed subjects (or attendance when
/// the course defines no subjects) and persists the result.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(enrollment_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<ProgressResponse>>) {
    match enrollment::Model::recompute_progress(state.db(), enrollment_id).await {
        Ok(updated) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                ProgressResponse {
                    enrollment_id: updated.id,
                    progress: updated.progress,
                },
                "Progress computed",
            )),
        ),
        Err(e) => (
            enrollment_error_status(&e),
            Json(ApiResponse::error(format!("Failed to compute progress: {e}"))),
        ),
    }
}
