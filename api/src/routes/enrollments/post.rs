use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use db::models::enrollment;
use util::state::AppState;

use super::common::EnrollmentResponse;
use crate::response::ApiResponse;
use crate::routes::common::enrollment_error_status;

/// POST /api/enrollments/{enrollment_id}/subjects/{subject_id}/complete
///
/// Marks a subject complete (idempotently) and returns the enrollment with
/// its recomputed progress.
pub async fn complete_subject(
    State(state): State<AppState>,
    Path((enrollment_id, subject_id)): Path<(i64, i64)>,
) -> (StatusCode, Json<ApiResponse<EnrollmentResponse>>) {
    match enrollment::Model::complete_subject(state.db(), enrollment_id, subject_id, Utc::now())
        .await
    {
        Ok(updated) => (
            StatusCode::OK,
            Json(ApiResponse::success(updated.into(), "Subject completed")),
        ),
        Err(e) => (
            enrollment_error_status(&e),
            Json(ApiResponse::error(format!(
                "Failed to complete subject: {e}"
            ))),
        ),
    }
}
