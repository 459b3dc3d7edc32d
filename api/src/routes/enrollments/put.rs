use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use db::models::batch_student;
use db::models::enrollment::{self, EnrollmentStatus};
use util::state::AppState;

use super::common::{ChangeStatusReq, EnrollmentResponse};
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::enrollment_error_status;

/// PUT /api/enrollments/{enrollment_id}/status
///
/// The one write path for enrollment status. Transitions outside the allowed
/// table come back as `409` and leave the history untouched. When an
/// enrollment completes, the student's active batch seats for that course are
/// marked completed so rosters stay in step.
pub async fn change_status(
    State(state): State<AppState>,
    Path(enrollment_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<ChangeStatusReq>,
) -> (StatusCode, Json<ApiResponse<EnrollmentResponse>>) {
    let db = state.db();

    let updated = match enrollment::Model::change_status(
        db,
        enrollment_id,
        body.status,
        claims.sub,
        body.reason,
        Utc::now(),
    )
    .await
    {
        Ok(updated) => updated,
        Err(e) => {
            return (
                enrollment_error_status(&e),
                Json(ApiResponse::error(format!("Failed to change status: {e}"))),
            );
        }
    };

    if updated.status == EnrollmentStatus::Completed {
        if let Err(e) = batch_student::Model::mark_completed_for_course(
            db,
            updated.student_id,
            updated.course_id,
        )
        .await
        {
            tracing::warn!(
                error = %e,
                enrollment_id,
                "enrollment completed but batch seats could not be updated"
            );
        }
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(updated.into(), "Status changed")),
    )
}
