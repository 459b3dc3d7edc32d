use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use db::models::{course, subject};
use util::state::AppState;

use super::common::{CourseResponse, CreateCourseReq, CreateSubjectReq, SubjectResponse};
use crate::response::ApiResponse;
use crate::routes::common::{course_error_status, db_error_status};

/// POST /api/courses
///
/// Creates a catalog course. The discount descriptor is validated here, at
/// write time, so the pricing engine never sees a malformed window.
pub async fn create_course(
    State(state): State<AppState>,
    Json(body): Json<CreateCourseReq>,
) -> (StatusCode, Json<ApiResponse<CourseResponse>>) {
    if let Err(e) = body.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(format!("Invalid course payload: {e}"))),
        );
    }

    let discount = body.discount.as_ref().map(Into::into);

    match course::Model::create(
        state.db(),
        &body.code,
        &body.title,
        body.base_fee_cents,
        discount,
    )
    .await
    {
        Ok(created) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(created.into(), "Course created")),
        ),
        Err(e) => (
            course_error_status(&e),
            Json(ApiResponse::error(format!("Failed to create course: {e}"))),
        ),
    }
}

/// POST /api/courses/{course_id}/subjects
pub async fn create_subject(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Json(body): Json<CreateSubjectReq>,
) -> (StatusCode, Json<ApiResponse<SubjectResponse>>) {
    if let Err(e) = body.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(format!("Invalid subject payload: {e}"))),
        );
    }

    let db = state.db();
    match course::Model::get_by_id(db, course_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Course not found")),
            );
        }
        Err(e) => {
            return (
                db_error_status(&e),
                Json(ApiResponse::error("Failed to fetch course")),
            );
        }
    }

    match subject::Model::create(db, course_id, &body.title, body.position).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(created.into(), "Subject created")),
        ),
        Err(e) => (
            db_error_status(&e),
            Json(ApiResponse::error(format!("Failed to create subject: {e}"))),
        ),
    }
}
