use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use validator::Validate;

use db::models::{attendance_record, batch, batch_student, class_session, schedule_slot};
use util::state::AppState;

use super::common::{
    AttendanceReq, AttendanceResponse, BatchResponse, CreateBatchReq, SeatResponse,
    SessionResponse, SweepReq,
};
use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{
    attendance_error_status, batch_error_status, db_error_status, enrollment_error_status,
    session_error_status,
};

/// POST /api/batches
///
/// Creates a batch together with its weekly slots. Date range, capacity and
/// slot shape are all validated here so the schedule generator can assume
/// well-formed input.
pub async fn create_batch(
    State(state): State<AppState>,
    Json(body): Json<CreateBatchReq>,
) -> (StatusCode, Json<ApiResponse<BatchResponse>>) {
    if let Err(e) = body.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(format!("Invalid batch payload: {e}"))),
        );
    }

    let db = state.db();
    let created = match batch::Model::create(
        db,
        body.course_id,
        body.instructor_id,
        body.start_date,
        body.end_date,
        body.max_students,
        body.active,
    )
    .await
    {
        Ok(created) => created,
        Err(e) => {
            return (
                batch_error_status(&e),
                Json(ApiResponse::error(format!("Failed to create batch: {e}"))),
            );
        }
    };

    for slot in &body.slots {
        if let Err(e) = schedule_slot::Model::create(
            db,
            created.id,
            slot.day_of_week,
            slot.start_time,
            slot.end_time,
            slot.subject_id,
        )
        .await
        {
            return (
                batch_error_status(&e),
                Json(ApiResponse::error(format!("Failed to create slot: {e}"))),
            );
        }
    }

    (
        StatusCode::CREATED,
        Json(ApiResponse::success(
            BatchResponse::from_with_counts(created, 0),
            "Batch created",
        )),
    )
}

/// POST /api/batches/{batch_id}/enroll
///
/// Enrolls the calling student. The seat write is atomic against capacity,
/// and the course-level enrollment records the effective price at this
/// instant.
pub async fn enroll(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<SeatResponse>>) {
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

    match batch_student::Model::enroll(db, &found, claims.sub, Utc::now()).await {
        Ok((seat, enrollment)) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                SeatResponse::from_parts(seat, &enrollment),
                "Enrolled",
            )),
        ),
        Err(e) => (
            enrollment_error_status(&e),
            Json(ApiResponse::error(format!("Failed to enroll: {e}"))),
        ),
    }
}

/// POST /api/batches/{batch_id}/withdraw
///
/// Frees the caller's seat. The course-level enrollment is untouched; the
/// student may finish the course through another batch.
pub async fn withdraw(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match batch_student::Model::withdraw(state.db(), batch_id, claims.sub).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiResponse::success((), "Withdrawn from batch")),
        ),
        Err(e) => (
            enrollment_error_status(&e),
            Json(ApiResponse::error(format!("Failed to withdraw: {e}"))),
        ),
    }
}

/// POST /api/batches/{batch_id}/sessions/materialize
///
/// Expands the weekly timetable into dated sessions. Idempotent: re-running
/// never duplicates a session or touches one that already has attendance.
pub async fn materialize_sessions(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<Vec<SessionResponse>>>) {
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

    match found.materialize_sessions(db).await {
        Ok(sessions) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                sessions.into_iter().map(Into::into).collect(),
                "Sessions materialized",
            )),
        ),
        Err(e) => (
            batch_error_status(&e),
            Json(ApiResponse::error(format!(
                "Failed to materialize sessions: {e}"
            ))),
        ),
    }
}

/// POST /api/batches/{batch_id}/sessions/sweep
///
/// Idempotent wall-clock advancement of session statuses.
pub async fn sweep_sessions(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
    Json(body): Json<SweepReq>,
) -> (StatusCode, Json<ApiResponse<u64>>) {
    let at = body.at.unwrap_or_else(Utc::now);

    match class_session::Model::sweep(state.db(), batch_id, at).await {
        Ok(advanced) => (
            StatusCode::OK,
            Json(ApiResponse::success(advanced, "Session statuses advanced")),
        ),
        Err(e) => (
            session_error_status(&e),
            Json(ApiResponse::error(format!("Failed to sweep sessions: {e}"))),
        ),
    }
}

/// POST /api/batches/{batch_id}/sessions/{session_id}/attendance
///
/// Records attendance. Students may mark themselves while the session is
/// open; marking someone else, or correcting a completed session, takes the
/// batch's instructor or an admin.
pub async fn record_attendance(
    State(state): State<AppState>,
    Path((batch_id, session_id)): Path<(i64, i64)>,
    Extension(AuthUser(claims)): Extension<AuthUser>,
    Json(body): Json<AttendanceReq>,
) -> (StatusCode, Json<ApiResponse<AttendanceResponse>>) {
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

    let session = match class_session::Model::get_by_id(db, session_id).await {
        Ok(Some(session)) if session.batch_id == batch_id => session,
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Class session not found")),
            );
        }
        Err(e) => {
            return (
                db_error_status(&e),
                Json(ApiResponse::error("Failed to fetch session")),
            );
        }
    };

    let privileged = claims.admin || found.instructor_id == claims.sub;
    let student_id = body.student_id.unwrap_or(claims.sub);
    if student_id != claims.sub && !privileged {
        return (
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error(
                "Only the batch instructor or an admin may mark other students",
            )),
        );
    }

    match attendance_record::Model::record(
        db,
        &session,
        student_id,
        body.status,
        body.join_at,
        body.leave_at,
        privileged,
    )
    .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(record.into(), "Attendance recorded")),
        ),
        Err(e) => (
            attendance_error_status(&e),
            Json(ApiResponse::error(format!(
                "Failed to record attendance: {e}"
            ))),
        ),
    }
}
