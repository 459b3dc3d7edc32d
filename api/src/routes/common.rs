//! Shared helpers for mapping domain failures onto HTTP statuses.
//!
//! Validation failures are `422`, business-rule conflicts are `409`, missing
//! aggregates are `404`. Storage faults stay distinguishable: connection
//! problems map to `503` so callers know the request is retryable, everything
//! else is a `500`.

use axum::http::StatusCode;
use db::errors::{AttendanceError, BatchError, CourseError, EnrollmentError, SessionError};
use sea_orm::DbErr;

pub fn db_error_status(err: &DbErr) -> StatusCode {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn course_error_status(err: &CourseError) -> StatusCode {
    match err {
        CourseError::InvalidBaseFee
        | CourseError::InvalidDiscountPercent
        | CourseError::InvalidDiscountWindow => StatusCode::UNPROCESSABLE_ENTITY,
        CourseError::NotFound => StatusCode::NOT_FOUND,
        CourseError::Db(e) => db_error_status(e),
    }
}

pub fn batch_error_status(err: &BatchError) -> StatusCode {
    match err {
        BatchError::InvalidRange
        | BatchError::InvalidCapacity
        | BatchError::InvalidDayOfWeek
        | BatchError::InvalidSlotTimes => StatusCode::UNPROCESSABLE_ENTITY,
        BatchError::NotFound => StatusCode::NOT_FOUND,
        BatchError::Db(e) => db_error_status(e),
    }
}

pub fn session_error_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::InvalidStatusChange { .. } => StatusCode::CONFLICT,
        SessionError::Db(e) => db_error_status(e),
    }
}

pub fn enrollment_error_status(err: &EnrollmentError) -> StatusCode {
    match err {
        EnrollmentError::BatchInactive
        | EnrollmentError::AlreadyEnrolled
        | EnrollmentError::CapacityExceeded
        | EnrollmentError::NotEnrolled
        | EnrollmentError::InvalidTransition { .. } => StatusCode::CONFLICT,
        EnrollmentError::SubjectNotInCourse => StatusCode::UNPROCESSABLE_ENTITY,
        EnrollmentError::NotFound => StatusCode::NOT_FOUND,
        EnrollmentError::Db(e) => db_error_status(e),
    }
}

pub fn attendance_error_status(err: &AttendanceError) -> StatusCode {
    match err {
        AttendanceError::SessionNotFound => StatusCode::NOT_FOUND,
        AttendanceError::SessionLocked | AttendanceError::SessionCancelled => StatusCode::CONFLICT,
        AttendanceError::InvalidInterval => StatusCode::UNPROCESSABLE_ENTITY,
        AttendanceError::Db(e) => db_error_status(e),
    }
}
