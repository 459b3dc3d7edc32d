//! Typed failures for the scheduling, enrollment and pricing core.
//!
//! Business-rule violations are their own variants so callers can map them to
//! HTTP statuses; storage faults pass through as `Db` and remain retryable.

use crate::models::class_session::SessionStatus;
use crate::models::enrollment::EnrollmentStatus;
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CourseError {
    #[error("base fee must be a positive amount")]
    InvalidBaseFee,

    #[error("discount percentage must be between 0 and 100")]
    InvalidDiscountPercent,

    #[error("discount window must not end before it starts")]
    InvalidDiscountWindow,

    #[error("course not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch start date must not be after its end date")]
    InvalidRange,

    #[error("maximum student capacity must not be negative")]
    InvalidCapacity,

    #[error("day of week must be between 0 (Monday) and 6 (Sunday)")]
    InvalidDayOfWeek,

    #[error("slot start time must be before its end time")]
    InvalidSlotTimes,

    #[error("batch not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("class session not found")]
    NotFound,

    #[error("class session status cannot change from {from} to {to}")]
    InvalidStatusChange {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("batch is not open for enrollment")]
    BatchInactive,

    #[error("student is already enrolled in this batch")]
    AlreadyEnrolled,

    #[error("batch has reached its maximum student capacity")]
    CapacityExceeded,

    #[error("student is not enrolled in this batch")]
    NotEnrolled,

    #[error("enrollment status cannot change from {from} to {to}")]
    InvalidTransition {
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    },

    #[error("subject does not belong to the enrollment's course")]
    SubjectNotInCourse,

    #[error("enrollment not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("class session not found")]
    SessionNotFound,

    #[error("attendance for a completed session can only be corrected by an instructor or admin")]
    SessionLocked,

    #[error("attendance cannot be recorded for a cancelled session")]
    SessionCancelled,

    #[error("leave instant must not precede join instant")]
    InvalidInterval,

    #[error(transparent)]
    Db(#[from] DbErr),
}
