use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use db::models::attendance_record::{self, AttendanceStatus};
use db::models::batch;
use db::models::batch_student;
use db::models::class_session::{self, SessionStatus};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct SlotReq {
    #[validate(range(min = 0, max = 6))]
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchReq {
    pub course_id: i64,
    pub instructor_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(min = 0))]
    pub max_students: i32,
    #[serde(default = "default_true")]
    pub active: bool,
    #[validate(nested)]
    #[serde(default)]
    pub slots: Vec<SlotReq>,
}

#[derive(Debug, Deserialize)]
pub struct SessionStatusReq {
    pub status: Option<SessionStatus>,
    pub meeting_url: Option<String>,
    pub recording_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SweepReq {
    /// Sweep instant; defaults to now. Injectable for reproducible runs.
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceReq {
    /// Omitted when a student marks their own attendance; instructors and
    /// admins may mark any student.
    pub student_id: Option<i64>,
    pub status: AttendanceStatus,
    pub join_at: Option<DateTime<Utc>>,
    pub leave_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchResponse {
    pub id: i64,
    pub course_id: i64,
    pub instructor_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_students: i32,
    pub active: bool,
    pub enrolled_count: u64,
    pub seats_left: i64,
}

impl BatchResponse {
    pub fn from_with_counts(m: batch::Model, enrolled_count: u64) -> Self {
        let seats_left = i64::from(m.max_students) - enrolled_count as i64;
        Self {
            id: m.id,
            course_id: m.course_id,
            instructor_id: m.instructor_id,
            start_date: m.start_date,
            end_date: m.end_date,
            max_students: m.max_students,
            active: m.active,
            enrolled_count,
            seats_left: seats_left.max(0),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub batch_id: i64,
    pub slot_id: Option<i64>,
    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: Option<i64>,
    pub status: String,
    pub meeting_url: Option<String>,
    pub recording_url: Option<String>,
}

impl From<class_session::Model> for SessionResponse {
    fn from(m: class_session::Model) -> Self {
        Self {
            id: m.id,
            batch_id: m.batch_id,
            slot_id: m.slot_id,
            session_date: m.session_date,
            start_time: m.start_time,
            end_time: m.end_time,
            subject_id: m.subject_id,
            status: m.status.to_string(),
            meeting_url: m.meeting_url,
            recording_url: m.recording_url,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SeatResponse {
    pub batch_id: i64,
    pub student_id: i64,
    pub status: String,
    pub enrolled_at: String,
    pub enrollment_id: i64,
    pub price_cents: i64,
}

impl SeatResponse {
    pub fn from_parts(
        seat: batch_student::Model,
        enrollment: &db::models::enrollment::Model,
    ) -> Self {
        Self {
            batch_id: seat.batch_id,
            student_id: seat.student_id,
            status: seat.status.to_string(),
            enrolled_at: seat.enrolled_at.to_rfc3339(),
            enrollment_id: enrollment.id,
            price_cents: enrollment.price_cents,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct AttendanceResponse {
    pub session_id: i64,
    pub student_id: i64,
    pub status: String,
    pub join_at: Option<String>,
    pub leave_at: Option<String>,
    pub recorded_at: String,
}

impl From<attendance_record::Model> for AttendanceResponse {
    fn from(m: attendance_record::Model) -> Self {
        Self {
            session_id: m.session_id,
            student_id: m.student_id,
            status: m.status.to_string(),
            join_at: m.join_at.map(|t| t.to_rfc3339()),
            leave_at: m.leave_at.map(|t| t.to_rfc3339()),
            recorded_at: m.recorded_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct AttendancePercentageResponse {
    pub batch_id: i64,
    pub student_id: i64,
    pub percentage: f64,
}
