use serde::{Deserialize, Serialize};

use db::models::enrollment::{self, EnrollmentStatus};
use db::models::enrollment_status_history;

#[derive(Debug, Deserialize)]
pub struct ChangeStatusReq {
    pub status: EnrollmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct EnrollmentResponse {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub enrolled_at: String,
    pub price_cents: i64,
    pub progress: f32,
    pub status: String,
    pub completed_at: Option<String>,
}

impl From<enrollment::Model> for EnrollmentResponse {
    fn from(m: enrollment::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            course_id: m.course_id,
            enrolled_at: m.enrolled_at.to_rfc3339(),
            price_cents: m.price_cents,
            progress: m.progress,
            status: m.status.to_string(),
            completed_at: m.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct HistoryEntryResponse {
    pub status: String,
    pub changed_at: String,
    pub changed_by: i64,
    pub reason: Option<String>,
}

impl From<enrollment_status_history::Model> for HistoryEntryResponse {
    fn from(m: enrollment_status_history::Model) -> Self {
        Self {
            status: m.status.to_string(),
            changed_at: m.changed_at.to_rfc3339(),
            changed_by: m.changed_by,
            reason: m.reason,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct EnrollmentDetailResponse {
    #[serde(flatten)]
    pub enrollment: EnrollmentResponse,
    pub history: Vec<HistoryEntryResponse>,
}

#[derive(Debug, Default, Serialize)]
pub struct ProgressResponse {
    pub enrollment_id: i64,
    pub progress: f32,
}
