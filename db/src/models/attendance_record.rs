use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::PaginatorTrait;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::AttendanceError;
use crate::models::batch_student::{self, BatchStudentStatus};
use crate::models::class_session::{self, SessionStatus};

/// Per-session, per-student attendance. Rows are written when attendance is
/// logged, or back-filled as `absent` when a session completes, so every
/// completed session contributes to the percentage denominator.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    pub status: AttendanceStatus,
    /// Join/leave instants are only meaningful for remote sessions.
    pub join_at: Option<DateTime<Utc>>,
    pub leave_at: Option<DateTime<Utc>>,

    pub recorded_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "present")]
    Present,

    #[sea_orm(string_value = "absent")]
    Absent,

    #[sea_orm(string_value = "late")]
    Late,
}

impl AttendanceStatus {
    /// Present and late both count toward attendance.
    pub fn counts_as_attended(self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class_session::Entity",
        from = "Column::SessionId",
        to = "super::class_session::Column::Id",
        on_delete = "Cascade"
    )]
    Session,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Records (or corrects) a student's attendance for a session.
    ///
    /// A completed session is locked: only callers with correction privilege
    /// (instructors/admins) may still write. Cancelled sessions never take
    /// attendance.
    pub async fn record(
        db: &DbConn,
        session: &class_session::Model,
        student_id: i64,
        status: AttendanceStatus,
        join_at: Option<DateTime<Utc>>,
        leave_at: Option<DateTime<Utc>>,
        can_correct: bool,
    ) -> Result<Model, AttendanceError> {
        if session.status == SessionStatus::Cancelled {
            return Err(AttendanceError::SessionCancelled);
        }
        if session.status == SessionStatus::Completed && !can_correct {
            return Err(AttendanceError::SessionLocked);
        }
        if let (Some(join), Some(leave)) = (join_at, leave_at) {
            if leave < join {
                return Err(AttendanceError::InvalidInterval);
            }
        }

        let now = Utc::now();
        let existing = Entity::find_by_id((session.id, student_id)).one(db).await?;

        let record = match existing {
            Some(found) => {
                let mut active: ActiveModel = found.into();
                active.status = Set(status);
                active.join_at = Set(join_at);
                active.leave_at = Set(leave_at);
                active.recorded_at = Set(now);
                active.update(db).await?
            }
            None => {
                let active = ActiveModel {
                    session_id: Set(session.id),
                    student_id: Set(student_id),
                    status: Set(status),
                    join_at: Set(join_at),
                    leave_at: Set(leave_at),
                    recorded_at: Set(now),
                };
                active.insert(db).await?
            }
        };

        Ok(record)
    }

    /// Writes an `absent` record for every active student of the session's
    /// batch who has no record yet. Runs when a session completes.
    pub async fn backfill_absent(
        db: &DbConn,
        session: &class_session::Model,
    ) -> Result<u64, DbErr> {
        let roster: Vec<i64> = batch_student::Entity::find()
            .filter(batch_student::Column::BatchId.eq(session.batch_id))
            .filter(batch_student::Column::Status.eq(BatchStudentStatus::Active))
            .all(db)
            .await?
            .into_iter()
            .map(|seat| seat.student_id)
            .collect();

        let marked: std::collections::HashSet<i64> = Entity::find()
            .filter(Column::SessionId.eq(session.id))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.student_id)
            .collect();

        let now = Utc::now();
        let missing: Vec<ActiveModel> = roster
            .into_iter()
            .filter(|student_id| !marked.contains(student_id))
            .map(|student_id| ActiveModel {
                session_id: Set(session.id),
                student_id: Set(student_id),
                status: Set(AttendanceStatus::Absent),
                join_at: Set(None),
                leave_at: Set(None),
                recorded_at: Set(now),
            })
            .collect();

        let count = missing.len() as u64;
        if !missing.is_empty() {
            Entity::insert_many(missing).exec(db).await?;
        }

        Ok(count)
    }

    /// Attendance percentage for one student over a batch's completed
    /// sessions: attended (present or late) divided by recorded, times 100.
    /// Scheduled and cancelled sessions never enter the denominator.
    pub async fn percentage_for_batch(
        db: &DbConn,
        student_id: i64,
        batch_id: i64,
    ) -> Result<f64, DbErr> {
        let session_ids: Vec<i64> = class_session::Entity::find()
            .filter(class_session::Column::BatchId.eq(batch_id))
            .filter(class_session::Column::Status.eq(SessionStatus::Completed))
            .all(db)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        Self::percentage_over_sessions(db, student_id, &session_ids).await
    }

    /// Attendance percentage across every batch of a course; the fallback
    /// progress signal for courses with no subjects defined.
    pub async fn percentage_for_course(
        db: &DbConn,
        student_id: i64,
        course_id: i64,
    ) -> Result<f64, DbErr> {
        let batch_ids: Vec<i64> = crate::models::batch::Entity::find()
            .filter(crate::models::batch::Column::CourseId.eq(course_id))
            .all(db)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        if batch_ids.is_empty() {
            return Ok(0.0);
        }

        let session_ids: Vec<i64> = class_session::Entity::find()
            .filter(class_session::Column::BatchId.is_in(batch_ids))
            .filter(class_session::Column::Status.eq(SessionStatus::Completed))
            .all(db)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        Self::percentage_over_sessions(db, student_id, &session_ids).await
    }

    async fn percentage_over_sessions(
        db: &DbConn,
        student_id: i64,
        session_ids: &[i64],
    ) -> Result<f64, DbErr> {
        if session_ids.is_empty() {
            return Ok(0.0);
        }

        let recorded = Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::SessionId.is_in(session_ids.iter().copied()))
            .count(db)
            .await?;

        if recorded == 0 {
            return Ok(0.0);
        }

        let attended = Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::SessionId.is_in(session_ids.iter().copied()))
            .filter(Column::Status.is_in([AttendanceStatus::Present, AttendanceStatus::Late]))
            .count(db)
            .await?;

        Ok(100.0 * attended as f64 / recorded as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{batch, batch_student, course, schedule_slot, user};
    use crate::test_utils::setup_test_db;
    use chrono::{NaiveDate, NaiveTime};

    struct Fixture {
        batch: batch::Model,
        student_id: i64,
        sessions: Vec<class_session::Model>,
    }

    /// Ten Monday sessions with one enrolled student.
    async fn fixture(db: &DbConn) -> Fixture {
        let instructor = user::Model::create(db, "att_inst", "att_inst@test.com", false)
            .await
            .unwrap();
        let course = course::Model::create(db, "RUST501", "Traits", 40_000, None)
            .await
            .unwrap();
        let batch = batch::Model::create(
            db,
            course.id,
            instructor.id,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            10,
            true,
        )
        .await
        .unwrap();

        schedule_slot::Model::create(
            db,
            batch.id,
            0,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            None,
        )
        .await
        .unwrap();

        let student = user::Model::create(db, "att_stud", "att_stud@test.com", false)
            .await
            .unwrap();
        batch_student::Model::enroll(db, &batch, student.id, Utc::now())
            .await
            .unwrap();

        let sessions = batch.materialize_sessions(db).await.unwrap();
        assert_eq!(sessions.len(), 10);

        Fixture {
            batch,
            student_id: student.id,
            sessions,
        }
    }

    #[tokio::test]
    async fn test_percentage_counts_present_and_late_over_completed() {
        let db = setup_test_db().await;
        let fx = fixture(&db).await;

        // Mark 5 present, 2 late, leave 3 unmarked, then complete all ten.
        for (i, session) in fx.sessions.iter().enumerate() {
            let status = match i {
                0..=4 => Some(AttendanceStatus::Present),
                5 | 6 => Some(AttendanceStatus::Late),
                _ => None,
            };
            if let Some(status) = status {
                Model::record(&db, session, fx.student_id, status, None, None, false)
                    .await
                    .unwrap();
            }
        }
        for session in &fx.sessions {
            class_session::Model::set_status(&db, session.id, SessionStatus::Completed)
                .await
                .unwrap();
        }

        let pct = Model::percentage_for_batch(&db, fx.student_id, fx.batch.id)
            .await
            .unwrap();
        assert!((pct - 70.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_completion_backfills_absent_records() {
        let db = setup_test_db().await;
        let fx = fixture(&db).await;

        let first = &fx.sessions[0];
        class_session::Model::set_status(&db, first.id, SessionStatus::Completed)
            .await
            .unwrap();

        let record = Entity::find_by_id((first.id, fx.student_id))
            .one(&db)
            .await
            .unwrap()
            .expect("absent record should be back-filled");
        assert_eq!(record.status, AttendanceStatus::Absent);
    }

    #[tokio::test]
    async fn test_completed_session_locks_without_correction_privilege() {
        let db = setup_test_db().await;
        let fx = fixture(&db).await;

        let first = class_session::Model::set_status(
            &db,
            fx.sessions[0].id,
            SessionStatus::Completed,
        )
        .await
        .unwrap();

        let denied = Model::record(
            &db,
            &first,
            fx.student_id,
            AttendanceStatus::Present,
            None,
            None,
            false,
        )
        .await;
        assert!(matches!(denied, Err(AttendanceError::SessionLocked)));

        // An authorized correction flips the back-filled absent.
        let corrected = Model::record(
            &db,
            &first,
            fx.student_id,
            AttendanceStatus::Present,
            None,
            None,
            true,
        )
        .await
        .unwrap();
        assert_eq!(corrected.status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn test_leave_before_join_is_rejected() {
        let db = setup_test_db().await;
        let fx = fixture(&db).await;

        let session = &fx.sessions[0];
        let join = session.starts_at();
        let result = Model::record(
            &db,
            session,
            fx.student_id,
            AttendanceStatus::Present,
            Some(join),
            Some(join - chrono::Duration::minutes(5)),
            false,
        )
        .await;

        assert!(matches!(result, Err(AttendanceError::InvalidInterval)));
    }
}
