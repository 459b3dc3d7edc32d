use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, TransactionTrait};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::EnrollmentError;
use crate::models::{
    attendance_record, course, enrollment_status_history, enrollment_subject, subject,
};

/// Course-level record of one student's participation: the price captured at
/// enrollment time, a progress percentage, and a status machine whose every
/// transition is recorded in `enrollment_status_history`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub student_id: i64,
    pub course_id: i64,

    pub enrolled_at: DateTime<Utc>,
    /// Amount owed, fixed by the pricing engine at enrollment time.
    pub price_cents: i64,
    pub progress: f32,

    pub status: EnrollmentStatus,
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Enrollment lifecycle. `completed` and `dropped` are terminal; coming back
/// from either takes a brand-new enrollment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "enrollment_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EnrollmentStatus {
    #[sea_orm(string_value = "active")]
    Active,

    #[sea_orm(string_value = "completed")]
    Completed,

    #[sea_orm(string_value = "suspended")]
    Suspended,

    #[sea_orm(string_value = "dropped")]
    Dropped,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Student,

    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id",
        on_delete = "Cascade"
    )]
    Course,

    #[sea_orm(has_many = "super::enrollment_status_history::Entity")]
    History,

    #[sea_orm(has_many = "super::enrollment_subject::Entity")]
    CompletedSubjects,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::enrollment_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl Related<super::enrollment_subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompletedSubjects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The allowed-transition table. Everything not listed is invalid.
pub fn transition_allowed(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
    use EnrollmentStatus::*;
    matches!(
        (from, to),
        (Active, Completed) | (Active, Suspended) | (Active, Dropped) | (Suspended, Active) | (Suspended, Dropped)
    )
}

/// Progress from completed subjects, with attendance as the fallback signal
/// when the course defines no subjects. Pure; callers persist the result.
pub fn compute_progress(
    completed_subjects: u64,
    subject_count: u64,
    attendance_pct: f64,
) -> f64 {
    if subject_count > 0 {
        (100.0 * completed_subjects as f64 / subject_count as f64).clamp(0.0, 100.0)
    } else {
        attendance_pct.clamp(0.0, 100.0)
    }
}

impl Model {
    pub async fn get_by_id(db: &DbConn, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Returns the student's open (active or suspended) enrollment for a
    /// course, creating a fresh one with the given price if none exists.
    /// Terminal enrollments are never reopened.
    pub async fn find_or_create_open(
        db: &DbConn,
        student_id: i64,
        course_id: i64,
        at: DateTime<Utc>,
        price_cents: i64,
    ) -> Result<Model, DbErr> {
        let open = Entity::find()
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::CourseId.eq(course_id))
            .filter(
                Column::Status
                    .is_in([EnrollmentStatus::Active, EnrollmentStatus::Suspended]),
            )
            .order_by_desc(Column::Id)
            .one(db)
            .await?;

        if let Some(found) = open {
            return Ok(found);
        }

        let now = Utc::now();
        let enrollment = ActiveModel {
            student_id: Set(student_id),
            course_id: Set(course_id),
            enrolled_at: Set(at),
            price_cents: Set(price_cents),
            progress: Set(0.0),
            status: Set(EnrollmentStatus::Active),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        enrollment.insert(db).await
    }

    /// The single writer of enrollment status.
    ///
    /// The write is an optimistic conditional update keyed on the status the
    /// caller observed, with the history append in the same transaction, so
    /// concurrent transitions on one enrollment serialize cleanly. A lost
    /// race is retried once against the freshest read; a transition outside
    /// the table fails with `InvalidTransition` and leaves history untouched.
    pub async fn change_status(
        db: &DbConn,
        id: i64,
        new_status: EnrollmentStatus,
        actor_id: i64,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Model, EnrollmentError> {
        let mut current = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(EnrollmentError::NotFound)?;

        for _attempt in 0..2 {
            if !transition_allowed(current.status, new_status) {
                return Err(EnrollmentError::InvalidTransition {
                    from: current.status,
                    to: new_status,
                });
            }

            let txn = db.begin().await?;

            let mut update = Entity::update_many()
                .col_expr(Column::Status, Expr::value(new_status))
                .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(Column::Id.eq(id))
                .filter(Column::Status.eq(current.status));
            if new_status == EnrollmentStatus::Completed {
                update = update.col_expr(Column::CompletedAt, Expr::value(Some(at)));
            }

            let result = update.exec(&txn).await?;
            if result.rows_affected == 0 {
                // Lost the race; re-read and try once more.
                tracing::warn!(enrollment_id = id, "status changed under us; retrying with fresh read");
                txn.rollback().await?;
                current = Entity::find_by_id(id)
                    .one(db)
                    .await?
                    .ok_or(EnrollmentError::NotFound)?;
                continue;
            }

            enrollment_status_history::Model::append(
                &txn,
                id,
                new_status,
                at,
                actor_id,
                reason,
            )
            .await?;

            txn.commit().await?;

            return Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or(EnrollmentError::NotFound);
        }

        Err(EnrollmentError::Db(DbErr::Custom(
            "enrollment status changed concurrently; retry".into(),
        )))
    }

    /// Marks a subject complete for this enrollment and recomputes progress.
    pub async fn complete_subject(
        db: &DbConn,
        id: i64,
        subject_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Model, EnrollmentError> {
        let enrollment = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(EnrollmentError::NotFound)?;

        let subject = subject::Model::get_by_id(db, subject_id)
            .await?
            .filter(|s| s.course_id == enrollment.course_id)
            .ok_or(EnrollmentError::SubjectNotInCourse)?;

        enrollment_subject::Model::mark_complete(db, enrollment.id, subject.id, at).await?;

        Self::recompute_progress(db, id).await
    }

    /// Recomputes and persists the progress percentage from the current
    /// completed-subject set, falling back to attendance when the course has
    /// no subjects.
    pub async fn recompute_progress(db: &DbConn, id: i64) -> Result<Model, EnrollmentError> {
        let enrollment = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(EnrollmentError::NotFound)?;

        let subject_count = course::Model::subject_count(db, enrollment.course_id).await?;
        let progress = if subject_count > 0 {
            let completed =
                enrollment_subject::Model::count_for_enrollment(db, enrollment.id).await?;
            compute_progress(completed, subject_count, 0.0)
        } else {
            let attendance = attendance_record::Model::percentage_for_course(
                db,
                enrollment.student_id,
                enrollment.course_id,
            )
            .await?;
            compute_progress(0, 0, attendance)
        };

        let mut active: ActiveModel = enrollment.into();
        active.progress = Set(progress as f32);
        active.updated_at = Set(Utc::now());

        Ok(active.update(db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{enrollment_status_history as history, subject, user};
    use crate::test_utils::setup_test_db;

    async fn seed_enrollment(db: &DbConn) -> (Model, user::Model, i64) {
        let admin = user::Model::create(db, "registrar", "registrar@test.com", true)
            .await
            .unwrap();
        let student = user::Model::create(db, "enr_stud", "enr_stud@test.com", false)
            .await
            .unwrap();
        let course = crate::models::course::Model::create(db, "RUST601", "Pinning", 20_000, None)
            .await
            .unwrap();

        let enrollment =
            Model::find_or_create_open(db, student.id, course.id, Utc::now(), 20_000)
                .await
                .unwrap();

        (enrollment, admin, course.id)
    }

    #[tokio::test]
    async fn test_legal_transition_chain_appends_history() {
        let db = setup_test_db().await;
        let (enrollment, admin, _) = seed_enrollment(&db).await;

        let now = Utc::now();
        Model::change_status(
            &db,
            enrollment.id,
            EnrollmentStatus::Suspended,
            admin.id,
            Some("fees outstanding".into()),
            now,
        )
        .await
        .unwrap();
        Model::change_status(&db, enrollment.id, EnrollmentStatus::Active, admin.id, None, now)
            .await
            .unwrap();
        let dropped = Model::change_status(
            &db,
            enrollment.id,
            EnrollmentStatus::Dropped,
            admin.id,
            Some("student request".into()),
            now,
        )
        .await
        .unwrap();

        assert_eq!(dropped.status, EnrollmentStatus::Dropped);

        let entries = history::Model::list_for_enrollment(&db, enrollment.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].status, EnrollmentStatus::Suspended);
        assert_eq!(entries[0].reason.as_deref(), Some("fees outstanding"));
        assert_eq!(entries[1].status, EnrollmentStatus::Active);
        assert_eq!(entries[2].status, EnrollmentStatus::Dropped);
    }

    #[tokio::test]
    async fn test_terminal_statuses_reject_further_transitions() {
        let db = setup_test_db().await;
        let (enrollment, admin, _) = seed_enrollment(&db).await;

        let now = Utc::now();
        Model::change_status(&db, enrollment.id, EnrollmentStatus::Dropped, admin.id, None, now)
            .await
            .unwrap();

        let back = Model::change_status(
            &db,
            enrollment.id,
            EnrollmentStatus::Active,
            admin.id,
            None,
            now,
        )
        .await;
        assert!(matches!(
            back,
            Err(EnrollmentError::InvalidTransition {
                from: EnrollmentStatus::Dropped,
                to: EnrollmentStatus::Active,
            })
        ));

        // A rejected transition leaves the audit trail untouched.
        let entries = history::Model::list_for_enrollment(&db, enrollment.id)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_stamps_completed_at() {
        let db = setup_test_db().await;
        let (enrollment, admin, _) = seed_enrollment(&db).await;

        let at = Utc::now();
        let completed = Model::change_status(
            &db,
            enrollment.id,
            EnrollmentStatus::Completed,
            admin.id,
            None,
            at,
        )
        .await
        .unwrap();

        assert_eq!(completed.status, EnrollmentStatus::Completed);
        assert!(completed.completed_at.is_some());
    }

    #[test]
    fn test_compute_progress_weights_and_clamps() {
        assert_eq!(compute_progress(1, 4, 0.0), 25.0);
        assert_eq!(compute_progress(4, 4, 0.0), 100.0);
        // More completions than subjects clamps rather than overflowing.
        assert_eq!(compute_progress(6, 4, 0.0), 100.0);
        // No subjects: attendance drives progress.
        assert_eq!(compute_progress(0, 0, 70.0), 70.0);
        assert_eq!(compute_progress(0, 0, 130.0), 100.0);
    }

    #[tokio::test]
    async fn test_subject_completion_recomputes_progress() {
        let db = setup_test_db().await;
        let (enrollment, _, course_id) = seed_enrollment(&db).await;

        let mut subject_ids = Vec::new();
        for i in 0..4 {
            let s = subject::Model::create(&db, course_id, &format!("Unit {i}"), i)
                .await
                .unwrap();
            subject_ids.push(s.id);
        }

        let updated = Model::complete_subject(&db, enrollment.id, subject_ids[0], Utc::now())
            .await
            .unwrap();
        assert!((updated.progress - 25.0).abs() < f32::EPSILON);

        // Completing the same subject twice is idempotent.
        let again = Model::complete_subject(&db, enrollment.id, subject_ids[0], Utc::now())
            .await
            .unwrap();
        assert!((again.progress - 25.0).abs() < f32::EPSILON);

        // A subject from another course is refused.
        let other = crate::models::course::Model::create(&db, "RUST602", "Send+Sync", 10_000, None)
            .await
            .unwrap();
        let foreign = subject::Model::create(&db, other.id, "Elsewhere", 0).await.unwrap();
        let denied = Model::complete_subject(&db, enrollment.id, foreign.id, Utc::now()).await;
        assert!(matches!(denied, Err(EnrollmentError::SubjectNotInCourse)));
    }
}
