use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, SqlErr, Statement};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::EnrollmentError;
use crate::models::{batch, course, enrollment};

/// Seat ledger for a batch: one row per student who ever held a seat.
///
/// Only rows with status `active` count against the batch's capacity.
/// Withdrawal flips the row to `inactive`, which frees the seat while the
/// course-level enrollment lives on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "batch_students")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub batch_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    pub enrolled_at: DateTime<Utc>,
    pub status: BatchStudentStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "batch_student_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BatchStudentStatus {
    #[sea_orm(string_value = "active")]
    Active,

    #[sea_orm(string_value = "inactive")]
    Inactive,

    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::batch::Entity",
        from = "Column::BatchId",
        to = "super::batch::Column::Id",
        on_delete = "Cascade"
    )]
    Batch,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Enrolls a student into a batch, capturing the course's effective price
    /// on the course-level enrollment.
    ///
    /// The capacity check and the seat write are one conditional statement:
    /// the row is only inserted (or an inactive row reactivated) while the
    /// live count of active seats is below `max_students`. Concurrent calls
    /// against the last seat therefore cannot both succeed; the loser sees
    /// zero affected rows and gets `CapacityExceeded`.
    pub async fn enroll(
        db: &DbConn,
        batch: &batch::Model,
        student_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(Model, enrollment::Model), EnrollmentError> {
        if !batch.active {
            return Err(EnrollmentError::BatchInactive);
        }

        let course = course::Entity::find_by_id(batch.course_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                DbErr::RecordNotFound(format!("Course {} for batch {}", batch.course_id, batch.id))
            })?;

        let existing = Entity::find_by_id((batch.id, student_id)).one(db).await?;
        match existing.as_ref().map(|seat| seat.status) {
            Some(BatchStudentStatus::Active) | Some(BatchStudentStatus::Completed) => {
                return Err(EnrollmentError::AlreadyEnrolled);
            }
            _ => {}
        }

        let backend = db.get_database_backend();
        let now = Utc::now();
        let seats = i64::from(batch.max_students);

        let write = if existing.is_some() {
            db.execute(Statement::from_sql_and_values(
                backend,
                r#"UPDATE batch_students
                   SET status = 'active', enrolled_at = ?, updated_at = ?
                   WHERE batch_id = ? AND student_id = ? AND status = 'inactive'
                     AND (SELECT COUNT(*) FROM batch_students
                          WHERE batch_id = ? AND status = 'active') < ?"#,
                [
                    at.into(),
                    now.into(),
                    batch.id.into(),
                    student_id.into(),
                    batch.id.into(),
                    seats.into(),
                ],
            ))
            .await
        } else {
            db.execute(Statement::from_sql_and_values(
                backend,
                r#"INSERT INTO batch_students
                       (batch_id, student_id, enrolled_at, status, created_at, updated_at)
                   SELECT ?, ?, ?, 'active', ?, ?
                   WHERE (SELECT COUNT(*) FROM batch_students
                          WHERE batch_id = ? AND status = 'active') < ?"#,
                [
                    batch.id.into(),
                    student_id.into(),
                    at.into(),
                    now.into(),
                    now.into(),
                    batch.id.into(),
                    seats.into(),
                ],
            ))
            .await
        };

        let write = match write {
            Ok(result) => result,
            // Two racing first-time enrolls for the same student: the loser
            // hits the primary key, which is just "already enrolled".
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(EnrollmentError::AlreadyEnrolled);
            }
            Err(err) => return Err(err.into()),
        };

        if write.rows_affected() == 0 {
            return Err(EnrollmentError::CapacityExceeded);
        }

        let seat = Entity::find_by_id((batch.id, student_id))
            .one(db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("batch seat missing after enroll".into()))?;

        let enrollment = enrollment::Model::find_or_create_open(
            db,
            student_id,
            batch.course_id,
            at,
            course.effective_price_cents(at),
        )
        .await?;

        Ok((seat, enrollment))
    }

    /// Frees the student's seat without touching the course-level
    /// enrollment; the student may still complete the course via another
    /// batch.
    pub async fn withdraw(
        db: &DbConn,
        batch_id: i64,
        student_id: i64,
    ) -> Result<Model, EnrollmentError> {
        let seat = Entity::find_by_id((batch_id, student_id))
            .one(db)
            .await?
            .ok_or(EnrollmentError::NotEnrolled)?;

        if seat.status != BatchStudentStatus::Active {
            return Err(EnrollmentError::NotEnrolled);
        }

        let mut active: ActiveModel = seat.into();
        active.status = Set(BatchStudentStatus::Inactive);
        active.updated_at = Set(Utc::now());

        Ok(active.update(db).await?)
    }

    /// Marks the student's active seats for a course as completed. Called
    /// after the course-level enrollment reaches `completed` so batch rosters
    /// agree with the enrollment record.
    pub async fn mark_completed_for_course(
        db: &DbConn,
        student_id: i64,
        course_id: i64,
    ) -> Result<u64, DbErr> {
        let batch_ids: Vec<i64> = batch::Entity::find()
            .filter(batch::Column::CourseId.eq(course_id))
            .all(db)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        if batch_ids.is_empty() {
            return Ok(0);
        }

        let result = Entity::update_many()
            .col_expr(
                Column::Status,
                Expr::value(BatchStudentStatus::Completed),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::BatchId.is_in(batch_ids))
            .filter(Column::Status.eq(BatchStudentStatus::Active))
            .exec(db)
            .await?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{batch, course, user};
    use crate::test_utils::setup_test_db;
    use chrono::NaiveDate;
    use futures::future::join_all;

    async fn seed(db: &DbConn, capacity: i32) -> batch::Model {
        let instructor = user::Model::create(db, "inst", "inst@test.com", false)
            .await
            .unwrap();
        let course = course::Model::create(db, "RUST301", "Concurrency", 75_000, None)
            .await
            .unwrap();

        batch::Model::create(
            db,
            course.id,
            instructor.id,
            NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 28).unwrap(),
            capacity,
            true,
        )
        .await
        .unwrap()
    }

    async fn student(db: &DbConn, name: &str) -> user::Model {
        user::Model::create(db, name, &format!("{name}@test.com"), false)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_capacity_is_never_oversold() {
        let db = setup_test_db().await;
        let batch = seed(&db, 2).await;

        let a = student(&db, "stud_a").await;
        let b = student(&db, "stud_b").await;
        let c = student(&db, "stud_c").await;

        let now = Utc::now();
        Model::enroll(&db, &batch, a.id, now).await.unwrap();
        Model::enroll(&db, &batch, b.id, now).await.unwrap();

        let third = Model::enroll(&db, &batch, c.id, now).await;
        assert!(matches!(third, Err(EnrollmentError::CapacityExceeded)));

        assert_eq!(batch::Model::enrolled_count(&db, batch.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_enrolls_fill_exactly_capacity() {
        let db = setup_test_db().await;
        let capacity = 3;
        let batch = seed(&db, capacity).await;

        let mut ids = Vec::new();
        for i in 0..8 {
            ids.push(student(&db, &format!("racer_{i}")).await.id);
        }

        let now = Utc::now();
        let tasks = ids.into_iter().map(|student_id| {
            let db = db.clone();
            let batch = batch.clone();
            tokio::spawn(async move { Model::enroll(&db, &batch, student_id, now).await })
        });

        let outcomes = join_all(tasks).await;
        let mut successes = 0;
        let mut rejected = 0;
        for outcome in outcomes {
            match outcome.unwrap() {
                Ok(_) => successes += 1,
                Err(EnrollmentError::CapacityExceeded) => rejected += 1,
                Err(other) => panic!("unexpected enroll failure: {other}"),
            }
        }

        assert_eq!(successes, capacity as usize);
        assert_eq!(rejected, 8 - capacity as usize);
        assert_eq!(
            batch::Model::enrolled_count(&db, batch.id).await.unwrap(),
            capacity as u64
        );
    }

    #[tokio::test]
    async fn test_withdraw_frees_a_seat_and_reenroll_reactivates() {
        let db = setup_test_db().await;
        let batch = seed(&db, 1).await;

        let a = student(&db, "seat_a").await;
        let b = student(&db, "seat_b").await;

        let now = Utc::now();
        Model::enroll(&db, &batch, a.id, now).await.unwrap();
        assert!(matches!(
            Model::enroll(&db, &batch, b.id, now).await,
            Err(EnrollmentError::CapacityExceeded)
        ));

        Model::withdraw(&db, batch.id, a.id).await.unwrap();
        Model::enroll(&db, &batch, b.id, now).await.unwrap();

        // The freed student's row is still there, inactive, and can come back
        // only when a seat opens.
        assert!(matches!(
            Model::enroll(&db, &batch, a.id, now).await,
            Err(EnrollmentError::CapacityExceeded)
        ));

        Model::withdraw(&db, batch.id, b.id).await.unwrap();
        let (seat, _) = Model::enroll(&db, &batch, a.id, now).await.unwrap();
        assert_eq!(seat.status, BatchStudentStatus::Active);
    }

    #[tokio::test]
    async fn test_double_enroll_and_inactive_batch_are_rejected() {
        let db = setup_test_db().await;
        let batch = seed(&db, 5).await;
        let a = student(&db, "dup").await;

        let now = Utc::now();
        Model::enroll(&db, &batch, a.id, now).await.unwrap();
        assert!(matches!(
            Model::enroll(&db, &batch, a.id, now).await,
            Err(EnrollmentError::AlreadyEnrolled)
        ));

        let closed = batch::Model::set_active(&db, batch.id, false).await.unwrap();
        let b = student(&db, "late").await;
        assert!(matches!(
            Model::enroll(&db, &closed, b.id, now).await,
            Err(EnrollmentError::BatchInactive)
        ));
    }

    #[tokio::test]
    async fn test_enroll_captures_discounted_price() {
        use crate::models::course::Discount;
        use chrono::{Duration, TimeZone};

        let db = setup_test_db().await;
        let instructor = user::Model::create(&db, "inst_p", "inst_p@test.com", false)
            .await
            .unwrap();

        let starts_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let course = course::Model::create(
            &db,
            "RUST401",
            "Unsafe Rust",
            100_000,
            Some(Discount {
                percent: 20,
                active: true,
                starts_at,
                ends_at: starts_at + Duration::days(7),
            }),
        )
        .await
        .unwrap();

        let batch = batch::Model::create(
            &db,
            course.id,
            instructor.id,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 26).unwrap(),
            10,
            true,
        )
        .await
        .unwrap();

        let a = student(&db, "bargain").await;
        let inside = starts_at + Duration::days(3);
        let (_, enrollment) = Model::enroll(&db, &batch, a.id, inside).await.unwrap();
        assert_eq!(enrollment.price_cents, 80_000);
    }
}
