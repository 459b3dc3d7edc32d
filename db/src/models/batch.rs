use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{Condition, PaginatorTrait};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::BatchError;
use crate::models::batch_student::{self, BatchStudentStatus};
use crate::models::class_session::{self, SessionStatus};
use crate::models::schedule_slot;

/// A scheduled offering of a course to a capped group of students, with a
/// recurring weekly timetable bounded by `[start_date, end_date]`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub course_id: i64,
    pub instructor_id: i64,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_students: i32,
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id",
        on_delete = "Cascade"
    )]
    Course,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InstructorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Instructor,

    #[sea_orm(has_many = "super::schedule_slot::Entity")]
    Slots,

    #[sea_orm(has_many = "super::class_session::Entity")]
    Sessions,

    #[sea_orm(has_many = "super::batch_student::Entity")]
    Students,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::schedule_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Slots.def()
    }
}

impl Related<super::class_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::batch_student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Creates a batch. `start_date <= end_date` and a non-negative capacity
    /// are hard preconditions; the engines downstream assume them.
    pub async fn create(
        db: &DbConn,
        course_id: i64,
        instructor_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        max_students: i32,
        active: bool,
    ) -> Result<Model, BatchError> {
        if end_date < start_date {
            return Err(BatchError::InvalidRange);
        }
        if max_students < 0 {
            return Err(BatchError::InvalidCapacity);
        }

        let now = Utc::now();
        let batch = ActiveModel {
            course_id: Set(course_id),
            instructor_id: Set(instructor_id),
            start_date: Set(start_date),
            end_date: Set(end_date),
            max_students: Set(max_students),
            active: Set(active),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(batch.insert(db).await?)
    }

    pub async fn get_by_id(db: &DbConn, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn set_active(db: &DbConn, id: i64, active: bool) -> Result<Model, BatchError> {
        let batch = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(BatchError::NotFound)?;

        let mut model: ActiveModel = batch.into();
        model.active = Set(active);
        model.updated_at = Set(Utc::now());

        Ok(model.update(db).await?)
    }

    /// Edits the batch's date range. Sessions already materialized are left
    /// alone; the next materialization fills in any newly covered dates.
    pub async fn set_date_range(
        db: &DbConn,
        id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Model, BatchError> {
        if end_date < start_date {
            return Err(BatchError::InvalidRange);
        }

        let batch = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(BatchError::NotFound)?;

        let mut model: ActiveModel = batch.into();
        model.start_date = Set(start_date);
        model.end_date = Set(end_date);
        model.updated_at = Set(Utc::now());

        Ok(model.update(db).await?)
    }

    /// Number of students currently holding a seat in this batch.
    pub async fn enrolled_count(db: &DbConn, batch_id: i64) -> Result<u64, DbErr> {
        batch_student::Entity::find()
            .filter(batch_student::Column::BatchId.eq(batch_id))
            .filter(batch_student::Column::Status.eq(BatchStudentStatus::Active))
            .count(db)
            .await
    }

    /// Expands every weekly slot into dated sessions across the batch's date
    /// range, skipping (date, start time) pairs that already have a session.
    ///
    /// Re-running is a no-op for unchanged input, and after a date-range edit
    /// only the uncovered remainder is created; existing sessions, including
    /// any with recorded attendance, are never touched. Returns the batch's
    /// full session list in ascending (date, start time) order.
    pub async fn materialize_sessions(
        &self,
        db: &DbConn,
    ) -> Result<Vec<class_session::Model>, BatchError> {
        let slots = schedule_slot::Model::list_for_batch(db, self.id).await?;

        let existing: HashSet<(NaiveDate, chrono::NaiveTime)> =
            class_session::Entity::find()
                .filter(class_session::Column::BatchId.eq(self.id))
                .all(db)
                .await?
                .into_iter()
                .map(|s| (s.session_date, s.start_time))
                .collect();

        let now = Utc::now();
        let mut fresh = Vec::new();
        for slot in &slots {
            let dates = self
                .start_date
                .iter_days()
                .take_while(|d| *d <= self.end_date)
                .filter(|d| d.weekday().num_days_from_monday() == slot.day_of_week as u32);

            for date in dates {
                if existing.contains(&(date, slot.start_time)) {
                    continue;
                }
                fresh.push(class_session::ActiveModel {
                    batch_id: Set(self.id),
                    slot_id: Set(Some(slot.id)),
                    session_date: Set(date),
                    start_time: Set(slot.start_time),
                    end_time: Set(slot.end_time),
                    subject_id: Set(slot.subject_id),
                    status: Set(SessionStatus::Scheduled),
                    meeting_url: Set(None),
                    recording_url: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                });
            }
        }

        if !fresh.is_empty() {
            tracing::debug!(batch_id = self.id, created = fresh.len(), "materializing class sessions");
            class_session::Entity::insert_many(fresh).exec(db).await?;
        }

        Ok(class_session::Model::list_for_batch(db, self.id).await?)
    }

    /// Scheduled sessions at or after `from`; dashboard metric, not an
    /// invariant input.
    pub async fn upcoming_count(
        db: &DbConn,
        batch_id: i64,
        from: DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let from_date = from.date_naive();
        let from_time = from.time();

        class_session::Entity::find()
            .filter(class_session::Column::BatchId.eq(batch_id))
            .filter(class_session::Column::Status.eq(SessionStatus::Scheduled))
            .filter(
                Condition::any()
                    .add(class_session::Column::SessionDate.gt(from_date))
                    .add(
                        Condition::all()
                            .add(class_session::Column::SessionDate.eq(from_date))
                            .add(class_session::Column::StartTime.gte(from_time)),
                    ),
            )
            .count(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{course, schedule_slot, user};
    use crate::test_utils::setup_test_db;
    use chrono::{NaiveTime, TimeZone};

    async fn seed_batch(db: &DbConn, start: NaiveDate, end: NaiveDate) -> Model {
        let instructor = user::Model::create(db, "inst", "inst@test.com", false)
            .await
            .unwrap();
        let course = course::Model::create(db, "RUST201", "Async Rust", 50_000, None)
            .await
            .unwrap();

        Model::create(db, course.id, instructor.id, start, end, 10, true)
            .await
            .unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_materialize_expands_weekly_slots_in_order() {
        let db = setup_test_db().await;

        // 2026-03-02 is a Monday; two full weeks.
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let batch = seed_batch(&db, start, end).await;

        // Wednesday 14:00 and Monday 10:00, inserted out of week order.
        schedule_slot::Model::create(&db, batch.id, 2, t(14, 0), t(16, 0), None)
            .await
            .unwrap();
        schedule_slot::Model::create(&db, batch.id, 0, t(10, 0), t(12, 0), None)
            .await
            .unwrap();

        let sessions = batch.materialize_sessions(&db).await.unwrap();

        let got: Vec<(NaiveDate, NaiveTime)> = sessions
            .iter()
            .map(|s| (s.session_date, s.start_time))
            .collect();
        let expected = vec![
            (NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), t(10, 0)),
            (NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(), t(14, 0)),
            (NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(), t(10, 0)),
            (NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(), t(14, 0)),
        ];
        assert_eq!(got, expected);
        assert!(
            sessions
                .iter()
                .all(|s| s.status == SessionStatus::Scheduled)
        );
    }

    #[tokio::test]
    async fn test_materialize_is_idempotent() {
        let db = setup_test_db().await;

        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 29).unwrap();
        let batch = seed_batch(&db, start, end).await;

        schedule_slot::Model::create(&db, batch.id, 4, t(9, 0), t(11, 0), None)
            .await
            .unwrap();

        let first = batch.materialize_sessions(&db).await.unwrap();
        let second = batch.materialize_sessions(&db).await.unwrap();

        assert_eq!(first.len(), 4); // four Fridays in the range
        assert_eq!(
            first.iter().map(|s| s.id).collect::<Vec<_>>(),
            second.iter().map(|s| s.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_materialize_after_range_extension_keeps_existing_sessions() {
        let db = setup_test_db().await;

        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let batch = seed_batch(&db, start, end).await;

        schedule_slot::Model::create(&db, batch.id, 0, t(10, 0), t(12, 0), None)
            .await
            .unwrap();

        let first = batch.materialize_sessions(&db).await.unwrap();
        assert_eq!(first.len(), 1);
        let original_id = first[0].id;

        let extended = Model::set_date_range(
            &db,
            batch.id,
            start,
            NaiveDate::from_ymd_opt(2026, 3, 22).unwrap(),
        )
        .await
        .unwrap();

        let second = extended.materialize_sessions(&db).await.unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second[0].id, original_id);
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_date_range() {
        let db = setup_test_db().await;
        let instructor = user::Model::create(&db, "inst2", "inst2@test.com", false)
            .await
            .unwrap();
        let course = course::Model::create(&db, "RUST202", "Macros", 30_000, None)
            .await
            .unwrap();

        let result = Model::create(
            &db,
            course.id,
            instructor.id,
            NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            10,
            true,
        )
        .await;

        assert!(matches!(result, Err(BatchError::InvalidRange)));
    }

    #[tokio::test]
    async fn test_upcoming_count_uses_date_and_time_boundary() {
        let db = setup_test_db().await;

        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let batch = seed_batch(&db, start, end).await;

        schedule_slot::Model::create(&db, batch.id, 0, t(10, 0), t(12, 0), None)
            .await
            .unwrap();
        batch.materialize_sessions(&db).await.unwrap();

        // Exactly at the first session's start: still counted.
        let at_start = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        assert_eq!(Model::upcoming_count(&db, batch.id, at_start).await.unwrap(), 2);

        // A minute later the first session no longer counts.
        let after = Utc.with_ymd_and_hms(2026, 3, 2, 10, 1, 0).unwrap();
        assert_eq!(Model::upcoming_count(&db, batch.id, after).await.unwrap(), 1);
    }
}
