use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::QueryOrder;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::BatchError;

/// One weekly recurrence of a batch's timetable: "every Tuesday 10:00-12:00".
///
/// Day numbering follows `chrono::Weekday::num_days_from_monday`:
/// 0 = Monday through 6 = Sunday.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "schedule_slots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub batch_id: i64,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: Option<i64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "SetNull"
    )]
    Subject,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DbConn,
        batch_id: i64,
        day_of_week: i16,
        start_time: NaiveTime,
        end_time: NaiveTime,
        subject_id: Option<i64>,
    ) -> Result<Model, BatchError> {
        if !(0..=6).contains(&day_of_week) {
            return Err(BatchError::InvalidDayOfWeek);
        }
        if start_time >= end_time {
            return Err(BatchError::InvalidSlotTimes);
        }

        let now = Utc::now();
        let slot = ActiveModel {
            batch_id: Set(batch_id),
            day_of_week: Set(day_of_week),
            start_time: Set(start_time),
            end_time: Set(end_time),
            subject_id: Set(subject_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(slot.insert(db).await?)
    }

    pub async fn list_for_batch(db: &DbConn, batch_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::BatchId.eq(batch_id))
            .order_by_asc(Column::DayOfWeek)
            .order_by_asc(Column::StartTime)
            .all(db)
            .await
    }

    /// Removes a slot from the weekly timetable. Sessions already
    /// materialized from it are left untouched; their `slot_id` is nulled by
    /// the foreign key so recorded attendance survives.
    pub async fn delete(db: &DbConn, id: i64) -> Result<(), DbErr> {
        Entity::delete_by_id(id).exec(db).await?;
        Ok(())
    }
}
