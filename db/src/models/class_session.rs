use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::QueryOrder;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::SessionError;

/// One concrete dated occurrence of a batch's weekly schedule.
///
/// Sessions are created by materialization and never deleted once attendance
/// exists; editing the weekly timetable only affects dates that have not been
/// materialized yet.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "class_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub batch_id: i64,
    /// Slot this session was expanded from. Nulled when the slot is removed
    /// so the session (and its attendance) outlives timetable edits.
    pub slot_id: Option<i64>,

    pub session_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub subject_id: Option<i64>,

    pub status: SessionStatus,

    pub meeting_url: Option<String>,
    pub recording_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a class session. Time advances scheduled -> ongoing ->
/// completed; cancellation is an explicit instructor action. Completed and
/// cancelled are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "class_session_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SessionStatus {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,

    #[sea_orm(string_value = "ongoing")]
    Ongoing,

    #[sea_orm(string_value = "completed")]
    Completed,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
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
        belongs_to = "super::schedule_slot::Entity",
        from = "Column::SlotId",
        to = "super::schedule_slot::Column::Id",
        on_delete = "SetNull"
    )]
    Slot,

    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn transition_allowed(from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;
    matches!(
        (from, to),
        (Scheduled, Ongoing) | (Scheduled, Completed) | (Scheduled, Cancelled) | (Ongoing, Completed) | (Ongoing, Cancelled)
    )
}

impl Model {
    /// Instant this session starts, on the UTC wall clock.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.session_date.and_time(self.start_time).and_utc()
    }

    /// Instant this session ends.
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.session_date.and_time(self.end_time).and_utc()
    }

    pub async fn get_by_id(db: &DbConn, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Sessions of a batch in ascending (date, start time) order.
    pub async fn list_for_batch(db: &DbConn, batch_id: i64) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::BatchId.eq(batch_id))
            .order_by_asc(Column::SessionDate)
            .order_by_asc(Column::StartTime)
            .all(db)
            .await
    }

    /// Explicit status change by an instructor or admin.
    ///
    /// Completed and cancelled sessions never revert. Completing a session
    /// back-fills an `absent` record for every active student who was not
    /// marked, so the attendance denominator is stable from then on.
    pub async fn set_status(
        db: &DbConn,
        id: i64,
        new_status: SessionStatus,
    ) -> Result<Model, SessionError> {
        let session = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(SessionError::NotFound)?;

        if session.status == new_status {
            return Ok(session);
        }
        if !transition_allowed(session.status, new_status) {
            return Err(SessionError::InvalidStatusChange {
                from: session.status,
                to: new_status,
            });
        }

        let mut active: ActiveModel = session.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        if new_status == SessionStatus::Completed {
            super::attendance_record::Model::backfill_absent(db, &updated).await?;
        }

        Ok(updated)
    }

    /// Attaches meeting/recording links for remote sessions.
    pub async fn set_links(
        db: &DbConn,
        id: i64,
        meeting_url: Option<String>,
        recording_url: Option<String>,
    ) -> Result<Model, SessionError> {
        let session = Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(SessionError::NotFound)?;

        let mut active: ActiveModel = session.into();
        if meeting_url.is_some() {
            active.meeting_url = Set(meeting_url);
        }
        if recording_url.is_some() {
            active.recording_url = Set(recording_url);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(db).await?)
    }

    /// Idempotent wall-clock sweep over one batch's non-terminal sessions:
    /// scheduled sessions whose start has passed become ongoing, sessions
    /// whose end has passed become completed (with absent back-fill).
    ///
    /// Safe to run from a periodic job or on demand; a second sweep at the
    /// same instant changes nothing.
    pub async fn sweep(db: &DbConn, batch_id: i64, now: DateTime<Utc>) -> Result<u64, SessionError> {
        let open = Entity::find()
            .filter(Column::BatchId.eq(batch_id))
            .filter(
                Column::Status
                    .is_in([SessionStatus::Scheduled, SessionStatus::Ongoing]),
            )
            .all(db)
            .await?;

        let mut advanced = 0u64;
        for session in open {
            let next = if now >= session.ends_at() {
                SessionStatus::Completed
            } else if now >= session.starts_at() && session.status == SessionStatus::Scheduled {
                SessionStatus::Ongoing
            } else {
                continue;
            };

            Model::set_status(db, session.id, next).await?;
            advanced += 1;
        }

        Ok(advanced)
    }
}
