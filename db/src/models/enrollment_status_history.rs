use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder};
use serde::Serialize;

use crate::models::enrollment::EnrollmentStatus;

/// Append-only audit trail of an enrollment's status transitions. Rows are
/// only ever written by `enrollment::Model::change_status`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "enrollment_status_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub enrollment_id: i64,
    pub status: EnrollmentStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: i64,
    pub reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::enrollment::Entity",
        from = "Column::EnrollmentId",
        to = "super::enrollment::Column::Id",
        on_delete = "Cascade"
    )]
    Enrollment,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ChangedBy",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Actor,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn append<C: ConnectionTrait>(
        db: &C,
        enrollment_id: i64,
        status: EnrollmentStatus,
        changed_at: DateTime<Utc>,
        changed_by: i64,
        reason: Option<String>,
    ) -> Result<Model, DbErr> {
        let entry = ActiveModel {
            enrollment_id: Set(enrollment_id),
            status: Set(status),
            changed_at: Set(changed_at),
            changed_by: Set(changed_by),
            reason: Set(reason),
            ..Default::default()
        };

        entry.insert(db).await
    }

    /// History for one enrollment, oldest first.
    pub async fn list_for_enrollment(
        db: &DbConn,
        enrollment_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::EnrollmentId.eq(enrollment_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }
}
