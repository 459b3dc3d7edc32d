use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::PaginatorTrait;
use sea_orm::entity::prelude::*;
use serde::Serialize;

/// The set of subjects a student has completed within an enrollment.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "enrollment_subjects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub enrollment_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub subject_id: i64,

    pub completed_at: DateTime<Utc>,
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
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "Cascade"
    )]
    Subject,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Idempotently marks a subject complete for an enrollment.
    pub async fn mark_complete(
        db: &DbConn,
        enrollment_id: i64,
        subject_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        if let Some(existing) = Entity::find_by_id((enrollment_id, subject_id)).one(db).await? {
            return Ok(existing);
        }

        let entry = ActiveModel {
            enrollment_id: Set(enrollment_id),
            subject_id: Set(subject_id),
            completed_at: Set(at),
        };

        entry.insert(db).await
    }

    pub async fn count_for_enrollment(db: &DbConn, enrollment_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::EnrollmentId.eq(enrollment_id))
            .count(db)
            .await
    }
}
