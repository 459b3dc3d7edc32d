use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::PaginatorTrait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::errors::CourseError;

/// Catalog record for a course. Fees are stored in minor currency units
/// (cents) so pricing stays exact integer arithmetic.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub code: String,
    pub title: String,
    pub base_fee_cents: i64,

    /// Time-bounded discount descriptor. All three fields are present
    /// together or not at all; `create`/`set_discount` enforce that.
    pub discount_percent: Option<i32>,
    pub discount_active: bool,
    pub discount_starts_at: Option<DateTime<Utc>>,
    pub discount_ends_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A discount window as accepted at course-write time.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Discount {
    pub percent: i32,
    pub active: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subject::Entity")]
    Subjects,

    #[sea_orm(has_many = "super::batch::Entity")]
    Batches,

    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subjects.def()
    }
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batches.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn validate_discount(discount: &Discount) -> Result<(), CourseError> {
    if !(0..=100).contains(&discount.percent) {
        return Err(CourseError::InvalidDiscountPercent);
    }
    if discount.ends_at < discount.starts_at {
        return Err(CourseError::InvalidDiscountWindow);
    }
    Ok(())
}

/// Applies `percent` off `base_cents`, rounding half to even on the cent.
///
/// `base_cents * (100 - percent)` is exact; only the final division by 100
/// can produce a fractional cent, so the tie decision looks at that
/// remainder alone.
fn discounted_cents(base_cents: i64, percent: i64) -> i64 {
    let product = base_cents * (100 - percent);
    let quotient = product / 100;
    let remainder = product % 100;

    match remainder.cmp(&50) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1,
        Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    }
}

impl Model {
    /// Creates a course after validating the fee and discount descriptor.
    ///
    /// Malformed discounts are rejected here, at write time; the pricing
    /// engine assumes well-formed input.
    pub async fn create(
        db: &DbConn,
        code: &str,
        title: &str,
        base_fee_cents: i64,
        discount: Option<Discount>,
    ) -> Result<Model, CourseError> {
        if base_fee_cents <= 0 {
            return Err(CourseError::InvalidBaseFee);
        }
        if let Some(ref d) = discount {
            validate_discount(d)?;
        }

        let now = Utc::now();
        let course = ActiveModel {
            code: Set(code.to_owned()),
            title: Set(title.to_owned()),
            base_fee_cents: Set(base_fee_cents),
            discount_percent: Set(discount.map(|d| d.percent)),
            discount_active: Set(discount.map(|d| d.active).unwrap_or(false)),
            discount_starts_at: Set(discount.map(|d| d.starts_at)),
            discount_ends_at: Set(discount.map(|d| d.ends_at)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        Ok(course.insert(db).await?)
    }

    /// Replaces or clears the discount descriptor on an existing course.
    pub async fn set_discount(
        db: &DbConn,
        id: i64,
        discount: Option<Discount>,
    ) -> Result<Model, CourseError> {
        if let Some(ref d) = discount {
            validate_discount(d)?;
        }

        let course = ActiveModel {
            id: Set(id),
            discount_percent: Set(discount.map(|d| d.percent)),
            discount_active: Set(discount.map(|d| d.active).unwrap_or(false)),
            discount_starts_at: Set(discount.map(|d| d.starts_at)),
            discount_ends_at: Set(discount.map(|d| d.ends_at)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        Ok(course.update(db).await?)
    }

    pub async fn get_by_id(db: &DbConn, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    /// Number of subjects defined for this course; drives progress weighting.
    pub async fn subject_count(db: &DbConn, course_id: i64) -> Result<u64, DbErr> {
        super::subject::Entity::find()
            .filter(super::subject::Column::CourseId.eq(course_id))
            .count(db)
            .await
    }

    /// Whether the discount descriptor applies at `at`.
    ///
    /// Valid only when the active flag is set and `at` lies inside the
    /// inclusive `[starts_at, ends_at]` window.
    pub fn discount_valid_at(&self, at: DateTime<Utc>) -> bool {
        if !self.discount_active {
            return false;
        }
        match (
            self.discount_percent,
            self.discount_starts_at,
            self.discount_ends_at,
        ) {
            (Some(_), Some(starts_at), Some(ends_at)) => starts_at <= at && at <= ends_at,
            _ => false,
        }
    }

    /// Price owed for this course at the given instant, in cents.
    ///
    /// The instant is always passed in by the caller so pricing stays
    /// deterministic and testable; `Utc::now()` only ever appears at call
    /// sites.
    pub fn effective_price_cents(&self, at: DateTime<Utc>) -> i64 {
        if !self.discount_valid_at(at) {
            return self.base_fee_cents;
        }
        let percent = i64::from(self.discount_percent.unwrap_or(0));
        discounted_cents(self.base_fee_cents, percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        (start, start + Duration::days(7))
    }

    #[tokio::test]
    async fn test_effective_price_inside_and_outside_window() {
        let db = setup_test_db().await;
        let (starts_at, ends_at) = window();

        let course = Model::create(
            &db,
            "RUST101",
            "Intro to Rust",
            100_000, // 1000.00
            Some(Discount {
                percent: 20,
                active: true,
                starts_at,
                ends_at,
            }),
        )
        .await
        .unwrap();

        // Inside the window: 20% off.
        let mid = starts_at + Duration::days(3);
        assert_eq!(course.effective_price_cents(mid), 80_000);

        // Day after the window closes: full fee again.
        let late = starts_at + Duration::days(8);
        assert_eq!(course.effective_price_cents(late), 100_000);

        // Window bounds are inclusive.
        assert_eq!(course.effective_price_cents(starts_at), 80_000);
        assert_eq!(course.effective_price_cents(ends_at), 80_000);

        // Before the window opens: full fee.
        assert_eq!(
            course.effective_price_cents(starts_at - Duration::seconds(1)),
            100_000
        );
    }

    #[tokio::test]
    async fn test_inactive_discount_is_ignored() {
        let db = setup_test_db().await;
        let (starts_at, ends_at) = window();

        let course = Model::create(
            &db,
            "RUST102",
            "Ownership",
            50_000,
            Some(Discount {
                percent: 50,
                active: false,
                starts_at,
                ends_at,
            }),
        )
        .await
        .unwrap();

        let mid = starts_at + Duration::days(1);
        assert_eq!(course.effective_price_cents(mid), 50_000);
    }

    #[tokio::test]
    async fn test_effective_price_never_exceeds_base_fee() {
        let db = setup_test_db().await;
        let (starts_at, ends_at) = window();

        let course = Model::create(
            &db,
            "RUST103",
            "Lifetimes",
            99_999,
            Some(Discount {
                percent: 0,
                active: true,
                starts_at,
                ends_at,
            }),
        )
        .await
        .unwrap();

        for offset in [-1i64, 0, 3, 7, 8] {
            let at = starts_at + Duration::days(offset);
            assert!(course.effective_price_cents(at) <= course.base_fee_cents);
        }
    }

    #[test]
    fn test_discounted_cents_rounds_half_to_even() {
        // 150 * 75 = 11250 -> 112.50 -> ties to 112 (even).
        assert_eq!(discounted_cents(150, 25), 112);
        // 250 * 75 = 18750 -> 187.50 -> ties to 188 (even).
        assert_eq!(discounted_cents(250, 25), 188);
        // 999 * 95 = 94905 -> 949.05 -> down.
        assert_eq!(discounted_cents(999, 5), 949);
        // 999 * 93 = 92907 -> 929.07 -> down; 997 * 93 = 92721 -> 927.21 -> down.
        assert_eq!(discounted_cents(999, 7), 929);
        // 100% off is free, 0% off is identity.
        assert_eq!(discounted_cents(12345, 100), 0);
        assert_eq!(discounted_cents(12345, 0), 12345);
    }

    #[tokio::test]
    async fn test_malformed_discounts_rejected_at_write_time() {
        let db = setup_test_db().await;
        let (starts_at, ends_at) = window();

        let over_percent = Model::create(
            &db,
            "BAD1",
            "Bad percent",
            10_000,
            Some(Discount {
                percent: 101,
                active: true,
                starts_at,
                ends_at,
            }),
        )
        .await;
        assert!(matches!(
            over_percent,
            Err(CourseError::InvalidDiscountPercent)
        ));

        let backwards_window = Model::create(
            &db,
            "BAD2",
            "Bad window",
            10_000,
            Some(Discount {
                percent: 10,
                active: true,
                starts_at: ends_at,
                ends_at: starts_at,
            }),
        )
        .await;
        assert!(matches!(
            backwards_window,
            Err(CourseError::InvalidDiscountWindow)
        ));

        let free_course = Model::create(&db, "BAD3", "Zero fee", 0, None).await;
        assert!(matches!(free_course, Err(CourseError::InvalidBaseFee)));
    }
}
