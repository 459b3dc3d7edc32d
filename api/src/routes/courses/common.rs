use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use db::models::course::{self, Discount};
use db::models::subject;

#[derive(Debug, Deserialize, Validate)]
pub struct DiscountReq {
    #[validate(range(min = 0, max = 100))]
    pub percent: i32,
    #[serde(default)]
    pub active: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl From<&DiscountReq> for Discount {
    fn from(req: &DiscountReq) -> Self {
        Discount {
            percent: req.percent,
            active: req.active,
            starts_at: req.starts_at,
            ends_at: req.ends_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseReq {
    #[validate(length(min = 1))]
    pub code: String,
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(range(min = 1))]
    pub base_fee_cents: i64,
    #[validate(nested)]
    pub discount: Option<DiscountReq>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectReq {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Default, Serialize)]
pub struct CourseResponse {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub base_fee_cents: i64,
    pub discount_percent: Option<i32>,
    pub discount_active: bool,
    pub discount_starts_at: Option<String>,
    pub discount_ends_at: Option<String>,
    pub subject_count: u64,
}

impl From<course::Model> for CourseResponse {
    fn from(m: course::Model) -> Self {
        Self {
            id: m.id,
            code: m.code,
            title: m.title,
            base_fee_cents: m.base_fee_cents,
            discount_percent: m.discount_percent,
            discount_active: m.discount_active,
            discount_starts_at: m.discount_starts_at.map(|t| t.to_rfc3339()),
            discount_ends_at: m.discount_ends_at.map(|t| t.to_rfc3339()),
            subject_count: 0,
        }
    }
}

impl CourseResponse {
    pub fn from_with_subject_count(m: course::Model, subject_count: u64) -> Self {
        let mut base = Self::from(m);
        base.subject_count = subject_count;
        base
    }
}

#[derive(Debug, Default, Serialize)]
pub struct SubjectResponse {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub position: i32,
}

impl From<subject::Model> for SubjectResponse {
    fn from(m: subject::Model) -> Self {
        Self {
            id: m.id,
            course_id: m.course_id,
            title: m.title,
            position: m.position,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct PriceQuoteResponse {
    pub course_id: i64,
    pub at: String,
    pub base_fee_cents: i64,
    pub effective_price_cents: i64,
    pub discount_applied: bool,
}
