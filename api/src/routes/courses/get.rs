use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use db::models::course;
use util::state::AppState;

use super::common::{CourseResponse, PriceQuoteResponse};
use crate::response::ApiResponse;
use crate::routes::common::db_error_status;

/// GET /api/courses/{course_id}
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
) -> (StatusCode, Json<ApiResponse<CourseResponse>>) {
    let db = state.db();

    let found = match course::Model::get_by_id(db, course_id).await {
        Ok(found) => found,
        Err(e) => {
            return (
                db_error_status(&e),
                Json(ApiResponse::error("Failed to fetch course")),
            );
        }
    };

    let Some(found) = found else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Course not found")),
        );
    };

    let subject_count = course::Model::subject_count(db, course_id)
        .await
        .unwrap_or(0);

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            CourseResponse::from_with_subject_count(found, subject_count),
            "Course fetched",
        )),
    )
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    /// Pricing instant; defaults to now. Injectable so quotes are
    /// reproducible.
    pub at: Option<DateTime<Utc>>,
}

/// GET /api/courses/{course_id}/price
pub async fn get_price(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Query(query): Query<PriceQuery>,
) -> (StatusCode, Json<ApiResponse<PriceQuoteResponse>>) {
    let db = state.db();

    let found = match course::Model::get_by_id(db, course_id).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Course not found")),
            );
        }
        Err(e) => {
            return (
                db_error_status(&e),
                Json(ApiResponse::error("Failed to fetch course")),
            );
        }
    };

    let at = query.at.unwrap_or_else(Utc::now);
    let effective = found.effective_price_cents(at);

    (
        StatusCode::OK,
        Json(ApiResponse::success(
            PriceQuoteResponse {
                course_id: found.id,
                at: at.to_rfc3339(),
                base_fee_cents: found.base_fee_cents,
                effective_price_cents: effective,
                discount_applied: effective != found.base_fee_cents,
            },
            "Price computed",
        )),
    )
}
