//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness check (public)
//! - `/courses` → catalog writes (admin) and price quotes (authenticated)
//! - `/batches` → batch creation, enrollment, session schedule and attendance
//! - `/enrollments` → status transitions, completed subjects and progress

use axum::{Router, middleware::from_fn};
use util::state::AppState;

use crate::auth::guards::allow_authenticated;

pub mod batches;
pub mod common;
pub mod courses;
pub mod enrollments;
pub mod health;

/// Builds the complete application router for all HTTP endpoints.
///
/// Everything except `/health` requires a valid bearer token; finer-grained
/// role guards (admin, batch instructor) are layered per route inside the
/// resource modules.
pub fn routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/health", health::health_routes())
        .nest(
            "/courses",
            courses::courses_routes(app_state.clone()).route_layer(from_fn(allow_authenticated)),
        )
        .nest(
            "/batches",
            batches::batches_routes(app_state.clone()).route_layer(from_fn(allow_authenticated)),
        )
        .nest(
            "/enrollments",
            enrollments::enrollments_routes(app_state.clone())
                .route_layer(from_fn(allow_authenticated)),
        )
}
