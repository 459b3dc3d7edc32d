use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use util::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use get::{get_enrollment, get_progress};
pub use post::complete_subject;
pub use put::change_status;

use crate::auth::guards::require_staff;

pub fn enrollments_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/{enrollment_id}", get(get_enrollment))
        .route("/{enrollment_id}/progress", get(get_progress))
        .route(
            "/{enrollment_id}/status",
            put(change_status)
                .route_layer(from_fn_with_state(app_state.clone(), require_staff)),
        )
        .route(
            "/{enrollment_id}/subjects/{subject_id}/complete",
            post(complete_subject)
                .route_layer(from_fn_with_state(app_state.clone(), require_staff)),
        )
        .with_state(app_state)
}
