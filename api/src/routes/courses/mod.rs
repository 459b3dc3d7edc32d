use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use util::state::AppState;

mod common;
mod get;
mod post;

pub use get::{get_course, get_price};
pub use post::{create_course, create_subject};

use crate::auth::guards::allow_admin;

pub fn courses_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_course).route_layer(from_fn(allow_admin)))
        .route("/{course_id}", get(get_course))
        .route("/{course_id}/price", get(get_price))
        .route(
            "/{course_id}/subjects",
            post(create_subject).route_layer(from_fn(allow_admin)),
        )
        .with_state(app_state)
}
