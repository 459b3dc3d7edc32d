use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use util::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use get::{attendance_percentage, get_batch, list_sessions, upcoming_count};
pub use post::{
    create_batch, enroll, materialize_sessions, record_attendance, sweep_sessions, withdraw,
};
pub use put::set_session_status;

use crate::auth::guards::{allow_admin, require_instructor_or_admin};

pub fn batches_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_batch).route_layer(from_fn(allow_admin)))
        .route("/{batch_id}", get(get_batch))
        .route("/{batch_id}/enroll", post(enroll))
        .route("/{batch_id}/withdraw", post(withdraw))
        .route(
            "/{batch_id}/sessions/materialize",
            post(materialize_sessions).route_layer(from_fn_with_state(
                app_state.clone(),
                require_instructor_or_admin,
            )),
        )
        .route("/{batch_id}/sessions", get(list_sessions))
        .route("/{batch_id}/sessions/upcoming-count", get(upcoming_count))
        .route(
            "/{batch_id}/sessions/sweep",
            post(sweep_sessions).route_layer(from_fn_with_state(
                app_state.clone(),
                require_instructor_or_admin,
            )),
        )
        .route(
            "/{batch_id}/sessions/{session_id}/status",
            put(set_session_status).route_layer(from_fn_with_state(
                app_state.clone(),
                require_instructor_or_admin,
            )),
        )
        .route(
            "/{batch_id}/sessions/{session_id}/attendance",
            post(record_attendance),
        )
        .route(
            "/{batch_id}/attendance/{student_id}",
            get(attendance_percentage),
        )
        .with_state(app_state)
}
