use api::routes::routes;
use axum::{Router, body::Body, http::Request};
use serde_json::Value;
use util::state::AppState;

fn ensure_test_env() {
    // SAFETY: called before any request handling; the test process has not
    // spawned threads that read the environment yet.
    unsafe {
        if std::env::var("JWT_SECRET").is_err() {
            std::env::set_var("JWT_SECRET", "test-secret");
        }
        if std::env::var("JWT_DURATION_MINUTES").is_err() {
            std::env::set_var("JWT_DURATION_MINUTES", "60");
        }
        if std::env::var("DATABASE_PATH").is_err() {
            std::env::set_var("DATABASE_PATH", ":memory:");
        }
    }
}

/// Builds the real application router over a fresh in-memory database.
pub async fn make_test_app() -> (Router, AppState) {
    ensure_test_env();

    let db = db::test_utils::setup_test_db().await;
    let app_state = AppState::new(db);

    let app = Router::new()
        .nest("/api", routes(app_state.clone()))
        .with_state(app_state.clone());

    (app, app_state)
}

/// Request builder for authenticated JSON calls.
pub fn auth_req(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json");

    match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Reads a response body back into JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
