use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use db::models::class_session;
use util::state::AppState;

use super::common::{SessionResponse, SessionStatusReq};
use crate::response::ApiResponse;
use crate::routes::common::{db_error_status, session_error_status};

/// PUT /api/batches/{batch_id}/sessions/{session_id}/status
///
/// Explicit status change (typically cancellation) and meeting/recording
/// link updates for one session. Completed and cancelled sessions never
/// revert.
pub async fn set_session_status(
    State(state): State<AppState>,
    Path((batch_id, session_id)): Path<(i64, i64)>,
    Json(body): Json<SessionStatusReq>,
) -> (StatusCode, Json<ApiResponse<SessionResponse>>) {
    let db = state.db();

    let session = match class_session::Model::get_by_id(db, session_id).await {
        Ok(Some(session)) if session.batch_id == batch_id => session,
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Class session not found")),
            );
        }
        Err(e) => {
            return (
                db_error_status(&e),
                Json(ApiResponse::error("Failed to fetch session")),
            );
        }
    };

    let mut updated = session;

    if body.meeting_url.is_some() || body.recording_url.is_some() {
        updated = match class_session::Model::set_links(
            db,
            session_id,
            body.meeting_url.clone(),
            body.recording_url.clone(),
        )
        .await
        {
            Ok(updated) => updated,
            Err(e) => {
                return (
                    session_error_status(&e),
                    Json(ApiResponse::error(format!("Failed to update links: {e}"))),
                );
            }
        };
    }

    if let Some(status) = body.status {
        updated = match class_session::Model::set_status(db, session_id, status).await {
            Ok(updated) => updated,
            Err(e) => {
                return (
                    session_error_status(&e),
                    Json(ApiResponse::error(format!(
                        "Failed to change session status: {e}"
                    ))),
                );
            }
        };
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(updated.into(), "Session updated")),
    )
}
