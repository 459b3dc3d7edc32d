use crate::auth::claims::AuthUser;
use crate::response::ApiResponse;
use axum::{
    Json,
    body::Body,
    extract::{FromRequestParts, RawPathParams, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::batch;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use util::state::AppState;

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract and validate the user from request extensions and insert
/// them back into the request.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, _user) = extract_and_insert_authuser(req).await?;

    Ok(next.run(req).await)
}

/// Admin-only guard.
pub async fn allow_admin(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if !user.0.admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        ));
    }

    Ok(next.run(req).await)
}

/// Guard for batch-scoped writes (schedule edits, session status, attendance
/// correction): the caller must be an admin or the batch's instructor.
///
/// Denies on any lookup failure rather than letting the request through.
pub async fn require_instructor_or_admin(
    State(state): State<AppState>,
    params: RawPathParams,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if user.0.admin {
        return Ok(next.run(req).await);
    }

    let batch_id = params
        .iter()
        .find(|(name, _)| *name == "batch_id")
        .and_then(|(_, value)| value.parse::<i64>().ok());

    let Some(batch_id) = batch_id else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invalid batch id")),
        ));
    };

    match batch::Model::get_by_id(state.db(), batch_id).await {
        Ok(Some(found)) if found.instructor_id == user.0.sub => Ok(next.run(req).await),
        Ok(_) => Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Instructor or admin access required")),
        )),
        Err(e) => {
            tracing::warn!(error = %e, batch_id, "DB error while checking instructor; denying access");
            Err((
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error("Instructor or admin access required")),
            ))
        }
    }
}

/// Guard for enrollment writes: admins and instructors (anyone who teaches at
/// least one batch) may change enrollment status and completed subjects.
pub async fn require_staff(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if user.0.admin {
        return Ok(next.run(req).await);
    }

    let teaches = batch::Entity::find()
        .filter(batch::Column::InstructorId.eq(user.0.sub))
        .count(state.db())
        .await;

    match teaches {
        Ok(n) if n > 0 => Ok(next.run(req).await),
        Ok(_) => Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Instructor or admin access required")),
        )),
        Err(e) => {
            tracing::warn!(error = %e, user_id = user.0.sub, "DB error while checking staff role; denying access");
            Err((
                StatusCode::FORBIDDEN,
                Json(ApiResponse::error("Instructor or admin access required")),
            ))
        }
    }
}
