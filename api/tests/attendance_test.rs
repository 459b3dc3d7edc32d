mod helpers;

use axum::http::StatusCode;
use serde_json::{Value, json};
use tower::ServiceExt;

use api::auth::generate_jwt;
use db::models::user::Model as UserModel;
use helpers::app::{auth_req, body_json, make_test_app};
use util::state::AppState;

struct TestCtx {
    admin_token: String,
    instructor_token: String,
    student_token: String,
    student_id: i64,
    batch_id: i64,
}

/// One Monday slot from 2026-03-02 through 2026-05-04: ten sessions.
async fn setup(app: &axum::Router, state: &AppState) -> TestCtx {
    let db = state.db();

    let admin = UserModel::create(db, "att_admin", "att_admin@test.com", true)
        .await
        .unwrap();
    let instructor = UserModel::create(db, "att_inst", "att_inst@test.com", false)
        .await
        .unwrap();
    let student = UserModel::create(db, "att_stud", "att_stud@test.com", false)
        .await
        .unwrap();

    let course = db::models::course::Model::create(db, "RUST220", "Error Handling", 45_000, None)
        .await
        .unwrap();

    let (admin_token, _) = generate_jwt(admin.id, true);
    let (instructor_token, _) = generate_jwt(instructor.id, false);
    let (student_token, _) = generate_jwt(student.id, false);

    let body = json!({
        "course_id": course.id,
        "instructor_id": instructor.id,
        "start_date": "2026-03-02",
        "end_date": "2026-05-04",
        "max_students": 10,
        "slots": [
            { "day_of_week": 0, "start_time": "09:00:00", "end_time": "11:00:00" }
        ]
    });
    let resp = app
        .clone()
        .oneshot(auth_req("POST", "/api/batches", &admin_token, Some(body)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let batch_id = body_json(resp).await["data"]["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(auth_req(
            "POST",
            &format!("/api/batches/{batch_id}/enroll"),
            &student_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    TestCtx {
        admin_token,
        instructor_token,
        student_token,
        student_id: student.id,
        batch_id,
    }
}

async fn materialize(app: &axum::Router, ctx: &TestCtx) -> Vec<Value> {
    let uri = format!("/api/batches/{}/sessions/materialize", ctx.batch_id);
    let resp = app
        .clone()
        .oneshot(auth_req("POST", &uri, &ctx.instructor_token, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["data"].as_array().unwrap().clone()
}

async fn sweep_all(app: &axum::Router, ctx: &TestCtx) {
    let uri = format!("/api/batches/{}/sessions/sweep", ctx.batch_id);
    let resp = app
        .clone()
        .oneshot(auth_req(
            "POST",
            &uri,
            &ctx.instructor_token,
            Some(json!({ "at": "2026-06-01T00:00:00Z" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_attendance_percentage_over_completed_sessions() {
    let (app, state) = make_test_app().await;
    let ctx = setup(&app, &state).await;
    let sessions = materialize(&app, &ctx).await;
    assert_eq!(sessions.len(), 10);

    // Student marks 5 present and 2 late; the other 3 go unmarked.
    for (i, session) in sessions.iter().enumerate().take(7) {
        let session_id = session["id"].as_i64().unwrap();
        let status = if i < 5 { "present" } else { "late" };
        let uri = format!(
            "/api/batches/{}/sessions/{session_id}/attendance",
            ctx.batch_id
        );
        let resp = app
            .clone()
            .oneshot(auth_req(
                "POST",
                &uri,
                &ctx.student_token,
                Some(json!({ "status": status })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // The sweep completes every session and back-fills absents.
    sweep_all(&app, &ctx).await;

    let uri = format!("/api/batches/{}/attendance/{}", ctx.batch_id, ctx.student_id);
    let resp = app
        .oneshot(auth_req("GET", &uri, &ctx.admin_token, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["percentage"], 70.0);
}

#[tokio::test]
async fn test_completed_session_requires_correction_privilege() {
    let (app, state) = make_test_app().await;
    let ctx = setup(&app, &state).await;
    let sessions = materialize(&app, &ctx).await;
    sweep_all(&app, &ctx).await;

    let session_id = sessions[0]["id"].as_i64().unwrap();
    let uri = format!(
        "/api/batches/{}/sessions/{session_id}/attendance",
        ctx.batch_id
    );

    // The student cannot rewrite history.
    let resp = app
        .clone()
        .oneshot(auth_req(
            "POST",
            &uri,
            &ctx.student_token,
            Some(json!({ "status": "present" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // The instructor can correct the back-filled absent.
    let resp = app
        .clone()
        .oneshot(auth_req(
            "POST",
            &uri,
            &ctx.instructor_token,
            Some(json!({ "status": "present", "student_id": ctx.student_id })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["data"]["status"], "present");
}

#[tokio::test]
async fn test_students_cannot_mark_each_other() {
    let (app, state) = make_test_app().await;
    let ctx = setup(&app, &state).await;
    let sessions = materialize(&app, &ctx).await;

    let other = UserModel::create(state.db(), "att_other", "att_other@test.com", false)
        .await
        .unwrap();
    let (other_token, _) = generate_jwt(other.id, false);

    let session_id = sessions[0]["id"].as_i64().unwrap();
    let uri = format!(
        "/api/batches/{}/sessions/{session_id}/attendance",
        ctx.batch_id
    );
    let resp = app
        .oneshot(auth_req(
            "POST",
            &uri,
            &other_token,
            Some(json!({ "status": "present", "student_id": ctx.student_id })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cancelled_sessions_take_no_attendance() {
    let (app, state) = make_test_app().await;
    let ctx = setup(&app, &state).await;
    let sessions = materialize(&app, &ctx).await;

    let session_id = sessions[0]["id"].as_i64().unwrap();
    let status_uri = format!(
        "/api/batches/{}/sessions/{session_id}/status",
        ctx.batch_id
    );
    let resp = app
        .clone()
        .oneshot(auth_req(
            "PUT",
            &status_uri,
            &ctx.instructor_token,
            Some(json!({ "status": "cancelled" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let att_uri = format!(
        "/api/batches/{}/sessions/{session_id}/attendance",
        ctx.batch_id
    );
    let resp = app
        .clone()
        .oneshot(auth_req(
            "POST",
            &att_uri,
            &ctx.student_token,
            Some(json!({ "status": "present" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Cancelled is terminal; it never reverts to scheduled.
    let resp = app
        .oneshot(auth_req(
            "PUT",
            &status_uri,
            &ctx.instructor_token,
            Some(json!({ "status": "scheduled" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_leave_before_join_is_rejected() {
    let (app, state) = make_test_app().await;
    let ctx = setup(&app, &state).await;
    let sessions = materialize(&app, &ctx).await;

    let session_id = sessions[0]["id"].as_i64().unwrap();
    let uri = format!(
        "/api/batches/{}/sessions/{session_id}/attendance",
        ctx.batch_id
    );
    let resp = app
        .oneshot(auth_req(
            "POST",
            &uri,
            &ctx.student_token,
            Some(json!({
                "status": "present",
                "join_at": "2026-03-02T09:05:00Z",
                "leave_at": "2026-03-02T09:00:00Z"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
