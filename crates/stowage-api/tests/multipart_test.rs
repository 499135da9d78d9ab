//! Chunked-upload lifecycle tests: part URLs, completion ordering,
//! idempotency, group accounting, and abort semantics.

mod helpers;

use axum::http::StatusCode;
use helpers::{setup_test_app, TestApp, MB};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use uuid::Uuid;

/// Initiate one chunked session (100 MB -> 2 parts) and return (session_id, group_id?).
async fn initiate_chunked(app: &TestApp, group_name: Option<&str>) -> (Uuid, Option<Uuid>) {
    let mut request = json!({
        "files": [{"name": "big.mov", "type": "video/quicktime", "size": 100 * MB}]
    });
    if let Some(name) = group_name {
        request["group_name"] = json!(name);
    }

    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&request)
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["sessions"][0]["strategy"], "chunked");

    let session_id = body["sessions"][0]["session_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    let group_id = body
        .get("group_id")
        .and_then(|v| v.as_str())
        .map(|s| s.parse().unwrap());
    (session_id, group_id)
}

async fn complete(app: &TestApp, session_id: Uuid, parts: Value) -> axum_test::TestResponse {
    app.client()
        .post(&format!("/api/v0/uploads/{}/complete", session_id))
        .json(&json!({ "parts": parts }))
        .await
}

async fn session_status(app: &TestApp, session_id: Uuid) -> String {
    sqlx::query_scalar("SELECT status::text FROM upload_sessions WHERE id = $1")
        .bind(session_id)
        .fetch_one(app.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_part_urls_issue_in_any_order_and_are_idempotent() {
    let app = setup_test_app().await;
    let (session_id, _) = initiate_chunked(&app, None).await;

    // Out of order, with a repeat.
    for part_number in [2, 1, 2] {
        let response = app
            .client()
            .post(&format!(
                "/api/v0/uploads/{}/parts/{}/url",
                session_id, part_number
            ))
            .json(&json!({}))
            .await;
        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert!(body["url"]
            .as_str()
            .unwrap()
            .contains(&format!("partNumber={}", part_number)));
    }

    // Still exactly two part rows; the repeat reissued a URL, nothing more.
    let part_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM upload_parts WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(part_count, 2);

    assert_eq!(session_status(&app, session_id).await, "uploading");
}

#[tokio::test]
async fn test_part_url_out_of_range_rejected() {
    let app = setup_test_app().await;
    let (session_id, _) = initiate_chunked(&app, None).await;

    let response = app
        .client()
        .post(&format!("/api/v0/uploads/{}/parts/3/url", session_id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_part_url_on_direct_session_is_wrong_strategy() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&json!({
            "files": [{"name": "a.txt", "type": "text/plain", "size": 1024}]
        }))
        .await;
    let body: Value = response.json();
    let session_id = body["sessions"][0]["session_id"].as_str().unwrap();

    let response = app
        .client()
        .post(&format!("/api/v0/uploads/{}/parts/1/url", session_id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_MULTIPART");
}

#[tokio::test]
async fn test_complete_submits_parts_sorted_regardless_of_arrival_order() {
    let app = setup_test_app().await;
    let (session_id, _) = initiate_chunked(&app, None).await;

    // Parts reported out of order.
    let response = complete(
        &app,
        session_id,
        json!([
            {"part_number": 2, "etag": "e2"},
            {"part_number": 1, "etag": "e1"}
        ]),
    )
    .await;
    response.assert_status(StatusCode::OK);

    let calls = app.gateway.completed_calls();
    assert_eq!(calls.len(), 1);
    let submitted: Vec<(i32, &str)> = calls[0]
        .parts
        .iter()
        .map(|p| (p.part_number, p.etag.as_str()))
        .collect();
    assert_eq!(submitted, vec![(1, "e1"), (2, "e2")]);

    assert_eq!(session_status(&app, session_id).await, "uploaded");

    // Terminal success dispatches downstream processing exactly once.
    assert_eq!(app.dispatcher.dispatched().len(), 1);
}

#[tokio::test]
async fn test_complete_with_missing_parts_rejected() {
    let app = setup_test_app().await;
    let (session_id, _) = initiate_chunked(&app, None).await;

    let response = complete(&app, session_id, json!([{"part_number": 1, "etag": "e1"}])).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Nothing was finalized.
    assert!(app.gateway.completed_calls().is_empty());
    assert_eq!(session_status(&app, session_id).await, "pending_upload");
}

#[tokio::test]
async fn test_double_complete_is_noop_success_with_single_count_and_dispatch() {
    let app = setup_test_app().await;
    let (session_id, group_id) = initiate_chunked(&app, Some("Batch")).await;
    let group_id = group_id.unwrap();

    let parts = json!([
        {"part_number": 1, "etag": "e1"},
        {"part_number": 2, "etag": "e2"}
    ]);

    let first = complete(&app, session_id, parts.clone()).await;
    first.assert_status(StatusCode::OK);
    let second = complete(&app, session_id, parts).await;
    second.assert_status(StatusCode::OK);
    let body: Value = second.json();
    assert_eq!(body["success"], true);

    // Provider finalization ran once; the repeat never reached the gateway.
    assert_eq!(app.gateway.completed_calls().len(), 1);
    assert_eq!(app.dispatcher.dispatched().len(), 1);

    let (completed_files, status): (i32, String) = sqlx::query_as(
        "SELECT completed_files, status::text FROM upload_groups WHERE id = $1",
    )
    .bind(group_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(completed_files, 1);
    assert_eq!(status, "completed");
}

#[tokio::test]
async fn test_group_completes_only_when_all_sessions_complete() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&json!({
            "files": [
                {"name": "one.mov", "type": "video/quicktime", "size": 100 * MB},
                {"name": "two.mov", "type": "video/quicktime", "size": 100 * MB}
            ]
        }))
        .await;
    let body: Value = response.json();
    let group_id: Uuid = body["group_id"].as_str().unwrap().parse().unwrap();
    let ids: Vec<Uuid> = body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["session_id"].as_str().unwrap().parse().unwrap())
        .collect();

    let parts = json!([
        {"part_number": 1, "etag": "e1"},
        {"part_number": 2, "etag": "e2"}
    ]);

    complete(&app, ids[0], parts.clone()).await.assert_status(StatusCode::OK);

    let (completed_files, status): (i32, String) = sqlx::query_as(
        "SELECT completed_files, status::text FROM upload_groups WHERE id = $1",
    )
    .bind(group_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(completed_files, 1);
    assert_eq!(status, "in_progress");

    complete(&app, ids[1], parts).await.assert_status(StatusCode::OK);

    let (completed_files, status): (i32, String) = sqlx::query_as(
        "SELECT completed_files, status::text FROM upload_groups WHERE id = $1",
    )
    .bind(group_id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(completed_files, 2);
    assert_eq!(status, "completed");
}

#[tokio::test]
async fn test_abort_fails_session_and_pending_parts() {
    let app = setup_test_app().await;
    let (session_id, _) = initiate_chunked(&app, None).await;

    let response = app
        .client()
        .post(&format!("/api/v0/uploads/{}/abort", session_id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::OK);

    assert_eq!(session_status(&app, session_id).await, "failed");
    assert_eq!(app.gateway.aborted_calls().len(), 1);

    let part_statuses: Vec<String> = sqlx::query_scalar(
        "SELECT status::text FROM upload_parts WHERE session_id = $1 ORDER BY part_number",
    )
    .bind(session_id)
    .fetch_all(app.pool())
    .await
    .unwrap();
    assert_eq!(part_statuses, vec!["failed", "failed"]);

    // Aborting again is a no-op success.
    let response = app
        .client()
        .post(&format!("/api/v0/uploads/{}/abort", session_id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(app.gateway.aborted_calls().len(), 1);
}

#[tokio::test]
async fn test_abort_is_locally_authoritative_when_provider_fails() {
    let app = setup_test_app().await;
    let (session_id, _) = initiate_chunked(&app, None).await;

    app.gateway.fail_abort.store(true, Ordering::SeqCst);

    let response = app
        .client()
        .post(&format!("/api/v0/uploads/{}/abort", session_id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::OK);

    // The remote abort failed, the local session must not stay stuck.
    assert_eq!(session_status(&app, session_id).await, "failed");
}

#[tokio::test]
async fn test_abort_after_complete_is_rejected() {
    let app = setup_test_app().await;
    let (session_id, _) = initiate_chunked(&app, None).await;

    complete(
        &app,
        session_id,
        json!([
            {"part_number": 1, "etag": "e1"},
            {"part_number": 2, "etag": "e2"}
        ]),
    )
    .await
    .assert_status(StatusCode::OK);

    let response = app
        .client()
        .post(&format!("/api/v0/uploads/{}/abort", session_id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(session_status(&app, session_id).await, "uploaded");
}

#[tokio::test]
async fn test_complete_on_unknown_session_is_not_found() {
    let app = setup_test_app().await;

    let response = complete(
        &app,
        Uuid::new_v4(),
        json!([{"part_number": 1, "etag": "e1"}]),
    )
    .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
