//! Initiate-path integration tests: strategy selection, grouping, and
//! partial-failure semantics.

mod helpers;

use axum::http::StatusCode;
use helpers::{setup_test_app, MB};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use uuid::Uuid;

#[tokio::test]
async fn test_single_small_file_gets_direct_strategy_and_no_group() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&json!({
            "files": [{"name": "a.txt", "type": "text/plain", "size": 1024}]
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();

    assert_eq!(body["success"], true);
    assert!(body.get("group_id").is_none());
    assert_eq!(body["sessions"].as_array().unwrap().len(), 1);

    let session = &body["sessions"][0];
    assert_eq!(session["strategy"], "direct");
    assert_eq!(session["file_name"], "a.txt");
    assert!(session["url"]
        .as_str()
        .unwrap()
        .starts_with("https://mock-storage.local/uploads/"));
    assert_eq!(session["headers"]["content-type"], "text/plain");

    // Exactly one session row, pending, no group reference.
    let (status, group_id): (String, Option<Uuid>) = sqlx::query_as(
        "SELECT status::text, group_id FROM upload_sessions WHERE id = $1",
    )
    .bind(session["session_id"].as_str().unwrap().parse::<Uuid>().unwrap())
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(status, "pending_upload");
    assert!(group_id.is_none());

    // Bucket and notification subscription were provisioned.
    assert!(app.gateway.bucket_ensured.load(Ordering::SeqCst));
    assert!(app.gateway.notification_ensured.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_large_file_with_group_name_gets_chunked_strategy() {
    let app = setup_test_app().await;

    // 200 MB at a 50 MB chunk size: four equal parts.
    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&json!({
            "files": [{"name": "v.mp4", "type": "video/mp4", "size": 209715200u64}],
            "group_name": "Upload X"
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();

    assert_eq!(body["success"], true);
    let group_id: Uuid = body["group_id"].as_str().unwrap().parse().unwrap();

    let session = &body["sessions"][0];
    assert_eq!(session["strategy"], "chunked");
    assert_eq!(session["total_parts"], 4);
    assert_eq!(session["part_size"], 50 * MB);
    assert!(session["upload_id"].as_str().unwrap().starts_with("mock-upload-"));

    let (name, total_files): (String, i32) =
        sqlx::query_as("SELECT name, total_files FROM upload_groups WHERE id = $1")
            .bind(group_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(name, "Upload X");
    assert_eq!(total_files, 1);

    // Part rows 1..=4 exist before any part upload, all chunk-sized.
    let session_id: Uuid = session["session_id"].as_str().unwrap().parse().unwrap();
    let sizes: Vec<(i32, i64)> = sqlx::query_as(
        "SELECT part_number, size FROM upload_parts WHERE session_id = $1 ORDER BY part_number",
    )
    .bind(session_id)
    .fetch_all(app.pool())
    .await
    .unwrap();
    assert_eq!(
        sizes,
        vec![
            (1, (50 * MB) as i64),
            (2, (50 * MB) as i64),
            (3, (50 * MB) as i64),
            (4, (50 * MB) as i64)
        ]
    );
}

#[tokio::test]
async fn test_remainder_sizing_on_last_part() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&json!({
            "files": [{"name": "v.mkv", "type": "video/x-matroska", "size": 120 * MB}]
        }))
        .await;

    let body: Value = response.json();
    let session_id: Uuid = body["sessions"][0]["session_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    let sizes: Vec<i64> = sqlx::query_scalar(
        "SELECT size FROM upload_parts WHERE session_id = $1 ORDER BY part_number",
    )
    .bind(session_id)
    .fetch_all(app.pool())
    .await
    .unwrap();
    assert_eq!(sizes, vec![(50 * MB) as i64, (50 * MB) as i64, (20 * MB) as i64]);
}

#[tokio::test]
async fn test_one_rejected_file_does_not_block_siblings() {
    let app = setup_test_app().await;

    // Middle file exceeds the 1 GiB test limit; its siblings must still go through.
    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&json!({
            "files": [
                {"name": "ok-1.txt", "type": "text/plain", "size": 1024},
                {"name": "too-big.iso", "type": "application/octet-stream", "size": 4096 * MB},
                {"name": "ok-2.txt", "type": "text/plain", "size": 2048}
            ]
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();

    assert_eq!(body["success"], true);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 2);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["errors"][0]["file_name"], "too-big.iso");

    // Group is still created for the full submitted count.
    let group_id: Uuid = body["group_id"].as_str().unwrap().parse().unwrap();
    let total_files: i32 =
        sqlx::query_scalar("SELECT total_files FROM upload_groups WHERE id = $1")
            .bind(group_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(total_files, 3);

    // Rejection is side-effect free: no session row for the rejected file.
    let session_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM upload_sessions WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(app.pool())
            .await
            .unwrap();
    assert_eq!(session_count, 2);
}

#[tokio::test]
async fn test_all_files_rejected_reports_failure_without_sessions() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&json!({
            "files": [{"name": "empty.txt", "type": "text/plain", "size": 0}]
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();

    assert_eq!(body["success"], false);
    assert!(body["sessions"].as_array().unwrap().is_empty());
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    let session_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_sessions")
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(session_count, 0);
}

#[tokio::test]
async fn test_empty_file_list_is_invalid() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/v0/uploads/initiate")
        .json(&json!({ "files": [] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
