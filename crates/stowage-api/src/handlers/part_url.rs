//! Part URL handler: presigns a single-part PUT for an in-flight multipart
//! session. Parts may be requested in any order and with any concurrency.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use stowage_core::models::PartUrlResponse;
use stowage_core::AppError;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Issue a presigned upload URL for one part of a chunked session.
///
/// Idempotent: asking again for the same part simply reissues a URL; no
/// duplicate part rows are ever created.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/{session_id}/parts/{part_number}/url",
    tag = "uploads",
    params(
        ("session_id" = Uuid, Path, description = "Upload session ID"),
        ("part_number" = i32, Path, description = "Part number (1-based)")
    ),
    responses(
        (status = 200, description = "Presigned part URL", body = PartUrlResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session is not multipart", body = ErrorResponse),
        (status = 502, description = "Storage provider unavailable", body = ErrorResponse)
    )
)]
pub async fn generate_part_upload_url(
    State(state): State<Arc<AppState>>,
    Path((session_id, part_number)): Path<(Uuid, i32)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let session = state
        .db
        .session_repository
        .get_session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Upload session not found: {}", session_id)))?;

    let upload_id = session.multipart_upload_id.clone().ok_or_else(|| {
        AppError::NotMultipart(format!(
            "Session {} was created for direct upload",
            session_id
        ))
    })?;

    let total_parts = session.total_parts.unwrap_or(0);
    if part_number < 1 || part_number > total_parts {
        return Err(AppError::InvalidInput(format!(
            "Part number {} out of range 1..={}",
            part_number, total_parts
        ))
        .into());
    }

    if session.status.is_upload_terminal() {
        return Err(AppError::BadRequest(format!(
            "Session {} is no longer accepting part uploads",
            session_id
        ))
        .into());
    }

    let url = state
        .gateway
        .presign_part(
            &session.object_key,
            &upload_id,
            part_number,
            state.config.presign_expiry(),
        )
        .await?;

    state
        .db
        .part_repository
        .mark_uploading(session_id, part_number)
        .await?;

    // First part URL moves the session (and its group) out of pending.
    if state
        .db
        .session_repository
        .mark_uploading(session_id)
        .await?
    {
        if let Some(updated) = state.db.session_repository.get_session(session_id).await? {
            state.broadcaster.publish_session(&updated).await;
        }

        if let Some(group_id) = session.group_id {
            if state.db.group_repository.mark_in_progress(group_id).await? {
                if let Some(group) = state.db.group_repository.get_group(group_id).await? {
                    state.broadcaster.publish_group(&group).await;
                }
            }
        }
    }

    tracing::debug!(
        session_id = %session_id,
        part_number = part_number,
        "Issued part upload URL"
    );

    Ok(Json(PartUrlResponse { success: true, url }))
}
