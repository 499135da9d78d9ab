//! Abort handler: compensating action for an in-flight chunked upload.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use stowage_core::models::{AbortUploadResponse, SessionStatus};
use stowage_core::AppError;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Abort a chunked upload.
///
/// Best-effort against the provider: a failed remote abort still marks the
/// local session failed, because local state is authoritative and sessions
/// must never stay "uploading" forever. Abort does not roll back group
/// counters; it only applies to sessions that have not completed.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/{session_id}/abort",
    tag = "uploads",
    params(
        ("session_id" = Uuid, Path, description = "Upload session ID")
    ),
    responses(
        (status = 200, description = "Upload aborted", body = AbortUploadResponse),
        (status = 400, description = "Session already completed", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session is not multipart", body = ErrorResponse)
    )
)]
pub async fn abort_multipart_upload(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
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

    if session.status.is_success() {
        return Err(AppError::BadRequest(format!(
            "Session {} already completed; abort does not roll back completed uploads",
            session_id
        ))
        .into());
    }

    if matches!(
        session.status,
        SessionStatus::Failed | SessionStatus::Deleted
    ) {
        return Ok(Json(AbortUploadResponse { success: true }));
    }

    if let Err(e) = state
        .gateway
        .abort_multipart(&session.object_key, &upload_id)
        .await
    {
        tracing::warn!(
            error = %e,
            session_id = %session_id,
            "Remote multipart abort failed; marking session failed locally"
        );
    }

    state
        .db
        .session_repository
        .mark_failed(session_id, Some("aborted by caller".to_string()))
        .await?;

    // Uploaded parts keep their status as historical record.
    state
        .db
        .part_repository
        .fail_pending_parts(session_id)
        .await?;

    if let Some(updated) = state.db.session_repository.get_session(session_id).await? {
        state.broadcaster.publish_session(&updated).await;
    }

    tracing::info!(session_id = %session_id, "Multipart upload aborted");

    Ok(Json(AbortUploadResponse { success: true }))
}
