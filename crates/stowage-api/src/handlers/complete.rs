//! Complete handler: records part entity tags, finalizes the provider-side
//! multipart upload, and settles session and group lifecycle state.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use stowage_core::models::{CompleteUploadRequest, CompleteUploadResponse, PartStatus, SessionStatus};
use stowage_core::AppError;
use stowage_storage::PartEtag;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::common::{dispatch_completed, finish_group_accounting};
use crate::state::AppState;

/// Finalize a chunked upload.
///
/// Parts may arrive in the request in any order; the provider always receives
/// them sorted ascending by part number. Calling complete again for an
/// already-uploaded session is a no-op success.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/{session_id}/complete",
    tag = "uploads",
    params(
        ("session_id" = Uuid, Path, description = "Upload session ID")
    ),
    request_body = CompleteUploadRequest,
    responses(
        (status = 200, description = "Upload completed", body = CompleteUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session is not multipart", body = ErrorResponse),
        (status = 502, description = "Storage provider unavailable", body = ErrorResponse)
    )
)]
pub async fn complete_multipart_upload(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CompleteUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

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
        // Duplicate completion signal. Settle any group accounting a crashed
        // earlier call may have left behind, then succeed without touching
        // the provider again.
        finish_group_accounting(&state, session_id).await?;
        return Ok(Json(CompleteUploadResponse { success: true }));
    }

    if matches!(
        session.status,
        SessionStatus::Failed | SessionStatus::Deleted
    ) {
        return Err(AppError::BadRequest(format!(
            "Session {} can no longer be completed",
            session_id
        ))
        .into());
    }

    let total_parts = session.total_parts.unwrap_or(0);

    // Record each reported part's entity tag.
    let mut newly_uploaded = 0i64;
    for part in &request.parts {
        if part.part_number < 1 || part.part_number > total_parts {
            return Err(AppError::InvalidInput(format!(
                "Part number {} out of range 1..={}",
                part.part_number, total_parts
            ))
            .into());
        }

        if state
            .db
            .part_repository
            .record_uploaded(session_id, part.part_number, &part.etag)
            .await?
        {
            newly_uploaded += 1;
        }
    }
    state
        .db
        .session_repository
        .add_completed_parts(session_id, newly_uploaded)
        .await?;

    // Assemble the provider submission from the store, which returns parts
    // ordered by part number regardless of the request's arrival order.
    let parts = state.db.part_repository.get_parts(session_id).await?;
    let mut etags = Vec::with_capacity(parts.len());
    for part in &parts {
        match (part.status, &part.etag) {
            (PartStatus::Uploaded, Some(etag)) => etags.push(PartEtag {
                part_number: part.part_number,
                etag: etag.clone(),
            }),
            _ => {
                return Err(AppError::InvalidInput(format!(
                    "Not all parts uploaded: part {} has no entity tag",
                    part.part_number
                ))
                .into())
            }
        }
    }

    state
        .gateway
        .complete_multipart(&session.object_key, &upload_id, &etags)
        .await?;

    // Only the winner of the terminal transition dispatches downstream work;
    // a concurrent storage event may have beaten us to it.
    if let Some(updated) = state
        .db
        .session_repository
        .try_mark_uploaded(session_id)
        .await?
    {
        state.broadcaster.publish_session(&updated).await;
        dispatch_completed(&state, &updated).await;
    }

    finish_group_accounting(&state, session_id).await?;

    tracing::info!(
        session_id = %session_id,
        parts = etags.len(),
        "Multipart upload completed"
    );

    Ok(Json(CompleteUploadResponse { success: true }))
}
