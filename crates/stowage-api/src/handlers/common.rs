//! Shared lifecycle plumbing for controller and webhook handlers.

use std::sync::Arc;

use chrono::Utc;
use stowage_core::models::{CompletedFileJob, UploadSession};
use stowage_core::AppError;
use uuid::Uuid;

use crate::state::AppState;

/// Settle group accounting for a session that reached `uploaded`.
///
/// The session-side `group_counted` claim guarantees at most one caller ever
/// increments the group for a given session, no matter how many times
/// completion signals are delivered or which path (complete vs. webhook)
/// observed them.
pub(crate) async fn finish_group_accounting(
    state: &Arc<AppState>,
    session_id: Uuid,
) -> Result<(), AppError> {
    let Some(group_id) = state
        .db
        .session_repository
        .try_count_in_group(session_id)
        .await?
    else {
        return Ok(());
    };

    if let Some(group) = state
        .db
        .group_repository
        .record_file_completed(group_id)
        .await?
    {
        tracing::info!(
            group_id = %group.id,
            completed_files = group.completed_files,
            total_files = group.total_files,
            "Counted completed file in group"
        );
        state.broadcaster.publish_group(&group).await;
    }

    Ok(())
}

/// Hand a durably uploaded session to the downstream processing queue.
/// Callers invoke this only after winning the session's terminal transition,
/// which bounds dispatch to once per session.
pub(crate) async fn dispatch_completed(state: &Arc<AppState>, session: &UploadSession) {
    let job = CompletedFileJob {
        session_id: session.id,
        group_id: session.group_id,
        object_key: session.object_key.clone(),
        file_name: session.file_name.clone(),
        content_type: session.content_type.clone(),
        file_size: session.file_size,
        uploaded_at: session.uploaded_at.unwrap_or_else(Utc::now),
    };

    // Dispatch failures are logged, not surfaced: the upload itself succeeded
    // and local state stays authoritative.
    if let Err(e) = state.dispatcher.enqueue(&job).await {
        tracing::error!(
            error = %e,
            session_id = %session.id,
            "Failed to enqueue downstream processing job"
        );
    }
}
