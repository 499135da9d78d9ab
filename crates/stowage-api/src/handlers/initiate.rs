//! Initiate handler: admits declared files, creates groups and sessions, and
//! returns direct-to-storage upload credentials.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use stowage_core::models::{
    FileDescriptor, InitiateUploadRequest, InitiateUploadResponse, RejectedFile,
    SessionCredentials, StrategyKind, UploadCredentials,
};
use stowage_core::{AppError, ErrorMetadata, PolicyDecision, StrategyPlan};
use stowage_storage::{NotificationTarget, StorageError};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Initiate direct-to-storage uploads for one or more files.
///
/// Policy rejection of one file never blocks its siblings: the response
/// carries credentials for every admitted file plus per-file errors for the
/// rest. A group is created when more than one file is submitted or a group
/// name is supplied, with total_files fixed to the submitted count.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/initiate",
    tag = "uploads",
    request_body = InitiateUploadRequest,
    responses(
        (status = 200, description = "Upload sessions created", body = InitiateUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "Storage provider unavailable", body = ErrorResponse)
    )
)]
pub async fn initiate_upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InitiateUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    ensure_provisioned(&state).await?;

    let group = if request.files.len() > 1 || request.group_name.is_some() {
        let name = request
            .group_name
            .clone()
            .unwrap_or_else(|| format!("Upload {}", Utc::now().format("%Y-%m-%d %H:%M:%S")));
        let group = state
            .db
            .group_repository
            .create_group(
                Uuid::new_v4(),
                name,
                None,
                request.caller_id,
                request.files.len() as i32,
            )
            .await?;
        Some(group)
    } else {
        None
    };

    let group_id = group.as_ref().map(|g| g.id);
    let mut sessions = Vec::new();
    let mut errors = Vec::new();

    for file in &request.files {
        match prepare_session(&state, group_id, request.caller_id, file).await {
            Ok(credentials) => sessions.push(credentials),
            Err(err) => {
                tracing::debug!(
                    file_name = %file.name,
                    error = %err,
                    "File rejected during initiate"
                );
                errors.push(RejectedFile {
                    file_name: file.name.clone(),
                    reason: err.client_message(),
                });
            }
        }
    }

    if let Some(ref g) = group {
        state.broadcaster.publish_group(g).await;
    }

    tracing::info!(
        group_id = ?group_id,
        accepted = sessions.len(),
        rejected = errors.len(),
        "Initiated upload sessions"
    );

    Ok(Json(InitiateUploadResponse {
        success: !sessions.is_empty(),
        group_id,
        sessions,
        errors,
    }))
}

/// Provision the bucket and its event subscription once per process,
/// create-if-absent. A failed attempt leaves the cell empty so the next
/// initiate retries.
async fn ensure_provisioned(state: &Arc<AppState>) -> Result<(), HttpAppError> {
    let gateway = state.gateway.clone();
    let target = NotificationTarget {
        queue_arn: state.config.notification_queue_arn.clone(),
        endpoint: state.config.webhook_endpoint.clone(),
        event_types: vec![
            "s3:ObjectCreated:*".to_string(),
            "s3:ObjectRemoved:*".to_string(),
        ],
        prefix: Some(format!("{}/", state.config.upload_prefix)),
    };

    state
        .provisioned
        .get_or_try_init(|| async {
            gateway.ensure_bucket().await?;
            gateway.ensure_notification(&target).await?;
            Ok::<(), StorageError>(())
        })
        .await
        .map_err(HttpAppError::from)?;

    Ok(())
}

/// Run the policy and, when admitted, create the session and its upload
/// credentials. Rejections and per-file provider failures surface as errors;
/// nothing is persisted for a file that never passed policy.
async fn prepare_session(
    state: &Arc<AppState>,
    group_id: Option<Uuid>,
    owner_id: Option<Uuid>,
    file: &FileDescriptor,
) -> Result<SessionCredentials, AppError> {
    let plan = match state.policy.resolve(&file.name, &file.content_type, file.size) {
        PolicyDecision::Rejected { reason } => return Err(AppError::InvalidInput(reason)),
        PolicyDecision::Accepted(plan) => plan,
    };

    let session_id = Uuid::new_v4();
    let object_key = build_object_key(&state.config.upload_prefix, session_id, &file.name);

    match plan {
        StrategyPlan::Direct => {
            let presigned = state
                .gateway
                .presign_upload(
                    &object_key,
                    &file.content_type,
                    file.size,
                    state.config.presign_expiry(),
                )
                .await
                .map_err(|e| AppError::provider(e.operation(), e))?;

            let session = state
                .db
                .session_repository
                .create_session(
                    session_id,
                    group_id,
                    owner_id,
                    file.name.clone(),
                    file.content_type.clone(),
                    file.size as i64,
                    object_key.clone(),
                    StrategyKind::Direct,
                    None,
                    None,
                )
                .await?;

            state.broadcaster.publish_session(&session).await;

            Ok(SessionCredentials {
                session_id,
                file_name: file.name.clone(),
                object_key,
                credentials: UploadCredentials::Direct {
                    url: presigned.url,
                    headers: presigned.headers,
                },
            })
        }
        StrategyPlan::Chunked {
            part_count,
            part_size,
            ..
        } => {
            let upload_id = state
                .gateway
                .initiate_multipart(&object_key, &file.content_type)
                .await
                .map_err(|e| AppError::provider(e.operation(), e))?;

            let session = state
                .db
                .session_repository
                .create_session(
                    session_id,
                    group_id,
                    owner_id,
                    file.name.clone(),
                    file.content_type.clone(),
                    file.size as i64,
                    object_key.clone(),
                    StrategyKind::Chunked,
                    Some(upload_id.clone()),
                    Some(part_count),
                )
                .await?;

            // Part rows 1..=N exist before any part upload begins.
            let sizes = state.policy.part_sizes(file.size);
            state
                .db
                .part_repository
                .create_parts(session_id, &sizes)
                .await?;

            state.broadcaster.publish_session(&session).await;

            Ok(SessionCredentials {
                session_id,
                file_name: file.name.clone(),
                object_key,
                credentials: UploadCredentials::Chunked {
                    upload_id,
                    total_parts: part_count,
                    part_size,
                    max_concurrent_parts: state.config.max_concurrent_parts,
                },
            })
        }
    }
}

/// `{prefix}/{session_id}.{ext}`: unique per session, immutable once assigned.
fn build_object_key(prefix: &str, session_id: Uuid, file_name: &str) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    format!("{}/{}.{}", prefix, session_id, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_uses_lowercased_extension() {
        let id = Uuid::new_v4();
        let key = build_object_key("uploads", id, "Movie.MP4");
        assert_eq!(key, format!("uploads/{}.mp4", id));
    }

    #[test]
    fn test_object_key_without_extension_falls_back() {
        let id = Uuid::new_v4();
        let key = build_object_key("uploads", id, "README");
        assert_eq!(key, format!("uploads/{}.bin", id));
    }
}
