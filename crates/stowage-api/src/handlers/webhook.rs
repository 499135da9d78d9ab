//! Storage event ingestion.
//!
//! The storage provider delivers object-created and object-removed
//! notifications here. Deliveries are authenticated before the payload is
//! read, may be duplicated or out of order, and are processed per record so
//! one bad record never blocks its siblings.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use stowage_core::models::{StorageEventNotification, StorageEventRecord, StrategyKind};
use stowage_core::AppError;
use subtle::ConstantTimeEq;

use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::common::{dispatch_completed, finish_group_accounting};
use crate::state::AppState;

/// Ingest a batch of storage events from the provider.
#[utoipa::path(
    post,
    path = "/api/v0/webhooks/storage",
    tag = "webhooks",
    request_body = StorageEventNotification,
    responses(
        (status = 200, description = "Events processed"),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
        (status = 401, description = "Invalid or missing auth token", body = ErrorResponse)
    )
)]
pub async fn ingest_storage_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<impl IntoResponse, HttpAppError> {
    // Authenticate before the payload is touched.
    authenticate(&state, &headers)?;

    let notification: StorageEventNotification = serde_json::from_str(&body)
        .map_err(|e| AppError::BadRequest(format!("Malformed storage event payload: {}", e)))?;
    notification.validate().map_err(AppError::BadRequest)?;

    let created = notification.is_created_event();
    let removed = notification.is_removed_event();
    if !created && !removed {
        tracing::debug!(
            event_name = %notification.event_name,
            "Ignoring unhandled storage event type"
        );
        return Ok(Json(serde_json::json!({ "success": true })));
    }

    for record in &notification.records {
        let result = if created {
            handle_created(&state, record).await
        } else {
            handle_removed(&state, record).await
        };

        // One record's failure must not prevent processing of its siblings.
        if let Err(e) = result {
            tracing::error!(
                error = %e,
                object_key = %record.object_key,
                bucket = %record.bucket,
                "Failed to process storage event record"
            );
        }
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

fn authenticate(state: &Arc<AppState>, headers: &HeaderMap) -> Result<(), AppError> {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?;

    let matches: bool = provided
        .as_bytes()
        .ct_eq(state.config.webhook_auth_token.as_bytes())
        .into();

    if matches {
        Ok(())
    } else {
        Err(AppError::Unauthorized("invalid auth token".to_string()))
    }
}

/// Object created: drive the session's terminal upload transition.
///
/// Unknown keys are dropped (the object may belong to a collaborator outside
/// this system); terminal sessions are dropped silently because providers
/// redeliver. Only direct-strategy sessions take the group counter here;
/// chunked sessions are counted by the complete operation.
async fn handle_created(state: &Arc<AppState>, record: &StorageEventRecord) -> Result<(), AppError> {
    let Some(session) = state
        .db
        .session_repository
        .get_by_object_key(&record.object_key)
        .await?
    else {
        tracing::debug!(
            object_key = %record.object_key,
            "No session for created object; dropping event"
        );
        return Ok(());
    };

    if session.status.is_upload_terminal() {
        tracing::debug!(
            session_id = %session.id,
            status = ?session.status,
            "Redelivered created event for settled session; dropping"
        );
        return Ok(());
    }

    let Some(updated) = state
        .db
        .session_repository
        .try_mark_uploaded_by_key(&record.object_key)
        .await?
    else {
        // Lost the transition race to a concurrent complete call.
        return Ok(());
    };

    tracing::info!(
        session_id = %updated.id,
        object_key = %record.object_key,
        size = record.size,
        "Session uploaded via storage event"
    );

    state.broadcaster.publish_session(&updated).await;

    if updated.strategy == StrategyKind::Direct {
        finish_group_accounting(state, updated.id).await?;
    }

    dispatch_completed(state, &updated).await;

    Ok(())
}

/// Object removed: mark the session deleted when it has not already settled.
async fn handle_removed(state: &Arc<AppState>, record: &StorageEventRecord) -> Result<(), AppError> {
    let changed = state
        .db
        .session_repository
        .mark_deleted_if_active(&record.object_key)
        .await?;

    if !changed {
        tracing::debug!(
            object_key = %record.object_key,
            "Removed event for unknown or settled session; dropping"
        );
        return Ok(());
    }

    if let Some(session) = state
        .db
        .session_repository
        .get_by_object_key(&record.object_key)
        .await?
    {
        tracing::info!(
            session_id = %session.id,
            object_key = %record.object_key,
            "Session marked deleted after object removal"
        );
        state.broadcaster.publish_session(&session).await;
    }

    Ok(())
}
