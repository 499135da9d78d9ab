//! Live progress stream.
//!
//! A persistent text/event-stream keyed by group, session, or caller id. The
//! first frames are a `connected` marker and a full snapshot rebuilt from the
//! lifecycle store, so a late or reconnecting subscriber is never stuck
//! waiting for a delta; everything after that is pushed by state-changing
//! operations.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use stowage_core::AppError;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::broadcast::{ProgressEvent, SubscriberKey};
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProgressQuery {
    pub group_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub caller_id: Option<Uuid>,
}

/// Resolve the subscriber key and the store-backed snapshot frames for a
/// subscription request.
pub async fn build_subscription(
    state: &Arc<AppState>,
    query: &ProgressQuery,
) -> Result<(SubscriberKey, Vec<ProgressEvent>), AppError> {
    match (query.group_id, query.session_id, query.caller_id) {
        (Some(group_id), None, None) => {
            let group = state
                .db
                .group_repository
                .get_group(group_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Group not found: {}", group_id)))?;
            let sessions = state.db.session_repository.list_by_group(group_id).await?;

            let mut events = vec![ProgressEvent::group_update(group)];
            events.extend(sessions.into_iter().map(ProgressEvent::session_update));
            Ok((SubscriberKey::Group(group_id), events))
        }
        (None, Some(session_id), None) => {
            let session = state
                .db
                .session_repository
                .get_session(session_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Upload session not found: {}", session_id))
                })?;
            Ok((
                SubscriberKey::Session(session_id),
                vec![ProgressEvent::session_update(session)],
            ))
        }
        (None, None, Some(caller_id)) => {
            let sessions = state.db.session_repository.list_by_owner(caller_id).await?;
            Ok((
                SubscriberKey::Caller(caller_id),
                sessions.into_iter().map(ProgressEvent::user_update).collect(),
            ))
        }
        _ => Err(AppError::InvalidInput(
            "Exactly one of group_id, session_id, or caller_id is required".to_string(),
        )),
    }
}

/// Subscribe to live upload progress for one group, session, or caller.
#[utoipa::path(
    get,
    path = "/api/v0/uploads/events",
    tag = "uploads",
    params(ProgressQuery),
    responses(
        (status = 200, description = "Server-sent event stream of progress updates"),
        (status = 400, description = "Exactly one subscription key is required"),
        (status = 404, description = "Subscribed entity not found")
    )
)]
pub async fn upload_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, HttpAppError> {
    let (key, snapshot) = build_subscription(&state, &query).await?;

    let rx = state.broadcaster.subscribe(key).await;

    tracing::debug!(key = ?key, snapshot_frames = snapshot.len(), "Progress subscriber connected");

    let initial = std::iter::once(ProgressEvent::connected()).chain(snapshot);
    let live = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    });

    let stream = futures::stream::iter(initial)
        .chain(live)
        .map(|event| Event::default().json_data(&event));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
