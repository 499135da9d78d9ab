//! Live progress broadcasting.
//!
//! An explicit, injected registry of subscriber channels keyed by group,
//! session, or caller id. The registry is purely in-process, ephemeral state:
//! it is never the system of record, and a restarted process rebuilds
//! subscriber snapshots from the lifecycle store on the next subscribe.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stowage_core::models::{UploadGroup, UploadSession};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-subscriber channel capacity. A subscriber that falls this far behind
/// starts missing deltas; its snapshot-on-reconnect covers the gap.
const CHANNEL_CAPACITY: usize = 64;

/// What a subscriber asked to observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriberKey {
    Group(Uuid),
    Session(Uuid),
    Caller(Uuid),
}

/// One frame on the live-update channel. Failures are represented by normal
/// snapshots carrying a `failed` status, never by error frames.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Connected {
        timestamp: DateTime<Utc>,
    },
    GroupUpdate {
        group: UploadGroup,
        timestamp: DateTime<Utc>,
    },
    SessionUpdate {
        session: UploadSession,
        timestamp: DateTime<Utc>,
    },
    UserUpdate {
        session: UploadSession,
        timestamp: DateTime<Utc>,
    },
}

impl ProgressEvent {
    pub fn connected() -> Self {
        ProgressEvent::Connected {
            timestamp: Utc::now(),
        }
    }

    pub fn group_update(group: UploadGroup) -> Self {
        ProgressEvent::GroupUpdate {
            group,
            timestamp: Utc::now(),
        }
    }

    pub fn session_update(session: UploadSession) -> Self {
        ProgressEvent::SessionUpdate {
            session,
            timestamp: Utc::now(),
        }
    }

    pub fn user_update(session: UploadSession) -> Self {
        ProgressEvent::UserUpdate {
            session,
            timestamp: Utc::now(),
        }
    }
}

/// Registry of live subscriber channels.
#[derive(Clone, Default)]
pub struct ProgressBroadcaster {
    inner: Arc<RwLock<HashMap<SubscriberKey, Vec<mpsc::Sender<ProgressEvent>>>>>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for the given key. The caller is expected to send
    /// the entity's current snapshot before draining the returned receiver.
    pub async fn subscribe(&self, key: SubscriberKey) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.inner.write().await.entry(key).or_default().push(tx);
        rx
    }

    /// Push a session delta to session-, group-, and caller-keyed subscribers.
    pub async fn publish_session(&self, session: &UploadSession) {
        self.send_to(
            SubscriberKey::Session(session.id),
            ProgressEvent::session_update(session.clone()),
        )
        .await;

        if let Some(group_id) = session.group_id {
            self.send_to(
                SubscriberKey::Group(group_id),
                ProgressEvent::session_update(session.clone()),
            )
            .await;
        }

        if let Some(owner_id) = session.owner_id {
            self.send_to(
                SubscriberKey::Caller(owner_id),
                ProgressEvent::user_update(session.clone()),
            )
            .await;
        }
    }

    /// Push a group delta to group- and caller-keyed subscribers.
    pub async fn publish_group(&self, group: &UploadGroup) {
        self.send_to(
            SubscriberKey::Group(group.id),
            ProgressEvent::group_update(group.clone()),
        )
        .await;

        if let Some(owner_id) = group.owner_id {
            self.send_to(
                SubscriberKey::Caller(owner_id),
                ProgressEvent::group_update(group.clone()),
            )
            .await;
        }
    }

    /// Number of live channels for a key (diagnostics and tests).
    pub async fn subscriber_count(&self, key: SubscriberKey) -> usize {
        self.inner
            .read()
            .await
            .get(&key)
            .map(|senders| senders.len())
            .unwrap_or(0)
    }

    /// Deliver an event to every channel under `key`, pruning closed channels
    /// lazily on send failure. A full channel means a slow subscriber: the
    /// delta is dropped for it, the channel stays registered.
    async fn send_to(&self, key: SubscriberKey, event: ProgressEvent) {
        let mut map = self.inner.write().await;
        let Some(senders) = map.get_mut(&key) else {
            return;
        };

        senders.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Closed(_)) => false,
        });

        if senders.is_empty() {
            map.remove(&key);
        }
    }
}
