use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Descriptor handed to the downstream job dispatcher once a session's bytes
/// are durably stored. Dispatched exactly once per successful session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompletedFileJob {
    pub session_id: Uuid,
    pub group_id: Option<Uuid>,
    pub object_key: String,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}
