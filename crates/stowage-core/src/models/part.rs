use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of one chunk of a chunked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "part_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PartStatus {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

/// One chunk of a chunked session's upload.
///
/// For a session with `total_parts = N`, rows exist for part numbers 1..=N
/// before any part upload begins; `part_number` is unique per session.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UploadPart {
    pub session_id: Uuid,
    /// 1-based, contiguous.
    pub part_number: i32,
    pub size: i64,
    /// Entity tag returned by the provider once the part is uploaded.
    pub etag: Option<String>,
    pub status: PartStatus,
    pub uploaded_at: Option<DateTime<Utc>>,
}
