use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Upload strategy assigned to a session at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "upload_strategy", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Single presigned upload, completion observed via storage events.
    Direct,
    /// Provider-native multipart upload, completed explicitly by the caller.
    Chunked,
}

/// Lifecycle status of an upload session.
///
/// `pending_upload -> uploading -> uploaded -> processing -> completed`,
/// with `failed` reachable until the upload succeeds and `deleted` applied
/// when the stored object is removed. Transitions never move backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "session_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    PendingUpload,
    Uploading,
    Uploaded,
    Processing,
    Completed,
    Failed,
    Deleted,
}

impl SessionStatus {
    /// Whether the upload phase is over: the bytes either landed durably or
    /// never will. Duplicate completion signals for these states are dropped.
    pub fn is_upload_terminal(&self) -> bool {
        !matches!(self, SessionStatus::PendingUpload | SessionStatus::Uploading)
    }

    /// Whether the session reached (or passed through) a durable upload.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            SessionStatus::Uploaded | SessionStatus::Processing | SessionStatus::Completed
        )
    }
}

/// The lifecycle record for one physical uploaded object.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UploadSession {
    pub id: Uuid,
    pub group_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    /// Globally unique, immutable storage-provider object name.
    pub object_key: String,
    pub strategy: StrategyKind,
    /// Provider-side multipart upload id; set iff `strategy == Chunked`.
    pub multipart_upload_id: Option<String>,
    pub total_parts: Option<i32>,
    pub completed_parts: i32,
    pub status: SessionStatus,
    /// Whether this session has been counted toward its group's completed_files.
    #[serde(skip_serializing)]
    pub group_counted: bool,
    pub error_message: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn is_multipart(&self) -> bool {
        self.multipart_upload_id.is_some()
    }
}
