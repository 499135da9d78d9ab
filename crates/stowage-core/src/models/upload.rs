use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One file declared in an initiate request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct FileDescriptor {
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub name: String,
    /// Declared content type (MIME type)
    #[serde(rename = "type")]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Content type must be between 1 and 255 characters"
    ))]
    pub content_type: String,
    /// Declared size in bytes
    pub size: u64,
}

/// Request to initiate direct-to-storage uploads for one or more files.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct InitiateUploadRequest {
    #[validate(length(min = 1, message = "At least one file is required"), nested)]
    pub files: Vec<FileDescriptor>,
    /// Optional group name; forces group creation even for a single file.
    #[serde(default)]
    #[validate(length(max = 255, message = "Group name must be at most 255 characters"))]
    pub group_name: Option<String>,
    /// Optional caller identity the sessions are attributed to.
    #[serde(default)]
    pub caller_id: Option<Uuid>,
}

/// Credentials the caller uses to push bytes directly to storage.
///
/// Tagged by strategy so a direct descriptor can never be confused with a
/// multipart one.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum UploadCredentials {
    /// Single presigned upload: PUT the bytes to `url` with `headers` set.
    Direct {
        url: String,
        headers: BTreeMap<String, String>,
    },
    /// Provider-native multipart upload: request part URLs one by one.
    Chunked {
        upload_id: String,
        total_parts: i32,
        part_size: u64,
        max_concurrent_parts: usize,
    },
}

/// Per-file entry in a successful initiate response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCredentials {
    pub session_id: Uuid,
    pub file_name: String,
    pub object_key: String,
    #[serde(flatten)]
    pub credentials: UploadCredentials,
}

/// Per-file rejection in a partially failed initiate response.
#[derive(Debug, Serialize, ToSchema)]
pub struct RejectedFile {
    pub file_name: String,
    pub reason: String,
}

/// Response for initiate: accepted sessions plus per-file rejections.
/// One bad file never blocks its siblings.
#[derive(Debug, Serialize, ToSchema)]
pub struct InitiateUploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
    pub sessions: Vec<SessionCredentials>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RejectedFile>,
}

/// Response carrying a single presigned part-upload URL.
#[derive(Debug, Serialize, ToSchema)]
pub struct PartUrlResponse {
    pub success: bool,
    pub url: String,
}

/// One uploaded part reported by the caller when completing a chunked upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompletedPartInput {
    pub part_number: i32,
    /// Entity tag the provider returned for this part's PUT.
    pub etag: String,
}

/// Request to finalize a chunked upload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CompleteUploadRequest {
    #[validate(length(min = 1, message = "At least one part is required"))]
    pub parts: Vec<CompletedPartInput>,
}

/// Response for complete.
#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteUploadResponse {
    pub success: bool,
}

/// Response for abort.
#[derive(Debug, Serialize, ToSchema)]
pub struct AbortUploadResponse {
    pub success: bool,
}
