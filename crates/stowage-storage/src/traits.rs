//! Gateway abstraction trait
//!
//! This module defines the ObjectGateway trait the upload controller talks to.
//! Every operation is a network call against the storage provider and can fail
//! transiently; callers decide what is retryable.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Gateway operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Bucket provisioning failed: {0}")]
    Provision(String),

    #[error("Notification subscription failed: {0}")]
    Notification(String),

    #[error("Presign failed: {0}")]
    Presign(String),

    #[error("Multipart initiate failed: {0}")]
    InitiateMultipart(String),

    #[error("Multipart complete failed: {0}")]
    CompleteMultipart(String),

    #[error("Multipart abort failed: {0}")]
    AbortMultipart(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Name of the gateway operation that failed, for error context.
    pub fn operation(&self) -> &'static str {
        match self {
            StorageError::Provision(_) => "ensure_bucket",
            StorageError::Notification(_) => "ensure_notification",
            StorageError::Presign(_) => "presign",
            StorageError::InitiateMultipart(_) => "initiate_multipart",
            StorageError::CompleteMultipart(_) => "complete_multipart",
            StorageError::AbortMultipart(_) => "abort_multipart",
            StorageError::ConfigError(_) => "configuration",
        }
    }
}

/// Result type for gateway operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Time-limited credential permitting one direct upload without server
/// mediation: the URL to PUT to plus the headers the provider signed over.
#[derive(Debug, Clone)]
pub struct PresignedUpload {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

/// One part's entity tag, as required to finalize a multipart upload.
/// The provider contract requires parts in strictly increasing part order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartEtag {
    pub part_number: i32,
    pub etag: String,
}

/// Where the provider should deliver stored-object event notifications.
#[derive(Debug, Clone)]
pub struct NotificationTarget {
    /// Provider-side identifier of the pre-configured webhook target.
    pub queue_arn: String,
    /// The HTTP endpoint the events land on (informational; the provider's
    /// target config owns the actual delivery address and auth token).
    pub endpoint: String,
    pub event_types: Vec<String>,
    pub prefix: Option<String>,
}

/// Storage provider gateway.
///
/// All operations are assumed to be I/O-bound network calls. Implementations
/// must be safe to share across request tasks.
#[async_trait]
pub trait ObjectGateway: Send + Sync {
    /// Create the target bucket if it does not exist. Never fails when the
    /// bucket is already present.
    async fn ensure_bucket(&self) -> StorageResult<()>;

    /// Subscribe the bucket's object events to the given target, idempotently.
    async fn ensure_notification(&self, target: &NotificationTarget) -> StorageResult<()>;

    /// Presign a single-shot upload scoped to the exact content type and a
    /// maximum byte length.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        max_bytes: u64,
        expires_in: Duration,
    ) -> StorageResult<PresignedUpload>;

    /// Start a provider-side multipart upload; returns the provider upload id.
    async fn initiate_multipart(&self, key: &str, content_type: &str) -> StorageResult<String>;

    /// Presign a single-part PUT for an in-flight multipart upload.
    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Finalize a multipart upload. `parts` must be sorted ascending by
    /// part_number; the provider rejects any other order.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartEtag],
    ) -> StorageResult<()>;

    /// Abandon a multipart upload and discard its parts.
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()>;
}
