//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use stowage_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stowage API",
        version = "0.1.0",
        description = "Direct-to-storage upload orchestration API (v0). Callers receive time-limited upload credentials, push bytes straight to object storage, and track upload lifecycle state for groups, sessions, and parts. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::initiate::initiate_upload,
        handlers::part_url::generate_part_upload_url,
        handlers::complete::complete_multipart_upload,
        handlers::abort::abort_multipart_upload,
        handlers::webhook::ingest_storage_events,
        handlers::progress::upload_events,
        handlers::health::health,
    ),
    components(schemas(
        models::FileDescriptor,
        models::InitiateUploadRequest,
        models::InitiateUploadResponse,
        models::SessionCredentials,
        models::RejectedFile,
        models::UploadCredentials,
        models::PartUrlResponse,
        models::CompletedPartInput,
        models::CompleteUploadRequest,
        models::CompleteUploadResponse,
        models::AbortUploadResponse,
        models::StorageEventNotification,
        models::StorageEventRecord,
        models::UploadGroup,
        models::UploadSession,
        models::UploadPart,
        models::GroupStatus,
        models::SessionStatus,
        models::PartStatus,
        models::StrategyKind,
        error::ErrorResponse,
    )),
    tags(
        (name = "uploads", description = "Upload session lifecycle"),
        (name = "webhooks", description = "Storage provider event ingestion"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// The OpenAPI spec served at /api/openapi.json.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
