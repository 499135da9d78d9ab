//! Storage provider gateway.
//!
//! Wraps the object-storage provider's presigned-URL and multipart-upload
//! primitives behind the [`ObjectGateway`] trait. The gateway is consumed by
//! the upload controller and never re-implemented here; the S3 backend is the
//! production implementation, test doubles live with the tests that use them.

pub mod s3;
pub mod traits;

pub use s3::S3Gateway;
pub use traits::{
    NotificationTarget, ObjectGateway, PartEtag, PresignedUpload, StorageError, StorageResult,
};
