pub mod group;
pub mod job;
pub mod part;
pub mod session;
pub mod upload;
pub mod webhook;

pub use group::{GroupStatus, UploadGroup};
pub use job::CompletedFileJob;
pub use part::{PartStatus, UploadPart};
pub use session::{SessionStatus, StrategyKind, UploadSession};
pub use upload::{
    AbortUploadResponse, CompleteUploadRequest, CompleteUploadResponse, CompletedPartInput,
    FileDescriptor, InitiateUploadRequest, InitiateUploadResponse, PartUrlResponse,
    RejectedFile, SessionCredentials, UploadCredentials,
};
pub use webhook::{StorageEventNotification, StorageEventRecord};
