//! Scripted in-memory gateway double: records every call so tests can assert
//! on the exact provider interaction (part ordering in particular).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use stowage_storage::{
    NotificationTarget, ObjectGateway, PartEtag, PresignedUpload, StorageError, StorageResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCall {
    pub key: String,
    pub upload_id: String,
    pub parts: Vec<PartEtag>,
}

#[derive(Default)]
pub struct MockGateway {
    next_upload_id: AtomicU64,
    pub bucket_ensured: AtomicBool,
    pub notification_ensured: AtomicBool,
    pub fail_abort: AtomicBool,
    pub presigned_keys: Mutex<Vec<String>>,
    pub initiated_keys: Mutex<Vec<String>>,
    pub part_urls: Mutex<Vec<(String, i32)>>,
    pub completed: Mutex<Vec<CompletedCall>>,
    pub aborted: Mutex<Vec<(String, String)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_calls(&self) -> Vec<CompletedCall> {
        self.completed.lock().unwrap().clone()
    }

    pub fn aborted_calls(&self) -> Vec<(String, String)> {
        self.aborted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectGateway for MockGateway {
    async fn ensure_bucket(&self) -> StorageResult<()> {
        self.bucket_ensured.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_notification(&self, _target: &NotificationTarget) -> StorageResult<()> {
        self.notification_ensured.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        _max_bytes: u64,
        _expires_in: Duration,
    ) -> StorageResult<PresignedUpload> {
        self.presigned_keys.lock().unwrap().push(key.to_string());
        Ok(PresignedUpload {
            url: format!("https://mock-storage.local/{}", key),
            headers: [("content-type".to_string(), content_type.to_string())]
                .into_iter()
                .collect(),
        })
    }

    async fn initiate_multipart(&self, key: &str, _content_type: &str) -> StorageResult<String> {
        self.initiated_keys.lock().unwrap().push(key.to_string());
        let n = self.next_upload_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("mock-upload-{}", n))
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        self.part_urls
            .lock()
            .unwrap()
            .push((key.to_string(), part_number));
        Ok(format!(
            "https://mock-storage.local/{}?uploadId={}&partNumber={}",
            key, upload_id, part_number
        ))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartEtag],
    ) -> StorageResult<()> {
        self.completed.lock().unwrap().push(CompletedCall {
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            parts: parts.to_vec(),
        });
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        if self.fail_abort.load(Ordering::SeqCst) {
            return Err(StorageError::AbortMultipart(
                "simulated provider outage".to_string(),
            ));
        }
        self.aborted
            .lock()
            .unwrap()
            .push((key.to_string(), upload_id.to_string()));
        Ok(())
    }
}
