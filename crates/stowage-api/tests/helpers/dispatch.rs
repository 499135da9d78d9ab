//! Recording job dispatcher double.

use std::sync::Mutex;

use async_trait::async_trait;
use stowage_api::dispatch::JobDispatcher;
use stowage_core::models::CompletedFileJob;
use stowage_core::AppError;

#[derive(Default)]
pub struct RecordingDispatcher {
    pub jobs: Mutex<Vec<CompletedFileJob>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<CompletedFileJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobDispatcher for RecordingDispatcher {
    async fn enqueue(&self, job: &CompletedFileJob) -> Result<String, AppError> {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(job.clone());
        Ok(format!("job-{}", jobs.len()))
    }
}
