//! Downstream job dispatch.
//!
//! Once a session's bytes are durably stored, a completed-file descriptor is
//! handed to the processing queue. The queue consumer side (transcription,
//! scanning, and friends) lives outside this service.

use async_trait::async_trait;
use stowage_core::models::CompletedFileJob;
use stowage_core::AppError;

/// Accepts a completed-file event and enqueues further processing.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Enqueue processing for a completed file; returns the queue's job id.
    async fn enqueue(&self, job: &CompletedFileJob) -> Result<String, AppError>;
}

/// SQS-backed dispatcher.
pub struct SqsJobDispatcher {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsJobDispatcher {
    pub async fn new(queue_url: String) -> Self {
        let shared = aws_config::load_from_env().await;
        Self {
            client: aws_sdk_sqs::Client::new(&shared),
            queue_url,
        }
    }
}

#[async_trait]
impl JobDispatcher for SqsJobDispatcher {
    async fn enqueue(&self, job: &CompletedFileJob) -> Result<String, AppError> {
        let body = serde_json::to_string(job)?;

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| AppError::provider("enqueue_job", e))?;

        let job_id = output.message_id().unwrap_or_default().to_string();

        tracing::info!(
            session_id = %job.session_id,
            object_key = %job.object_key,
            job_id = %job_id,
            "Enqueued downstream processing job"
        );

        Ok(job_id)
    }
}

/// No-op dispatcher used when no processing queue is configured.
pub struct NoopJobDispatcher;

#[async_trait]
impl JobDispatcher for NoopJobDispatcher {
    async fn enqueue(&self, job: &CompletedFileJob) -> Result<String, AppError> {
        tracing::debug!(
            session_id = %job.session_id,
            "No processing queue configured; dropping completed-file job"
        );
        Ok(String::new())
    }
}
