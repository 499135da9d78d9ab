use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{
    CompletedMultipartUpload, CompletedPart, Event, FilterRule, FilterRuleName,
    NotificationConfiguration, NotificationConfigurationFilter, QueueConfiguration, S3KeyFilter,
};

use crate::traits::{
    NotificationTarget, ObjectGateway, PartEtag, PresignedUpload, StorageError, StorageResult,
};

/// S3 gateway implementation
///
/// Works against AWS S3 and S3-compatible providers (MinIO, DigitalOcean
/// Spaces) via a custom endpoint with path-style addressing.
#[derive(Clone)]
pub struct S3Gateway {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Gateway {
    /// Build a gateway from the ambient AWS environment plus explicit settings.
    ///
    /// # Arguments
    /// * `bucket` - target bucket name
    /// * `region` - region identifier (or placeholder for S3-compatible providers)
    /// * `endpoint_url` - optional custom endpoint, e.g. "http://localhost:9000" for MinIO
    pub async fn new(bucket: String, region: String, endpoint_url: Option<String>) -> Self {
        let shared = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared).region(Region::new(region));

        if let Some(endpoint) = endpoint_url {
            // S3-compatible providers generally require path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());
        S3Gateway { client, bucket }
    }

    fn presigning_config(expires_in: Duration) -> StorageResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::ConfigError(e.to_string()))
    }
}

#[async_trait]
impl ObjectGateway for S3Gateway {
    async fn ensure_bucket(&self) -> StorageResult<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => return Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if !service_err.is_not_found() {
                    return Err(StorageError::Provision(service_err.to_string()));
                }
            }
        }

        match self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, "Created storage bucket");
                Ok(())
            }
            Err(err) => {
                let service_err = err.into_service_error();
                // Lost a create race: another writer owns it now, which is fine.
                if service_err.is_bucket_already_owned_by_you()
                    || service_err.is_bucket_already_exists()
                {
                    Ok(())
                } else {
                    tracing::error!(
                        error = %service_err,
                        bucket = %self.bucket,
                        "Bucket creation failed"
                    );
                    Err(StorageError::Provision(service_err.to_string()))
                }
            }
        }
    }

    async fn ensure_notification(&self, target: &NotificationTarget) -> StorageResult<()> {
        let mut queue_config = QueueConfiguration::builder()
            .id("stowage-storage-events")
            .queue_arn(&target.queue_arn);

        for event_type in &target.event_types {
            queue_config = queue_config.events(Event::from(event_type.as_str()));
        }

        if let Some(ref prefix) = target.prefix {
            queue_config = queue_config.filter(
                NotificationConfigurationFilter::builder()
                    .key(
                        S3KeyFilter::builder()
                            .filter_rules(
                                FilterRule::builder()
                                    .name(FilterRuleName::Prefix)
                                    .value(prefix)
                                    .build(),
                            )
                            .build(),
                    )
                    .build(),
            );
        }

        let queue_config = queue_config
            .build()
            .map_err(|e| StorageError::Notification(e.to_string()))?;

        let notification_config = NotificationConfiguration::builder()
            .queue_configurations(queue_config)
            .build();

        self.client
            .put_bucket_notification_configuration()
            .bucket(&self.bucket)
            .notification_configuration(notification_config)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    target_arn = %target.queue_arn,
                    "Failed to configure bucket notification"
                );
                StorageError::Notification(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            target_arn = %target.queue_arn,
            endpoint = %target.endpoint,
            "Bucket notification subscription ensured"
        );

        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        max_bytes: u64,
        expires_in: Duration,
    ) -> StorageResult<PresignedUpload> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(max_bytes as i64)
            .presigned(Self::presigning_config(expires_in)?)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Presigning direct upload failed"
                );
                StorageError::Presign(e.to_string())
            })?;

        let headers: BTreeMap<String, String> = presigned
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            expires_secs = expires_in.as_secs(),
            "Presigned direct upload"
        );

        Ok(PresignedUpload {
            url: presigned.uri().to_string(),
            headers,
        })
    }

    async fn initiate_multipart(&self, key: &str, content_type: &str) -> StorageResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Multipart initiate failed"
                );
                StorageError::InitiateMultipart(e.to_string())
            })?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| {
                StorageError::InitiateMultipart("provider returned no upload id".to_string())
            })?
            .to_string();

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            upload_id = %upload_id,
            "Multipart upload initiated"
        );

        Ok(upload_id)
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: i32,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let presigned = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(Self::presigning_config(expires_in)?)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    part_number = part_number,
                    "Presigning part upload failed"
                );
                StorageError::Presign(e.to_string())
            })?;

        Ok(presigned.uri().to_string())
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[PartEtag],
    ) -> StorageResult<()> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    upload_id = %upload_id,
                    "Multipart complete failed"
                );
                StorageError::CompleteMultipart(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            upload_id = %upload_id,
            parts = parts.len(),
            "Multipart upload completed"
        );

        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    upload_id = %upload_id,
                    "Multipart abort failed"
                );
                StorageError::AbortMultipart(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            upload_id = %upload_id,
            "Multipart upload aborted"
        );

        Ok(())
    }
}
