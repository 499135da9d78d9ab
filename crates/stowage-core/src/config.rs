//! Configuration module
//!
//! Environment-driven configuration for the API server, lifecycle store,
//! storage gateway, and downstream queue. Fail-fast on misconfiguration.

use std::env;
use std::time::Duration;

use crate::policy::UploadPolicy;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: u64 = 5 * 1024;
const CHUNK_THRESHOLD_MB: u64 = 50;
const CHUNK_SIZE_MB: u64 = 50;
const PRESIGN_EXPIRY_SECS: u64 = 3600;
const MAX_CONCURRENT_PARTS: usize = 4;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage provider
    pub s3_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub upload_prefix: String,
    // Upload policy
    pub allowed_content_types: Vec<String>,
    pub max_file_size_bytes: u64,
    pub chunk_threshold_bytes: u64,
    pub chunk_size_bytes: u64,
    pub presign_expiry_secs: u64,
    pub max_concurrent_parts: usize,
    // Storage event webhook (inbound, provider -> us)
    pub webhook_auth_token: String,
    pub webhook_endpoint: String,
    pub notification_queue_arn: String,
    // Downstream processing queue
    pub job_queue_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let chunk_threshold_mb = env::var("CHUNK_THRESHOLD_MB")
            .unwrap_or_else(|_| CHUNK_THRESHOLD_MB.to_string())
            .parse::<u64>()
            .unwrap_or(CHUNK_THRESHOLD_MB);

        let chunk_size_mb = env::var("CHUNK_SIZE_MB")
            .unwrap_or_else(|_| CHUNK_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(CHUNK_SIZE_MB);
        if chunk_size_mb == 0 {
            return Err(anyhow::anyhow!("CHUNK_SIZE_MB must be greater than 0"));
        }

        let webhook_auth_token = env::var("STORAGE_WEBHOOK_TOKEN").map_err(|_| {
            anyhow::anyhow!("STORAGE_WEBHOOK_TOKEN must be set to authenticate storage events")
        })?;

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            s3_bucket: env::var("S3_BUCKET").map_err(|_| anyhow::anyhow!("S3_BUCKET must be set"))?,
            s3_region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            upload_prefix: env::var("UPLOAD_PREFIX")
                .unwrap_or_else(|_| "uploads".to_string())
                .trim_matches('/')
                .to_string(),
            allowed_content_types,
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            chunk_threshold_bytes: chunk_threshold_mb * 1024 * 1024,
            chunk_size_bytes: chunk_size_mb * 1024 * 1024,
            presign_expiry_secs: env::var("PRESIGN_EXPIRY_SECS")
                .unwrap_or_else(|_| PRESIGN_EXPIRY_SECS.to_string())
                .parse()
                .unwrap_or(PRESIGN_EXPIRY_SECS),
            max_concurrent_parts: env::var("MAX_CONCURRENT_PARTS")
                .unwrap_or_else(|_| MAX_CONCURRENT_PARTS.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_PARTS)
                .max(1),
            webhook_auth_token,
            webhook_endpoint: env::var("STORAGE_WEBHOOK_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4000/api/v0/webhooks/storage".to_string()),
            notification_queue_arn: env::var("STORAGE_NOTIFICATION_ARN")
                .unwrap_or_else(|_| "arn:minio:sqs::PRIMARY:webhook".to_string()),
            job_queue_url: env::var("JOB_QUEUE_URL").ok().filter(|s| !s.is_empty()),
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Upload policy derived from the configured limits.
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_content_types: self.allowed_content_types.clone(),
            max_file_size_bytes: self.max_file_size_bytes,
            chunk_threshold_bytes: self.chunk_threshold_bytes,
            chunk_size_bytes: self.chunk_size_bytes,
        }
    }

    /// Lifetime of presigned upload credentials.
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 4000,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            database_url: "postgresql://localhost/stowage".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 30,
            s3_bucket: "stowage".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_endpoint: Some("http://localhost:9000".to_string()),
            upload_prefix: "uploads".to_string(),
            allowed_content_types: vec![],
            max_file_size_bytes: 5 * 1024 * 1024 * 1024,
            chunk_threshold_bytes: 50 * 1024 * 1024,
            chunk_size_bytes: 50 * 1024 * 1024,
            presign_expiry_secs: 3600,
            max_concurrent_parts: 4,
            webhook_auth_token: "secret".to_string(),
            webhook_endpoint: "http://localhost:4000/api/v0/webhooks/storage".to_string(),
            notification_queue_arn: "arn:minio:sqs::PRIMARY:webhook".to_string(),
            job_queue_url: None,
        }
    }

    #[test]
    fn test_upload_policy_mirrors_limits() {
        let config = base_config();
        let policy = config.upload_policy();
        assert_eq!(policy.max_file_size_bytes, config.max_file_size_bytes);
        assert_eq!(policy.chunk_threshold_bytes, config.chunk_threshold_bytes);
        assert_eq!(policy.chunk_size_bytes, config.chunk_size_bytes);
    }

    #[test]
    fn test_presign_expiry_default_is_one_hour() {
        let config = base_config();
        assert_eq!(config.presign_expiry(), Duration::from_secs(3600));
    }

    #[test]
    fn test_is_production() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }
}
