use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Provider-originated notification describing one or more stored-object events.
///
/// Deliveries may be duplicated, reordered, or batched; each record is
/// processed independently so one bad record never blocks its siblings.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StorageEventNotification {
    pub event_name: String,
    pub records: Vec<StorageEventRecord>,
}

/// One stored-object event inside a notification delivery.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StorageEventRecord {
    pub bucket: String,
    pub object_key: String,
    pub size: i64,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    pub event_time: DateTime<Utc>,
}

impl StorageEventNotification {
    /// Structural validation; malformed payloads are rejected before any
    /// record is processed.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_name.is_empty() {
            return Err("event_name must not be empty".to_string());
        }
        if self.records.is_empty() {
            return Err("notification carries no records".to_string());
        }
        for (i, record) in self.records.iter().enumerate() {
            if record.bucket.is_empty() {
                return Err(format!("record {}: bucket must not be empty", i));
            }
            if record.object_key.is_empty() {
                return Err(format!("record {}: object_key must not be empty", i));
            }
            if record.size < 0 {
                return Err(format!("record {}: size must not be negative", i));
            }
        }
        Ok(())
    }

    /// Whether this delivery describes object creation.
    pub fn is_created_event(&self) -> bool {
        self.event_name.contains("ObjectCreated")
    }

    /// Whether this delivery describes object removal.
    pub fn is_removed_event(&self) -> bool {
        self.event_name.contains("ObjectRemoved")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str) -> StorageEventRecord {
        StorageEventRecord {
            bucket: "stowage".to_string(),
            object_key: key.to_string(),
            size: 1024,
            etag: Some("\"abc\"".to_string()),
            content_type: Some("text/plain".to_string()),
            event_time: Utc::now(),
        }
    }

    #[test]
    fn test_valid_notification() {
        let notification = StorageEventNotification {
            event_name: "s3:ObjectCreated:Put".to_string(),
            records: vec![record("uploads/a.txt")],
        };
        assert!(notification.validate().is_ok());
        assert!(notification.is_created_event());
        assert!(!notification.is_removed_event());
    }

    #[test]
    fn test_removed_event_name() {
        let notification = StorageEventNotification {
            event_name: "s3:ObjectRemoved:Delete".to_string(),
            records: vec![record("uploads/a.txt")],
        };
        assert!(notification.is_removed_event());
    }

    #[test]
    fn test_rejects_empty_records() {
        let notification = StorageEventNotification {
            event_name: "s3:ObjectCreated:Put".to_string(),
            records: vec![],
        };
        assert!(notification.validate().is_err());
    }

    #[test]
    fn test_rejects_blank_object_key() {
        let notification = StorageEventNotification {
            event_name: "s3:ObjectCreated:Put".to_string(),
            records: vec![record("")],
        };
        let err = notification.validate().unwrap_err();
        assert!(err.contains("object_key"));
    }

    #[test]
    fn test_rejects_negative_size() {
        let mut bad = record("uploads/a.txt");
        bad.size = -1;
        let notification = StorageEventNotification {
            event_name: "s3:ObjectCreated:Put".to_string(),
            records: vec![bad],
        };
        assert!(notification.validate().is_err());
    }
}
