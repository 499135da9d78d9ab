//! Upload policy resolver.
//!
//! Pure admission logic: given a file's declared name, content type, and size,
//! decide whether the upload is allowed and which strategy it gets. This runs
//! before any store or gateway interaction, so a rejection has no side effects.

use serde::Serialize;
use utoipa::ToSchema;

/// Limits and allow-lists applied to every submitted file.
#[derive(Clone, Debug)]
pub struct UploadPolicy {
    /// Allowed MIME types; an empty list allows everything.
    pub allowed_content_types: Vec<String>,
    pub max_file_size_bytes: u64,
    /// Declared sizes above this threshold use the chunked strategy.
    pub chunk_threshold_bytes: u64,
    pub chunk_size_bytes: u64,
}

/// How the bytes of an accepted file will reach storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPlan {
    /// Single presigned upload.
    Direct,
    /// Provider-native multipart upload split into `part_count` parts.
    Chunked {
        part_count: i32,
        part_size: u64,
        last_part_size: u64,
    },
}

/// Outcome of policy resolution for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    Accepted(StrategyPlan),
    Rejected { reason: String },
}

impl UploadPolicy {
    /// Resolve the admission decision and upload strategy for one declared file.
    pub fn resolve(&self, file_name: &str, content_type: &str, size: u64) -> PolicyDecision {
        if size == 0 {
            return PolicyDecision::Rejected {
                reason: format!("{}: declared size must be at least 1 byte", file_name),
            };
        }

        if size > self.max_file_size_bytes {
            return PolicyDecision::Rejected {
                reason: format!(
                    "{}: {} bytes exceeds maximum allowed size of {} bytes",
                    file_name, size, self.max_file_size_bytes
                ),
            };
        }

        if !self.allowed_content_types.is_empty() {
            let normalized = content_type.to_lowercase();
            if !self.allowed_content_types.contains(&normalized) {
                return PolicyDecision::Rejected {
                    reason: format!("{}: content type '{}' is not allowed", file_name, content_type),
                };
            }
        }

        if size <= self.chunk_threshold_bytes {
            return PolicyDecision::Accepted(StrategyPlan::Direct);
        }

        let part_count = size.div_ceil(self.chunk_size_bytes);
        let last_part_size = size - (part_count - 1) * self.chunk_size_bytes;
        PolicyDecision::Accepted(StrategyPlan::Chunked {
            part_count: part_count as i32,
            part_size: self.chunk_size_bytes,
            last_part_size,
        })
    }

    /// Sizes of parts 1..=part_count for a chunked upload of `size` bytes.
    /// Every part is `chunk_size_bytes` except the last, which takes the remainder.
    pub fn part_sizes(&self, size: u64) -> Vec<u64> {
        let part_count = size.div_ceil(self.chunk_size_bytes);
        (1..=part_count)
            .map(|n| {
                if n == part_count {
                    size - (part_count - 1) * self.chunk_size_bytes
                } else {
                    self.chunk_size_bytes
                }
            })
            .collect()
    }
}
