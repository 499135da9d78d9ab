use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of an upload group. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "group_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl GroupStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GroupStatus::Completed | GroupStatus::Failed | GroupStatus::Cancelled
        )
    }
}

/// A named batch of related file uploads submitted together.
///
/// Invariant: `0 <= completed_files <= total_files`; the group reaches
/// `completed` exactly when every child session has been counted.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UploadGroup {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub status: GroupStatus,
    pub total_files: i32,
    pub completed_files: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
