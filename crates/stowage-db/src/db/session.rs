use sqlx::PgPool;
use stowage_core::models::{StrategyKind, UploadSession};
use stowage_core::AppError;
use uuid::Uuid;

/// Repository for upload sessions
///
/// Terminal transitions are single conditional UPDATEs returning the row only
/// when this caller won the transition; a `None` result means another writer
/// (or an earlier delivery of the same signal) got there first.
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new upload session
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip_all, fields(db.table = "upload_sessions", db.operation = "insert", db.record_id = %id))]
    pub async fn create_session(
        &self,
        id: Uuid,
        group_id: Option<Uuid>,
        owner_id: Option<Uuid>,
        file_name: String,
        content_type: String,
        file_size: i64,
        object_key: String,
        strategy: StrategyKind,
        multipart_upload_id: Option<String>,
        total_parts: Option<i32>,
    ) -> Result<UploadSession, AppError> {
        let session = sqlx::query_as::<_, UploadSession>(
            r#"
            INSERT INTO upload_sessions (
                id, group_id, owner_id, file_name, content_type, file_size,
                object_key, strategy, multipart_upload_id, total_parts,
                completed_parts, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, 'pending_upload')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(group_id)
        .bind(owner_id)
        .bind(file_name)
        .bind(content_type)
        .bind(file_size)
        .bind(object_key)
        .bind(strategy)
        .bind(multipart_upload_id)
        .bind(total_parts)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Get a session by ID
    pub async fn get_session(&self, id: Uuid) -> Result<Option<UploadSession>, AppError> {
        let session =
            sqlx::query_as::<_, UploadSession>("SELECT * FROM upload_sessions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(session)
    }

    /// Get a session by its storage object key
    pub async fn get_by_object_key(
        &self,
        object_key: &str,
    ) -> Result<Option<UploadSession>, AppError> {
        let session = sqlx::query_as::<_, UploadSession>(
            "SELECT * FROM upload_sessions WHERE object_key = $1",
        )
        .bind(object_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// List all sessions of a group, oldest first
    pub async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<UploadSession>, AppError> {
        let sessions = sqlx::query_as::<_, UploadSession>(
            "SELECT * FROM upload_sessions WHERE group_id = $1 ORDER BY created_at, id",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// List all sessions attributed to a caller, oldest first
    pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<UploadSession>, AppError> {
        let sessions = sqlx::query_as::<_, UploadSession>(
            "SELECT * FROM upload_sessions WHERE owner_id = $1 ORDER BY created_at, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Move a pending session to uploading. No-op once it has advanced.
    pub async fn mark_uploading(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'uploading', updated_at = NOW()
            WHERE id = $1 AND status = 'pending_upload'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Attempt the terminal upload transition. Returns the updated row only
    /// when this caller performed the transition; `None` when the session is
    /// already past uploading (duplicate completion signal) or unknown.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "update", db.record_id = %id))]
    pub async fn try_mark_uploaded(&self, id: Uuid) -> Result<Option<UploadSession>, AppError> {
        let session = sqlx::query_as::<_, UploadSession>(
            r#"
            UPDATE upload_sessions
            SET status = 'uploaded', uploaded_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status IN ('pending_upload', 'uploading')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Same terminal transition, keyed by object key (webhook path).
    pub async fn try_mark_uploaded_by_key(
        &self,
        object_key: &str,
    ) -> Result<Option<UploadSession>, AppError> {
        let session = sqlx::query_as::<_, UploadSession>(
            r#"
            UPDATE upload_sessions
            SET status = 'uploaded', uploaded_at = NOW(), updated_at = NOW()
            WHERE object_key = $1 AND status IN ('pending_upload', 'uploading')
            RETURNING *
            "#,
        )
        .bind(object_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Claim this session's slot in its group counter. At most one caller ever
    /// wins the claim, which makes the group increment safe against duplicated
    /// completion signals.
    pub async fn try_count_in_group(&self, id: Uuid) -> Result<Option<Uuid>, AppError> {
        let group_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE upload_sessions
            SET group_counted = TRUE, updated_at = NOW()
            WHERE id = $1
              AND group_counted = FALSE
              AND group_id IS NOT NULL
              AND status IN ('uploaded', 'processing', 'completed')
            RETURNING group_id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group_id)
    }

    /// Mark a session failed. Only applies while the upload is in flight;
    /// completed sessions are left untouched and re-failing is a no-op.
    pub async fn mark_failed(
        &self,
        id: Uuid,
        error_message: Option<String>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'failed', error_message = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending_upload', 'uploading')
            "#,
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark the session for a removed object as deleted, when it has not
    /// already reached a terminal state.
    pub async fn mark_deleted_if_active(&self, object_key: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_sessions
            SET status = 'deleted', updated_at = NOW()
            WHERE object_key = $1 AND status IN ('pending_upload', 'uploading')
            "#,
        )
        .bind(object_key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add newly uploaded parts to the session's completed_parts counter.
    /// The delta comes from the parts' own transitions, keeping
    /// `completed_parts <= total_parts` without a scan.
    pub async fn add_completed_parts(&self, id: Uuid, delta: i64) -> Result<(), AppError> {
        if delta == 0 {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE upload_sessions
            SET completed_parts = completed_parts + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(delta as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
