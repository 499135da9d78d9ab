use sqlx::PgPool;
use stowage_core::models::UploadGroup;
use stowage_core::AppError;
use uuid::Uuid;

/// Repository for upload groups
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new group. `total_files` is fixed at creation and counts every
    /// submitted file, including ones later rejected by policy.
    #[tracing::instrument(skip(self), fields(db.table = "upload_groups", db.operation = "insert"))]
    pub async fn create_group(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
        owner_id: Option<Uuid>,
        total_files: i32,
    ) -> Result<UploadGroup, AppError> {
        let group = sqlx::query_as::<_, UploadGroup>(
            r#"
            INSERT INTO upload_groups (id, name, description, owner_id, status, total_files, completed_files)
            VALUES ($1, $2, $3, $4, 'pending', $5, 0)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .bind(total_files)
        .fetch_one(&self.pool)
        .await?;

        Ok(group)
    }

    /// Get a group by ID
    pub async fn get_group(&self, id: Uuid) -> Result<Option<UploadGroup>, AppError> {
        let group =
            sqlx::query_as::<_, UploadGroup>("SELECT * FROM upload_groups WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(group)
    }

    /// Move a pending group to in_progress when its first session leaves
    /// pending_upload. A no-op once the group has advanced past pending.
    pub async fn mark_in_progress(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_groups
            SET status = 'in_progress', updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count one more completed file, flipping the group to completed exactly
    /// when the counter reaches total_files.
    ///
    /// The guard keeps `completed_files <= total_files` under any concurrency;
    /// callers must only invoke this after winning the per-session
    /// `group_counted` claim, so a session is never counted twice.
    #[tracing::instrument(skip(self), fields(db.table = "upload_groups", db.operation = "update", db.record_id = %id))]
    pub async fn record_file_completed(&self, id: Uuid) -> Result<Option<UploadGroup>, AppError> {
        let group = sqlx::query_as::<_, UploadGroup>(
            r#"
            UPDATE upload_groups
            SET completed_files = completed_files + 1,
                status = CASE
                    WHEN completed_files + 1 >= total_files THEN 'completed'::group_status
                    ELSE 'in_progress'::group_status
                END,
                updated_at = NOW()
            WHERE id = $1
              AND completed_files < total_files
              AND status IN ('pending', 'in_progress')
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }
}
