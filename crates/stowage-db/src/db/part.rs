use sqlx::PgPool;
use stowage_core::models::UploadPart;
use stowage_core::AppError;
use uuid::Uuid;

/// Repository for the chunks of chunked upload sessions
#[derive(Clone)]
pub struct PartRepository {
    pool: PgPool,
}

impl PartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bulk-create part rows 1..=N for a freshly created chunked session, in
    /// one transaction so the full set exists before any part upload begins.
    #[tracing::instrument(skip(self, sizes), fields(db.table = "upload_parts", db.operation = "insert", db.record_id = %session_id))]
    pub async fn create_parts(&self, session_id: Uuid, sizes: &[u64]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for (index, size) in sizes.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO upload_parts (session_id, part_number, size, status)
                VALUES ($1, $2, $3, 'pending')
                "#,
            )
            .bind(session_id)
            .bind((index + 1) as i32)
            .bind(*size as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// All parts of a session, ordered by part number
    pub async fn get_parts(&self, session_id: Uuid) -> Result<Vec<UploadPart>, AppError> {
        let parts = sqlx::query_as::<_, UploadPart>(
            r#"
            SELECT session_id, part_number, size, etag, status, uploaded_at
            FROM upload_parts
            WHERE session_id = $1
            ORDER BY part_number
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(parts)
    }

    /// Get one part
    pub async fn get_part(
        &self,
        session_id: Uuid,
        part_number: i32,
    ) -> Result<Option<UploadPart>, AppError> {
        let part = sqlx::query_as::<_, UploadPart>(
            r#"
            SELECT session_id, part_number, size, etag, status, uploaded_at
            FROM upload_parts
            WHERE session_id = $1 AND part_number = $2
            "#,
        )
        .bind(session_id)
        .bind(part_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(part)
    }

    /// Mark a part as uploading. Re-marking an uploading part is a no-op so
    /// URL reissues stay idempotent; uploaded parts are left untouched.
    pub async fn mark_uploading(
        &self,
        session_id: Uuid,
        part_number: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_parts
            SET status = 'uploading'
            WHERE session_id = $1 AND part_number = $2 AND status IN ('pending', 'uploading')
            "#,
        )
        .bind(session_id)
        .bind(part_number)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a part's entity tag and uploaded status. Returns whether the
    /// part newly transitioned (false when the tag was already recorded).
    pub async fn record_uploaded(
        &self,
        session_id: Uuid,
        part_number: i32,
        etag: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_parts
            SET status = 'uploaded', etag = $3, uploaded_at = NOW()
            WHERE session_id = $1 AND part_number = $2 AND status <> 'uploaded'
            "#,
        )
        .bind(session_id)
        .bind(part_number)
        .bind(etag)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fail every part that never finished uploading. Uploaded parts keep
    /// their status as historical record.
    pub async fn fail_pending_parts(&self, session_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_parts
            SET status = 'failed'
            WHERE session_id = $1 AND status <> 'uploaded'
            "#,
        )
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
