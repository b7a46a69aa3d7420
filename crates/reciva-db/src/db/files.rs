use chrono::{DateTime, NaiveDate, Utc};
use reciva_core::models::{NewProcessedFile, ProcessedFile};
use reciva_core::AppError;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Extracted fields written when a file reaches `completed`.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub merchant: String,
    pub receipt_date: Option<NaiveDate>,
    pub total: Option<Decimal>,
    pub item_count: i32,
    pub category: String,
    pub confidence: f64,
    pub processed_data: serde_json::Value,
}

/// Repository for the `processed_files` table.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, file), fields(db.table = "processed_files", db.operation = "insert"))]
    pub async fn create(&self, file: NewProcessedFile) -> Result<ProcessedFile, AppError> {
        let row = sqlx::query_as::<Postgres, ProcessedFile>(
            r#"
            INSERT INTO processed_files (
                user_id, storage_key, original_filename, content_type,
                file_size, status, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, 'processing', $6)
            RETURNING *
            "#,
        )
        .bind(file.user_id)
        .bind(&file.storage_key)
        .bind(&file.original_filename)
        .bind(&file.content_type)
        .bind(file.file_size)
        .bind(file.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "select"))]
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Option<ProcessedFile>, AppError> {
        let row = sqlx::query_as::<Postgres, ProcessedFile>(
            "SELECT * FROM processed_files WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "select"))]
    pub async fn list(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProcessedFile>, AppError> {
        let rows = sqlx::query_as::<Postgres, ProcessedFile>(
            "SELECT * FROM processed_files WHERE user_id = $1 ORDER BY uploaded_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lifetime count of a user's persisted files. Always read fresh — the
    /// quota policy tolerates concurrent sessions by re-counting rather
    /// than accumulating client-side.
    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "count"))]
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM processed_files WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }

    /// Move a `processing` row to `completed` with its extracted fields.
    /// The status predicate enforces the only legal transition; a row in
    /// any other state is untouched and reported as not found.
    #[tracing::instrument(skip(self, outcome), fields(db.table = "processed_files", db.operation = "update"))]
    pub async fn mark_completed(
        &self,
        id: Uuid,
        outcome: ExtractionOutcome,
    ) -> Result<ProcessedFile, AppError> {
        let row = sqlx::query_as::<Postgres, ProcessedFile>(
            r#"
            UPDATE processed_files
            SET status = 'completed',
                merchant = $2,
                receipt_date = $3,
                total = $4,
                item_count = $5,
                category = $6,
                confidence = $7,
                processed_data = $8,
                updated_at = now()
            WHERE id = $1 AND status = 'processing'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&outcome.merchant)
        .bind(outcome.receipt_date)
        .bind(outcome.total)
        .bind(outcome.item_count)
        .bind(&outcome.category)
        .bind(outcome.confidence)
        .bind(&outcome.processed_data)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| {
            AppError::NotFound(format!("Processed file {} not in processing state", id))
        })
    }

    /// Move a `processing` row to `failed`. Same transition guard as
    /// [`mark_completed`](Self::mark_completed).
    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "update"))]
    pub async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE processed_files SET status = 'failed', updated_at = now() WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "delete"))]
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<Option<ProcessedFile>, AppError> {
        let row = sqlx::query_as::<Postgres, ProcessedFile>(
            "DELETE FROM processed_files WHERE user_id = $1 AND id = $2 RETURNING *",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// All rows whose expiration timestamp has passed, for the cleanup sweep.
    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "select"))]
    pub async fn get_expired(&self) -> Result<Vec<ProcessedFile>, AppError> {
        let rows = sqlx::query_as::<Postgres, ProcessedFile>(
            "SELECT * FROM processed_files WHERE expires_at IS NOT NULL AND expires_at < now()",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Unscoped delete by id, used by the cleanup sweep after the backing
    /// storage object is gone.
    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "delete"))]
    pub async fn delete_row(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM processed_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// A user's completed rows with extraction data, oldest first. Used by
    /// the analytics backfill.
    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "select"))]
    pub async fn list_completed(&self, user_id: Uuid) -> Result<Vec<ProcessedFile>, AppError> {
        let rows = sqlx::query_as::<Postgres, ProcessedFile>(
            "SELECT * FROM processed_files WHERE user_id = $1 AND status = 'completed' ORDER BY uploaded_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Expose an ignored-status timestamp bump; used by tests and admin
    /// tooling to simulate expiry.
    #[tracing::instrument(skip(self), fields(db.table = "processed_files", db.operation = "update"))]
    pub async fn set_expires_at(
        &self,
        id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE processed_files SET expires_at = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(expires_at)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
