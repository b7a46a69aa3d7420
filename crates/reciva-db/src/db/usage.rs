use reciva_core::models::UsageLogEntry;
use reciva_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for the append-only `usage_log` table.
#[derive(Clone)]
pub struct UsageRepository {
    pool: PgPool,
}

impl UsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record one successfully processed batch.
    #[tracing::instrument(skip(self), fields(db.table = "usage_log", db.operation = "insert"))]
    pub async fn log_batch(
        &self,
        user_id: Uuid,
        file_count: i32,
    ) -> Result<UsageLogEntry, AppError> {
        let entry = sqlx::query_as::<Postgres, UsageLogEntry>(
            "INSERT INTO usage_log (user_id, file_count) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(file_count)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Lifetime number of files a user has run through processing. Distinct
    /// from the persisted-file count: deleting a file does not refund usage.
    #[tracing::instrument(skip(self), fields(db.table = "usage_log", db.operation = "sum"))]
    pub async fn lifetime_file_count(&self, user_id: Uuid) -> Result<i64, AppError> {
        let total: (Option<i64>,) =
            sqlx::query_as("SELECT SUM(file_count)::BIGINT FROM usage_log WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(total.0.unwrap_or(0))
    }

    #[tracing::instrument(skip(self), fields(db.table = "usage_log", db.operation = "select"))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UsageLogEntry>, AppError> {
        let entries = sqlx::query_as::<Postgres, UsageLogEntry>(
            "SELECT * FROM usage_log WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
