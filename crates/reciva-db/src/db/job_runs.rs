use chrono::{DateTime, Utc};
use reciva_core::models::{CleanupRun, CleanupRunStatus};
use reciva_core::AppError;
use sqlx::{PgPool, Postgres};

/// Repository for the `cleanup_runs` job log.
#[derive(Clone)]
pub struct CleanupRunRepository {
    pool: PgPool,
}

impl CleanupRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "cleanup_runs", db.operation = "insert"))]
    pub async fn record(
        &self,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        files_deleted: i32,
        objects_deleted: i32,
        status: CleanupRunStatus,
        message: Option<String>,
    ) -> Result<CleanupRun, AppError> {
        let run = sqlx::query_as::<Postgres, CleanupRun>(
            r#"
            INSERT INTO cleanup_runs (started_at, finished_at, files_deleted, objects_deleted, status, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(started_at)
        .bind(finished_at)
        .bind(files_deleted)
        .bind(objects_deleted)
        .bind(status)
        .bind(&message)
        .fetch_one(&self.pool)
        .await?;

        Ok(run)
    }

    #[tracing::instrument(skip(self), fields(db.table = "cleanup_runs", db.operation = "select"))]
    pub async fn recent(&self, limit: i64) -> Result<Vec<CleanupRun>, AppError> {
        let runs = sqlx::query_as::<Postgres, CleanupRun>(
            "SELECT * FROM cleanup_runs ORDER BY started_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(runs)
    }
}
