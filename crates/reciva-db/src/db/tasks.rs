use chrono::{DateTime, Utc};
use reciva_core::models::{Task, TaskType};
use reciva_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for the `tasks` queue table.
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, payload), fields(db.table = "tasks", db.operation = "insert"))]
    pub async fn create(
        &self,
        user_id: Uuid,
        task_type: TaskType,
        payload: serde_json::Value,
        max_retries: i32,
    ) -> Result<Task, AppError> {
        let task = sqlx::query_as::<Postgres, Task>(
            r#"
            INSERT INTO tasks (user_id, task_type, payload, max_retries)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(task_type)
        .bind(&payload)
        .bind(max_retries)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    /// Claim the oldest due task, if any.
    ///
    /// `FOR UPDATE SKIP LOCKED` lets concurrent workers race on the same
    /// table without blocking or double-claiming.
    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "claim"))]
    pub async fn claim_next(&self) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<Postgres, Task>(
            r#"
            UPDATE tasks
            SET status = 'running', updated_at = now()
            WHERE id = (
                SELECT id FROM tasks
                WHERE status IN ('pending', 'scheduled') AND scheduled_at <= now()
                ORDER BY created_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    #[tracing::instrument(skip(self, result), fields(db.table = "tasks", db.operation = "update"))]
    pub async fn mark_completed(
        &self,
        id: Uuid,
        result: Option<serde_json::Value>,
    ) -> Result<bool, AppError> {
        let outcome = sqlx::query(
            "UPDATE tasks SET status = 'completed', result = $2, updated_at = now() WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(&result)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "update"))]
    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<bool, AppError> {
        let outcome = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'failed',
                result = jsonb_build_object('error', $2::text),
                updated_at = now()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    /// Push a failed attempt back onto the queue with a later due time.
    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "update"))]
    pub async fn reschedule(
        &self,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let outcome = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'scheduled',
                retry_count = retry_count + 1,
                scheduled_at = $2,
                updated_at = now()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(scheduled_at)
        .execute(&self.pool)
        .await?;

        Ok(outcome.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tasks", db.operation = "select"))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<Postgres, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }
}
