use reciva_core::models::SpendingBucket;
use reciva_core::AppError;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Per-user mutex for bucket backfills. `pg_advisory_xact_lock` releases at
/// commit or rollback, so a crashed backfill cannot hold the lock.
const BACKFILL_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))";

/// Repository for the `spending_buckets` table.
#[derive(Clone)]
pub struct AnalyticsRepository {
    pool: PgPool,
}

impl AnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fold one receipt into its month/category bucket.
    ///
    /// A single upsert-increment keeps the aggregate exact under concurrent
    /// writers; there is no read-modify-write window.
    #[tracing::instrument(skip(self), fields(db.table = "spending_buckets", db.operation = "upsert"))]
    pub async fn record_receipt(
        &self,
        user_id: Uuid,
        month_year: &str,
        category: &str,
        amount: Decimal,
    ) -> Result<SpendingBucket, AppError> {
        let bucket = sqlx::query_as::<Postgres, SpendingBucket>(
            r#"
            INSERT INTO spending_buckets (user_id, month_year, category, total_amount, transaction_count)
            VALUES ($1, $2, $3, $4, 1)
            ON CONFLICT (user_id, month_year, category)
            DO UPDATE SET
                total_amount = spending_buckets.total_amount + EXCLUDED.total_amount,
                transaction_count = spending_buckets.transaction_count + 1,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(month_year)
        .bind(category)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(bucket)
    }

    /// All of a user's buckets, newest month first then by category, for the
    /// spending report.
    #[tracing::instrument(skip(self), fields(db.table = "spending_buckets", db.operation = "select"))]
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SpendingBucket>, AppError> {
        let buckets = sqlx::query_as::<Postgres, SpendingBucket>(
            "SELECT * FROM spending_buckets WHERE user_id = $1 ORDER BY month_year DESC, category ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(buckets)
    }

    #[tracing::instrument(skip(self), fields(db.table = "spending_buckets", db.operation = "count"))]
    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM spending_buckets WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }

    /// Backfill a user's buckets inside one transaction.
    ///
    /// Concurrent backfills for the same user are serialized by a
    /// transaction-scoped advisory lock, and the bucket count is re-checked
    /// under the lock: a request that loses the race sees the winner's
    /// committed rows and writes nothing, so no bucket is double-counted.
    /// Returns the number of receipts folded in (0 for the loser).
    #[tracing::instrument(skip(self, receipts), fields(db.table = "spending_buckets", db.operation = "backfill"))]
    pub async fn replace_for_user(
        &self,
        user_id: Uuid,
        receipts: &[(String, String, Decimal)],
    ) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(BACKFILL_LOCK_SQL)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let existing: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM spending_buckets WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        if existing.0 > 0 {
            tx.rollback().await?;
            return Ok(0);
        }

        let mut written = 0u64;
        for (month_year, category, amount) in receipts {
            sqlx::query(
                r#"
                INSERT INTO spending_buckets (user_id, month_year, category, total_amount, transaction_count)
                VALUES ($1, $2, $3, $4, 1)
                ON CONFLICT (user_id, month_year, category)
                DO UPDATE SET
                    total_amount = spending_buckets.total_amount + EXCLUDED.total_amount,
                    transaction_count = spending_buckets.transaction_count + 1,
                    updated_at = now()
                "#,
            )
            .bind(user_id)
            .bind(month_year)
            .bind(category)
            .bind(amount)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::BACKFILL_LOCK_SQL;

    #[test]
    fn backfill_lock_is_transaction_scoped_and_keyed_by_user() {
        // The lock must release with the transaction and hash the user id,
        // not a session-level or global lock.
        assert!(BACKFILL_LOCK_SQL.contains("pg_advisory_xact_lock"));
        assert!(BACKFILL_LOCK_SQL.contains("hashtextextended($1::text"));
    }
}
