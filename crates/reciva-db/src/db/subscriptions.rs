use chrono::{DateTime, Utc};
use reciva_core::models::{Subscription, Tier};
use reciva_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Fields delivered by the payment-provider webhook.
#[derive(Debug, Clone)]
pub struct SubscriptionUpdate {
    pub user_id: Uuid,
    pub subscribed: bool,
    pub tier: Tier,
    pub provider_subscription_id: Option<String>,
    pub status: Option<String>,
    pub renews_at: Option<DateTime<Utc>>,
}

/// Repository for the `subscriptions` table.
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "select"))]
    pub async fn get(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let row = sqlx::query_as::<Postgres, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// A user with no subscription row is freemium.
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "select"))]
    pub async fn tier_for_user(&self, user_id: Uuid) -> Result<Tier, AppError> {
        let tier: Option<(Tier,)> =
            sqlx::query_as("SELECT tier FROM subscriptions WHERE user_id = $1 AND subscribed")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(tier.map(|t| t.0).unwrap_or(Tier::Freemium))
    }

    /// Apply a webhook event. The webhook is the source of truth, so the
    /// latest event wins unconditionally.
    #[tracing::instrument(skip(self, update), fields(db.table = "subscriptions", db.operation = "upsert"))]
    pub async fn upsert(&self, update: SubscriptionUpdate) -> Result<Subscription, AppError> {
        let row = sqlx::query_as::<Postgres, Subscription>(
            r#"
            INSERT INTO subscriptions (user_id, subscribed, tier, provider_subscription_id, status, renews_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id)
            DO UPDATE SET
                subscribed = EXCLUDED.subscribed,
                tier = EXCLUDED.tier,
                provider_subscription_id = EXCLUDED.provider_subscription_id,
                status = EXCLUDED.status,
                renews_at = EXCLUDED.renews_at,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(update.user_id)
        .bind(update.subscribed)
        .bind(update.tier)
        .bind(&update.provider_subscription_id)
        .bind(&update.status)
        .bind(update.renews_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
