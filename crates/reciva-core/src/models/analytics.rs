use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-user, per-month, per-category running spending aggregate.
///
/// `transaction_count` equals the number of receipts folded into the bucket
/// since creation; `total_amount` is the exact running sum. Both are only
/// ever changed by the atomic upsert-increment in the analytics repository.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SpendingBucket {
    pub id: Uuid,
    pub user_id: Uuid,
    /// "YYYY-MM"
    pub month_year: String,
    pub category: String,
    pub total_amount: Decimal,
    pub transaction_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpendingReportRow {
    pub month_year: String,
    pub category: String,
    pub total_amount: Decimal,
    pub transaction_count: i64,
}

/// Month-by-category rollup served to the analytics dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpendingReport {
    pub rows: Vec<SpendingReportRow>,
}

impl From<SpendingBucket> for SpendingReportRow {
    fn from(bucket: SpendingBucket) -> Self {
        SpendingReportRow {
            month_year: bucket.month_year,
            category: bucket.category,
            total_amount: bucket.total_amount,
            transaction_count: bucket.transaction_count,
        }
    }
}
