use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One row per successfully processed batch, for usage accounting.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UsageLogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_count: i32,
    pub created_at: DateTime<Utc>,
}
