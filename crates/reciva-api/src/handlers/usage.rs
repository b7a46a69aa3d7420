use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use reciva_core::constants::FREEMIUM_FILE_LIMIT;
use reciva_core::models::Tier;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct UsageResponse {
    pub tier: Tier,
    /// Lifetime count of files run through processing; deletes do not
    /// refund it.
    pub files_processed: i64,
    /// Files currently persisted; this is what the freemium cap checks.
    pub files_stored: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/usage",
    tag = "usage",
    responses(
        (status = 200, description = "Current usage and quota", body = UsageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<UsageResponse>, HttpAppError> {
    let files_processed = state
        .db
        .usage_repository
        .lifetime_file_count(user.user_id)
        .await?;
    let files_stored = state.db.file_repository.count_for_user(user.user_id).await?;

    let file_limit = match user.tier {
        Tier::Freemium => Some(FREEMIUM_FILE_LIMIT),
        Tier::Premium => None,
    };

    Ok(Json(UsageResponse {
        tier: user.tier,
        files_processed,
        files_stored,
        file_limit,
    }))
}
