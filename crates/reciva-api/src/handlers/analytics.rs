use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, Json};
use reciva_core::models::SpendingReport;
use reciva_services::quota;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/v1/analytics/spending",
    tag = "analytics",
    responses(
        (status = 200, description = "Month-by-category spending rollup", body = SpendingReport),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 402, description = "Analytics requires premium", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn spending_report(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<SpendingReport>, HttpAppError> {
    quota::ensure_analytics_allowed(user.tier)?;

    let report = state.analytics.spending_report(user.user_id).await?;

    Ok(Json(report))
}
