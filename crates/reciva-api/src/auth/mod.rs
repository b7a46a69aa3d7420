//! Request authentication.
//!
//! Every protected route extracts a [`UserContext`]: the bearer token is
//! verified against the signing secret, then the user's current tier is read
//! fresh from the subscriptions table. Tier is never trusted from the client
//! because it can change asynchronously via the subscription webhook.

pub mod token;

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reciva_core::models::Tier;
use reciva_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Request-scoped identity: the authenticated user and their current tier.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    pub user_id: Uuid,
    pub tier: Tier,
}

impl FromRequestParts<Arc<AppState>> for UserContext {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized(
                    "Missing Authorization header".to_string(),
                ))
            })?;

        let bearer = header.strip_prefix("Bearer ").ok_or_else(|| {
            HttpAppError(AppError::Unauthorized(
                "Authorization header must be a bearer token".to_string(),
            ))
        })?;

        let user_id = token::verify(bearer, state.config.token_secret.as_bytes())
            .map_err(HttpAppError)?;

        let tier = state
            .db
            .subscription_repository
            .tier_for_user(user_id)
            .await
            .map_err(HttpAppError)?;

        Ok(UserContext { user_id, tier })
    }
}
