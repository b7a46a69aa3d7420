//! Payment-provider subscription webhook.
//!
//! The provider signs the raw request body with a shared secret; the hex
//! HMAC-SHA256 tag arrives in `X-Signature`. Verification runs before the
//! body is parsed. The user id travels in the event's custom metadata, set
//! when the checkout session was created. Events the service does not act
//! on are acknowledged with 200 so the provider does not retry them forever.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reciva_core::models::Tier;
use reciva_core::AppError;
use reciva_db::db::subscriptions::SubscriptionUpdate;
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub meta: WebhookMeta,
    #[serde(default)]
    pub data: Option<SubscriptionData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMeta {
    pub event_name: String,
    pub custom_data: CustomData,
}

#[derive(Debug, Deserialize)]
pub struct CustomData {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: SubscriptionAttributes,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionAttributes {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub renews_at: Option<DateTime<Utc>>,
}

#[utoipa::path(
    post,
    path = "/api/v1/webhooks/subscription",
    tag = "webhooks",
    request_body(content = inline(Object), content_type = "application/json"),
    responses(
        (status = 200, description = "Event received"),
        (status = 400, description = "Unparsable event", body = ErrorResponse),
        (status = 401, description = "Bad signature", body = ErrorResponse)
    )
)]
pub async fn subscription_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    verify_signature(&headers, &body, state.config.webhook_secret.as_bytes())
        .map_err(HttpAppError)?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))?;

    let user_id = event.meta.custom_data.user_id;
    let event_name = event.meta.event_name.as_str();

    tracing::info!(
        event_name = %event_name,
        user_id = %user_id,
        "Subscription webhook received"
    );

    let subscription_id = event.data.as_ref().and_then(|d| d.id.clone());
    let status = event
        .data
        .as_ref()
        .and_then(|d| d.attributes.status.clone());
    let renews_at = event.data.as_ref().and_then(|d| d.attributes.renews_at);

    match event_name {
        "subscription_created" | "subscription_updated" => {
            let active = status.as_deref() == Some("active");
            state
                .db
                .subscription_repository
                .upsert(SubscriptionUpdate {
                    user_id,
                    subscribed: active,
                    tier: if active { Tier::Premium } else { Tier::Freemium },
                    provider_subscription_id: subscription_id,
                    status,
                    renews_at,
                })
                .await?;
        }
        "subscription_cancelled" | "subscription_expired" => {
            state
                .db
                .subscription_repository
                .upsert(SubscriptionUpdate {
                    user_id,
                    subscribed: false,
                    tier: Tier::Freemium,
                    provider_subscription_id: subscription_id,
                    status,
                    renews_at: None,
                })
                .await?;
        }
        "order_created" => {
            // One-off purchases carry no subscription state change.
            tracing::info!(user_id = %user_id, "Order event acknowledged");
        }
        other => {
            tracing::warn!(event_name = %other, "Unhandled webhook event type");
        }
    }

    Ok(Json(serde_json::json!({ "received": true })))
}

fn verify_signature(headers: &HeaderMap, body: &[u8], secret: &[u8]) -> Result<(), AppError> {
    let signature_hex = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;

    let signature = hex::decode(signature_hex)
        .map_err(|_| AppError::Unauthorized("Invalid webhook signature".to_string()))?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .map_err(|_| AppError::Internal("Invalid webhook secret".to_string()))?;
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized("Invalid webhook signature".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"whsec-test";

    fn sign(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn headers_with(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn valid_signature_accepted() {
        let body = br#"{"meta":{"event_name":"subscription_created"}}"#;
        let headers = headers_with(&sign(body));
        assert!(verify_signature(&headers, body, SECRET).is_ok());
    }

    #[test]
    fn tampered_body_rejected() {
        let body = br#"{"meta":{"event_name":"subscription_created"}}"#;
        let headers = headers_with(&sign(body));
        assert!(matches!(
            verify_signature(&headers, b"{}", SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn missing_or_garbage_signature_rejected() {
        let body = b"{}";
        assert!(verify_signature(&HeaderMap::new(), body, SECRET).is_err());
        assert!(verify_signature(&headers_with("zzzz"), body, SECRET).is_err());
    }

    #[test]
    fn event_parses_provider_envelope() {
        let user_id = Uuid::new_v4();
        let raw = format!(
            r#"{{
                "meta": {{
                    "event_name": "subscription_created",
                    "custom_data": {{ "user_id": "{user_id}" }}
                }},
                "data": {{
                    "id": "sub_123",
                    "attributes": {{ "status": "active", "renews_at": "2026-09-24T00:00:00Z" }}
                }}
            }}"#
        );

        let event: WebhookEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(event.meta.event_name, "subscription_created");
        assert_eq!(event.meta.custom_data.user_id, user_id);
        let data = event.data.unwrap();
        assert_eq!(data.id.as_deref(), Some("sub_123"));
        assert_eq!(data.attributes.status.as_deref(), Some("active"));
        assert!(data.attributes.renews_at.is_some());
    }

    #[test]
    fn event_parses_without_data_block() {
        let user_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"meta":{{"event_name":"order_created","custom_data":{{"user_id":"{user_id}"}}}}}}"#
        );

        let event: WebhookEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(event.meta.event_name, "order_created");
        assert!(event.data.is_none());
    }
}
