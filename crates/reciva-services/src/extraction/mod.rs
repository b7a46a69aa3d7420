//! Extraction gateway: thin client for the external OCR/AI service.
//!
//! Forwards file bytes (base64) to the upstream `/process` endpoint and
//! normalizes the response into a [`Receipt`]. The upstream is treated as
//! opaque; nothing here retries, the upload orchestrator treats any failure
//! as fatal to its batch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use reciva_core::constants::{DEFAULT_CATEGORY, EXTRACTION_CONFIDENCE};
use reciva_core::models::{Receipt, ReceiptItem};
use reciva_core::AppError;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

/// Boundary trait so the upload orchestrator can be exercised without a live
/// OCR backend.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    /// Extract a receipt from one file's raw bytes.
    async fn extract(
        &self,
        file_id: Uuid,
        file_name: &str,
        user_id: Uuid,
        data: &[u8],
    ) -> Result<Receipt, AppError>;
}

/// HTTP client for the external extraction service.
pub struct ExtractionService {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExtractionService {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client for extraction service")?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl ReceiptExtractor for ExtractionService {
    async fn extract(
        &self,
        file_id: Uuid,
        file_name: &str,
        user_id: Uuid,
        data: &[u8],
    ) -> Result<Receipt, AppError> {
        let url = format!("{}/process", self.base_url);
        let content_base64 = base64::engine::general_purpose::STANDARD.encode(data);

        let request_body = json!({
            "files": [{
                "file_id": file_id,
                "file_name": file_name,
                "user_id": user_id,
                "content_base64": content_base64,
            }]
        });

        let mut request = self.http_client.post(&url).json(&request_body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Extraction service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(
                status = %status,
                file = %file_name,
                "Extraction service returned an error"
            );
            return Err(AppError::Upstream(format!(
                "Extraction service returned {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::MalformedUpstream(format!("Invalid response body: {}", e)))?;

        normalize_receipt(&body)
    }
}

/// Normalize the upstream response body into a [`Receipt`].
///
/// Takes `receipts[0]`; absent merchant maps to empty string, absent date to
/// today, missing or non-array items to an empty list, and category to the
/// first item's category. The upstream service returns no confidence score,
/// so a fixed placeholder is recorded.
fn normalize_receipt(body: &Value) -> Result<Receipt, AppError> {
    let raw = body
        .get("receipts")
        .and_then(Value::as_array)
        .and_then(|receipts| receipts.first())
        .ok_or_else(|| {
            AppError::MalformedUpstream("Response contains no receipts".to_string())
        })?;

    let items: Vec<ReceiptItem> = raw
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let category = raw
        .get("category")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| items.first().and_then(|item| item.category.clone()))
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let date = raw
        .get("date")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Utc::now().date_naive().to_string());

    let total = match raw.get("total") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    Ok(Receipt {
        merchant: raw
            .get("merchant")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        date,
        total,
        items,
        category,
        confidence: EXTRACTION_CONFIDENCE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn normalizes_full_response() {
        let body = json!({
            "receipts": [{
                "merchant": "Cafe Luna",
                "date": "2024-03-15",
                "total": "24.50",
                "category": "dining",
                "items": [
                    {"description": "Latte", "amount": 5.00, "category": "dining"},
                    {"description": "Sandwich", "amount": 19.50, "category": "dining"}
                ]
            }]
        });

        let receipt = normalize_receipt(&body).unwrap();
        assert_eq!(receipt.merchant, "Cafe Luna");
        assert_eq!(receipt.date, "2024-03-15");
        assert_eq!(receipt.total, "24.50");
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.category, "dining");
        assert_eq!(receipt.confidence, EXTRACTION_CONFIDENCE);
    }

    #[test]
    fn missing_date_defaults_to_today() {
        let body = json!({
            "receipts": [{ "merchant": "Kiosk", "total": "3.00" }]
        });

        let receipt = normalize_receipt(&body).unwrap();
        assert_eq!(receipt.date, Utc::now().date_naive().to_string());
    }

    #[test]
    fn missing_items_defaults_to_empty_list() {
        let body = json!({
            "receipts": [{ "merchant": "Kiosk", "total": "3.00", "items": "garbage" }]
        });

        let receipt = normalize_receipt(&body).unwrap();
        assert!(receipt.items.is_empty());
        assert_eq!(receipt.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn category_falls_back_to_first_item() {
        let body = json!({
            "receipts": [{
                "merchant": "Store",
                "total": "10.00",
                "items": [{"description": "Bread", "amount": 10.00, "category": "groceries"}]
            }]
        });

        let receipt = normalize_receipt(&body).unwrap();
        assert_eq!(receipt.category, "groceries");
        assert_eq!(receipt.items[0].amount, Decimal::new(1000, 2));
    }

    #[test]
    fn numeric_total_is_stringified() {
        let body = json!({
            "receipts": [{ "merchant": "Store", "total": 12.75 }]
        });

        let receipt = normalize_receipt(&body).unwrap();
        assert_eq!(receipt.total, "12.75");
    }

    #[test]
    fn empty_receipts_is_malformed() {
        let body = json!({ "receipts": [] });
        let err = normalize_receipt(&body).unwrap_err();
        assert!(matches!(err, AppError::MalformedUpstream(_)));
    }

    #[test]
    fn missing_receipts_key_is_malformed() {
        let body = json!({ "status": "ok" });
        assert!(matches!(
            normalize_receipt(&body).unwrap_err(),
            AppError::MalformedUpstream(_)
        ));
    }
}
