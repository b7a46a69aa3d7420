//! Background task dispatch.
//!
//! The worker pool holds a weak reference to [`AppState`] and calls
//! [`TaskHandlerContext::dispatch_task`] for each claimed task.

use crate::state::AppState;
use anyhow::Result;
use async_trait::async_trait;
use reciva_core::models::{Receipt, Task, TaskType};
use reciva_core::AppError;
use reciva_worker::TaskHandlerContext;
use serde_json::json;
use std::sync::Arc;

#[async_trait]
impl TaskHandlerContext for AppState {
    async fn dispatch_task(self: Arc<Self>, task: &Task) -> Result<serde_json::Value> {
        match task.task_type {
            TaskType::AnalyticsUpdate => handle_analytics_update(&self, task).await,
        }
    }
}

/// Fold one receipt into the user's spending buckets.
///
/// A payload that cannot be decoded is unrecoverable; retrying cannot fix a
/// malformed task, so the error is surfaced as such.
async fn handle_analytics_update(state: &AppState, task: &Task) -> Result<serde_json::Value> {
    let receipt: Receipt = task
        .payload
        .get("receipt")
        .cloned()
        .ok_or_else(|| {
            AppError::InvalidInput("Analytics task payload missing receipt".to_string())
        })
        .and_then(|value| {
            serde_json::from_value(value).map_err(|e| {
                AppError::InvalidInput(format!("Analytics task payload invalid: {}", e))
            })
        })?;

    state.analytics.record_receipt(task.user_id, &receipt).await?;

    Ok(json!({
        "month_year": receipt.month_year(),
        "category": receipt.category,
        "amount": receipt.total_amount(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reciva_core::ErrorMetadata;

    #[test]
    fn missing_receipt_payload_is_unrecoverable() {
        let err = AppError::InvalidInput("Analytics task payload missing receipt".to_string());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn receipt_payload_round_trips() {
        let receipt = Receipt {
            merchant: "Store".to_string(),
            date: "2026-08-20".to_string(),
            total: "12.50".to_string(),
            items: vec![],
            category: "groceries".to_string(),
            confidence: 0.95,
        };
        let payload = json!({ "receipt": receipt });
        let decoded: Receipt =
            serde_json::from_value(payload.get("receipt").cloned().unwrap()).unwrap();
        assert_eq!(decoded.merchant, "Store");
        assert_eq!(decoded.month_year(), "2026-08");
    }
}
