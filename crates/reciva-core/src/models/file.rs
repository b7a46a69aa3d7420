use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of an uploaded receipt file.
///
/// The only valid transitions are `Processing -> Completed` and
/// `Processing -> Failed`; repositories enforce this in their UPDATE
/// predicates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processing,
    Completed,
    Failed,
}

impl Display for FileStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileStatus::Processing => write!(f, "processing"),
            FileStatus::Completed => write!(f, "completed"),
            FileStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for FileStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(FileStatus::Processing),
            "completed" => Ok(FileStatus::Completed),
            "failed" => Ok(FileStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid file status: {}", s)),
        }
    }
}

/// A persisted uploaded receipt file and its extraction result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProcessedFile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub storage_key: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub status: FileStatus,
    pub merchant: Option<String>,
    pub receipt_date: Option<NaiveDate>,
    pub total: Option<Decimal>,
    pub item_count: Option<i32>,
    pub category: Option<String>,
    pub confidence: Option<f64>,
    /// Full normalized receipt as returned by the extraction gateway.
    pub processed_data: Option<serde_json::Value>,
    pub expires_at: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a fresh `processing` row at upload time.
#[derive(Debug, Clone)]
pub struct NewProcessedFile {
    pub user_id: Uuid,
    pub storage_key: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessedFileResponse {
    pub id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ProcessedFile> for ProcessedFileResponse {
    fn from(file: ProcessedFile) -> Self {
        ProcessedFileResponse {
            id: file.id,
            filename: file.original_filename,
            file_size: file.file_size,
            status: file.status,
            merchant: file.merchant,
            receipt_date: file.receipt_date,
            total: file.total,
            item_count: file.item_count,
            category: file.category,
            confidence: file.confidence,
            uploaded_at: file.uploaded_at,
            expires_at: file.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            FileStatus::Processing,
            FileStatus::Completed,
            FileStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<FileStatus>().unwrap(), status);
        }
        assert!("deleted".parse::<FileStatus>().is_err());
    }

    #[test]
    fn response_hides_internal_fields() {
        let now = Utc::now();
        let file = ProcessedFile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            storage_key: "receipts/abc.jpg".to_string(),
            original_filename: "lunch.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            file_size: 1234,
            status: FileStatus::Completed,
            merchant: Some("Cafe Luna".to_string()),
            receipt_date: None,
            total: Some(Decimal::new(1050, 2)),
            item_count: Some(2),
            category: Some("dining".to_string()),
            confidence: Some(0.95),
            processed_data: None,
            expires_at: None,
            uploaded_at: now,
            updated_at: now,
        };

        let response = ProcessedFileResponse::from(file);
        assert_eq!(response.filename, "lunch.jpg");
        assert_eq!(response.status, FileStatus::Completed);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("storage_key").is_none());
        assert!(json.get("user_id").is_none());
    }
}
