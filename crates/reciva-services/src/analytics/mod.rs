//! Analytics aggregator: month-by-category spending rollups for premium
//! users, maintained incrementally as receipts complete.

use reciva_core::constants::DEFAULT_CATEGORY;
use reciva_core::models::{ProcessedFile, Receipt, SpendingReport, SpendingReportRow};
use reciva_core::AppError;
use reciva_db::{AnalyticsRepository, FileRepository};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone)]
pub struct AnalyticsService {
    analytics_repository: AnalyticsRepository,
    file_repository: FileRepository,
}

impl AnalyticsService {
    pub fn new(
        analytics_repository: AnalyticsRepository,
        file_repository: FileRepository,
    ) -> Self {
        Self {
            analytics_repository,
            file_repository,
        }
    }

    /// Fold one completed receipt into its spending bucket.
    #[tracing::instrument(skip(self, receipt), fields(user_id = %user_id))]
    pub async fn record_receipt(&self, user_id: Uuid, receipt: &Receipt) -> Result<(), AppError> {
        self.analytics_repository
            .record_receipt(
                user_id,
                receipt.month_year(),
                &receipt.category,
                receipt.total_amount(),
            )
            .await?;
        Ok(())
    }

    /// The user's full spending rollup.
    ///
    /// A user with completed receipts but no buckets (e.g. upgraded to
    /// premium after processing files) gets a one-time backfill computed
    /// from their completed files. Two requests can both observe zero
    /// buckets; the repository serializes the writes per user, so the
    /// second request writes nothing and simply serves the result.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn spending_report(&self, user_id: Uuid) -> Result<SpendingReport, AppError> {
        if self.analytics_repository.count_for_user(user_id).await? == 0 {
            let completed = self.file_repository.list_completed(user_id).await?;
            let inputs = bucket_inputs(&completed);
            if !inputs.is_empty() {
                let written = self
                    .analytics_repository
                    .replace_for_user(user_id, &inputs)
                    .await?;
                if written > 0 {
                    tracing::info!(user_id = %user_id, receipts = written, "Backfilled spending buckets");
                } else {
                    tracing::debug!(user_id = %user_id, "Buckets already backfilled by a concurrent request");
                }
            }
        }

        let rows = self
            .analytics_repository
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(SpendingReportRow::from)
            .collect();

        Ok(SpendingReport { rows })
    }
}

/// Derive (month_year, category, amount) backfill inputs from completed
/// files. Files with no receipt date cannot be bucketed and are skipped.
fn bucket_inputs(files: &[ProcessedFile]) -> Vec<(String, String, Decimal)> {
    files
        .iter()
        .filter_map(|file| {
            let date = file.receipt_date?;
            Some((
                date.format("%Y-%m").to_string(),
                file.category
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                file.total.unwrap_or_default(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use reciva_core::models::FileStatus;

    fn completed_file(
        date: Option<NaiveDate>,
        category: Option<&str>,
        total: Option<Decimal>,
    ) -> ProcessedFile {
        let now = Utc::now();
        ProcessedFile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            storage_key: "receipts/x.jpg".to_string(),
            original_filename: "x.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            file_size: 100,
            status: FileStatus::Completed,
            merchant: Some("Store".to_string()),
            receipt_date: date,
            total,
            item_count: Some(1),
            category: category.map(str::to_string),
            confidence: Some(0.95),
            processed_data: None,
            expires_at: None,
            uploaded_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn backfill_inputs_bucket_by_month_and_category() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();
        let files = vec![completed_file(
            Some(date),
            Some("dining"),
            Some(Decimal::new(1050, 2)),
        )];

        let inputs = bucket_inputs(&files);
        assert_eq!(
            inputs,
            vec![("2026-08".to_string(), "dining".to_string(), Decimal::new(1050, 2))]
        );
    }

    #[test]
    fn dateless_files_are_skipped() {
        let files = vec![completed_file(None, Some("dining"), Some(Decimal::ONE))];
        assert!(bucket_inputs(&files).is_empty());
    }

    #[test]
    fn missing_category_and_total_default() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 20).unwrap();
        let files = vec![completed_file(Some(date), None, None)];

        let inputs = bucket_inputs(&files);
        assert_eq!(inputs[0].1, DEFAULT_CATEGORY);
        assert_eq!(inputs[0].2, Decimal::ZERO);
    }
}
