//! Batch upload orchestrator.
//!
//! Runs the synchronous receipt pipeline: validate the batch, persist every
//! file to storage with a `processing` row, then extract each file in batch
//! order. The first extraction failure marks the current file `failed` and
//! aborts the whole request; rows already completed stay completed, and
//! later rows remain `processing` until they expire and are swept.
//!
//! Progress checkpoints are logged per phase: upload scales to 40%, then
//! extraction runs 50% to 90%, and 100% marks the merged response ready.

use crate::error::HttpAppError;
use crate::state::AppState;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use reciva_core::models::{
    MergedExport, NewProcessedFile, ProcessedFile, ProcessedFileResponse, Receipt, Tier, TaskType,
};
use reciva_core::validation::{validate_batch, CandidateFile};
use reciva_db::db::files::ExtractionOutcome;
use reciva_db::{FileRepository, UsageRepository};
use reciva_services::{merge_receipts, ReceiptExtractor, Storage};
use reciva_storage::receipt_storage_key;
use reciva_worker::TaskQueue;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const UPLOAD_PHASE_PERCENT: u32 = 40;
const EXTRACTION_START_PERCENT: u32 = 50;
const EXTRACTION_END_PERCENT: u32 = 90;

/// Observer for batch progress. Reported values are monotonically
/// non-decreasing within one invocation of
/// [`UploadOrchestrator::process_batch`].
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u32);
}

/// Default sink: progress goes to the log stream.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, percent: u32) {
        tracing::debug!(progress = percent, "Batch progress");
    }
}

/// Sink backed by a tokio watch channel, for callers that surface progress
/// (polling endpoints, tests).
pub struct WatchProgress(tokio::sync::watch::Sender<u32>);

impl WatchProgress {
    pub fn new() -> (Self, tokio::sync::watch::Receiver<u32>) {
        let (tx, rx) = tokio::sync::watch::channel(0);
        (Self(tx), rx)
    }
}

impl ProgressSink for WatchProgress {
    fn report(&self, percent: u32) {
        let _ = self.0.send(percent);
    }
}

fn upload_progress(index: usize, total: usize) -> u32 {
    (index as u32 + 1) * UPLOAD_PHASE_PERCENT / total as u32
}

fn extraction_progress(index: usize, total: usize) -> u32 {
    EXTRACTION_START_PERCENT
        + (index as u32 + 1) * (EXTRACTION_END_PERCENT - EXTRACTION_START_PERCENT) / total as u32
}

/// One file pulled out of the multipart request.
pub struct UploadedPart {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Everything the process endpoint returns for one batch.
pub struct BatchResult {
    pub files: Vec<ProcessedFileResponse>,
    pub receipts: Vec<Receipt>,
    pub merged: MergedExport,
}

pub struct UploadOrchestrator {
    file_repository: FileRepository,
    usage_repository: UsageRepository,
    storage: Arc<dyn Storage>,
    extractor: Arc<dyn ReceiptExtractor>,
    task_queue: TaskQueue,
    retention_days: i64,
    progress: Arc<dyn ProgressSink>,
}

impl UploadOrchestrator {
    pub fn new(state: &AppState) -> Self {
        Self {
            file_repository: state.db.file_repository.clone(),
            usage_repository: state.db.usage_repository.clone(),
            storage: state.processing.storage.clone(),
            extractor: state.processing.extractor.clone(),
            task_queue: state.tasks.task_queue.clone(),
            retention_days: state.config.file_retention_days,
            progress: Arc::new(LogProgress),
        }
    }

    /// Replace the progress sink. Used by callers that expose progress to
    /// the client instead of only logging it.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Process one upload batch end to end.
    #[tracing::instrument(skip(self, parts), fields(user_id = %user_id, batch_size = parts.len()))]
    pub async fn process_batch(
        &self,
        user_id: Uuid,
        tier: Tier,
        parts: Vec<UploadedPart>,
    ) -> Result<BatchResult, HttpAppError> {
        let candidates: Vec<CandidateFile> = parts
            .iter()
            .map(|part| CandidateFile {
                filename: part.filename.clone(),
                content_type: part.content_type.clone(),
                size: part.data.len(),
            })
            .collect();

        // The persisted-file count is the authoritative quota source; the
        // client-supplied count is never trusted.
        let current_count = self.file_repository.count_for_user(user_id).await?;
        validate_batch(&candidates, tier, current_count)?;

        // Premium files are kept permanently; freemium files expire and are
        // picked up by the cleanup sweep.
        let expires_at = if tier.is_premium() {
            None
        } else {
            Some(Utc::now() + ChronoDuration::days(self.retention_days))
        };

        let total = parts.len();
        let mut rows = Vec::with_capacity(total);

        for (index, part) in parts.iter().enumerate() {
            let storage_key = receipt_storage_key(user_id, index, &part.filename);
            self.storage
                .upload_with_key(&storage_key, part.data.clone(), &part.content_type)
                .await?;

            let row = self
                .file_repository
                .create(NewProcessedFile {
                    user_id,
                    storage_key,
                    original_filename: part.filename.clone(),
                    content_type: part.content_type.clone(),
                    file_size: part.data.len() as i64,
                    expires_at,
                })
                .await?;

            tracing::debug!(file_id = %row.id, "File stored");
            self.progress.report(upload_progress(index, total));
            rows.push(row);
        }

        tracing::info!("Batch stored, starting extraction");
        self.progress.report(EXTRACTION_START_PERCENT);

        let mut completed = Vec::with_capacity(total);
        let mut receipts = Vec::with_capacity(total);

        for (index, row) in rows.into_iter().enumerate() {
            let receipt = match self.extract_one(user_id, &row).await {
                Ok(receipt) => receipt,
                Err(err) => {
                    // First failure aborts the batch; already-completed rows
                    // are left intact.
                    if let Err(mark_err) = self.file_repository.mark_failed(row.id).await {
                        tracing::error!(
                            error = %mark_err,
                            file_id = %row.id,
                            "Failed to mark file as failed"
                        );
                    }
                    return Err(HttpAppError(err));
                }
            };

            let updated = self
                .file_repository
                .mark_completed(row.id, outcome_from_receipt(&receipt)?)
                .await?;

            tracing::debug!(file_id = %updated.id, "File extracted");
            self.progress.report(extraction_progress(index, total));

            completed.push(updated);
            receipts.push(receipt);
        }

        if tier.is_premium() {
            self.submit_analytics_tasks(user_id, &completed, &receipts)
                .await;
        }

        // Usage accounting is best-effort; quota enforcement reads the
        // persisted-file count, not this log.
        if let Err(err) = self
            .usage_repository
            .log_batch(user_id, total as i32)
            .await
        {
            tracing::error!(error = %err, user_id = %user_id, "Failed to record batch usage");
        }

        let named: Vec<(String, Receipt)> = completed
            .iter()
            .zip(receipts.iter())
            .map(|(file, receipt)| (file.original_filename.clone(), receipt.clone()))
            .collect();
        let merged = merge_receipts(&named);

        self.progress.report(100);
        tracing::info!(files = total, "Batch processed");

        Ok(BatchResult {
            files: completed.into_iter().map(ProcessedFileResponse::from).collect(),
            receipts,
            merged,
        })
    }

    /// Download the stored object and run it through the extraction gateway.
    /// Reading back from storage rather than reusing the request buffer also
    /// verifies the object actually landed.
    async fn extract_one(
        &self,
        user_id: Uuid,
        row: &ProcessedFile,
    ) -> Result<Receipt, reciva_core::AppError> {
        let data = self
            .storage
            .download(&row.storage_key)
            .await
            .map_err(|e| reciva_core::AppError::Storage(e.to_string()))?;

        self.extractor
            .extract(row.id, &row.original_filename, user_id, &data)
            .await
    }

    /// Queue one analytics rollup task per completed receipt. Submission
    /// failures are logged and swallowed: analytics lags behind rather than
    /// failing an already-processed batch.
    async fn submit_analytics_tasks(
        &self,
        user_id: Uuid,
        completed: &[ProcessedFile],
        receipts: &[Receipt],
    ) {
        for (file, receipt) in completed.iter().zip(receipts.iter()) {
            let payload = json!({
                "file_id": file.id,
                "receipt": receipt,
            });

            if let Err(err) = self
                .task_queue
                .submit_task(user_id, TaskType::AnalyticsUpdate, payload)
                .await
            {
                tracing::error!(
                    error = %err,
                    file_id = %file.id,
                    "Failed to queue analytics update"
                );
            }
        }
    }
}

fn outcome_from_receipt(receipt: &Receipt) -> Result<ExtractionOutcome, reciva_core::AppError> {
    Ok(ExtractionOutcome {
        merchant: receipt.merchant.clone(),
        receipt_date: NaiveDate::parse_from_str(&receipt.date, "%Y-%m-%d").ok(),
        total: Some(receipt.total_amount()),
        item_count: receipt.items.len() as i32,
        category: receipt.category.clone(),
        confidence: receipt.confidence,
        processed_data: serde_json::to_value(receipt)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(date: &str, total: &str) -> Receipt {
        Receipt {
            merchant: "Store".to_string(),
            date: date.to_string(),
            total: total.to_string(),
            items: vec![],
            category: "groceries".to_string(),
            confidence: 0.95,
        }
    }

    #[test]
    fn outcome_parses_iso_date() {
        let outcome = outcome_from_receipt(&receipt("2026-08-20", "12.50")).unwrap();
        assert_eq!(
            outcome.receipt_date,
            NaiveDate::from_ymd_opt(2026, 8, 20)
        );
        assert_eq!(outcome.total, Some(rust_decimal::Decimal::new(1250, 2)));
        assert_eq!(outcome.item_count, 0);
    }

    #[test]
    fn outcome_tolerates_unparsable_date_and_total() {
        let outcome = outcome_from_receipt(&receipt("sometime", "n/a")).unwrap();
        assert_eq!(outcome.receipt_date, None);
        assert_eq!(outcome.total, Some(rust_decimal::Decimal::ZERO));
    }

    #[test]
    fn outcome_keeps_full_receipt_json() {
        let outcome = outcome_from_receipt(&receipt("2026-08-20", "12.50")).unwrap();
        assert_eq!(outcome.processed_data["merchant"], "Store");
        assert_eq!(outcome.processed_data["total"], "12.50");
    }

    #[test]
    fn progress_is_monotonic_for_any_batch_size() {
        for total in 1..=10 {
            let mut sequence = Vec::new();
            for index in 0..total {
                sequence.push(upload_progress(index, total));
            }
            sequence.push(EXTRACTION_START_PERCENT);
            for index in 0..total {
                sequence.push(extraction_progress(index, total));
            }
            sequence.push(100);

            assert!(
                sequence.windows(2).all(|pair| pair[0] <= pair[1]),
                "non-monotonic progress for batch of {}: {:?}",
                total,
                sequence
            );
            assert_eq!(sequence.last(), Some(&100));
        }
    }

    #[test]
    fn upload_phase_tops_out_at_forty_percent() {
        assert_eq!(upload_progress(9, 10), UPLOAD_PHASE_PERCENT);
        assert_eq!(upload_progress(0, 1), UPLOAD_PHASE_PERCENT);
    }

    #[tokio::test]
    async fn watch_sink_delivers_latest_progress() {
        let (sink, rx) = WatchProgress::new();
        sink.report(40);
        sink.report(90);
        assert_eq!(*rx.borrow(), 90);
    }
}
