use chrono::Utc;
use reciva_core::models::CleanupRunStatus;
use reciva_db::{CleanupRunRepository, FileRepository};
use reciva_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Counters for one sweep of expired files.
#[derive(Debug, Default, Clone, Copy)]
pub struct CleanupStats {
    pub files_deleted: u32,
    pub objects_deleted: u32,
}

/// Periodic sweep that removes expired receipt files from storage and the
/// database, recording each run in the job log.
#[derive(Clone)]
pub struct CleanupService {
    file_repository: FileRepository,
    run_repository: CleanupRunRepository,
    storage: Arc<dyn Storage>,
    sweep_interval: Duration,
}

impl CleanupService {
    pub fn new(
        file_repository: FileRepository,
        run_repository: CleanupRunRepository,
        storage: Arc<dyn Storage>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            file_repository,
            run_repository,
            storage,
            sweep_interval,
        }
    }

    /// Start the background sweep loop.
    /// Returns a JoinHandle for graceful shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.sweep_interval);

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled cleanup of expired files");

                match self.run_once().await {
                    Ok(stats) => {
                        tracing::info!(
                            files_deleted = stats.files_deleted,
                            objects_deleted = stats.objects_deleted,
                            "Cleanup run completed"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Cleanup run failed");
                    }
                }
            }
        })
    }

    /// Execute one sweep. Storage deletion failures are logged and the row
    /// is deleted anyway so a flaky backend cannot pin expired data forever;
    /// re-deleting an already-gone object is a no-op, so reruns are safe.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_files"))]
    pub async fn run_once(&self) -> Result<CleanupStats, anyhow::Error> {
        let started_at = Utc::now();
        let mut stats = CleanupStats::default();

        let result = self.sweep_expired(&mut stats).await;

        let (status, message) = match &result {
            Ok(()) => (CleanupRunStatus::Completed, None),
            Err(e) => (CleanupRunStatus::Failed, Some(e.to_string())),
        };

        if let Err(e) = self
            .run_repository
            .record(
                started_at,
                Utc::now(),
                stats.files_deleted as i32,
                stats.objects_deleted as i32,
                status,
                message,
            )
            .await
        {
            tracing::error!(error = %e, "Failed to record cleanup run");
        }

        result.map(|()| stats)
    }

    async fn sweep_expired(&self, stats: &mut CleanupStats) -> Result<(), anyhow::Error> {
        let expired = self.file_repository.get_expired().await?;

        for file in expired {
            tracing::info!(
                file_id = %file.id,
                storage_key = %file.storage_key,
                expires_at = ?file.expires_at,
                "Deleting expired file"
            );

            match self.storage.delete(&file.storage_key).await {
                Ok(()) => {
                    stats.objects_deleted += 1;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        storage_key = %file.storage_key,
                        "Failed to delete object from storage, continuing with database deletion"
                    );
                }
            }

            if self.file_repository.delete_row(file.id).await? {
                stats.files_deleted += 1;
            }
        }

        Ok(())
    }
}
