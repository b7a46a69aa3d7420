//! Service initialization and application state setup

use crate::state::{AppState, DbState, ProcessingState, TaskState};
use anyhow::{Context, Result};
use reciva_core::Config;
use reciva_db::{
    AnalyticsRepository, CleanupRunRepository, FileRepository, SubscriptionRepository,
    TaskRepository, UsageRepository,
};
use reciva_services::{AnalyticsService, CleanupService, ExtractionService, ReceiptExtractor, Storage};
use reciva_worker::{TaskHandlerContext, TaskQueue, TaskQueueConfig};
use sqlx::PgPool;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Initialize all services and repositories, returning the application state.
pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let file_repository = FileRepository::new(pool.clone());
    let analytics_repository = AnalyticsRepository::new(pool.clone());
    let subscription_repository = SubscriptionRepository::new(pool.clone());
    let usage_repository = UsageRepository::new(pool.clone());
    let cleanup_run_repository = CleanupRunRepository::new(pool.clone());
    let task_repository = TaskRepository::new(pool.clone());

    let extractor: Arc<dyn ReceiptExtractor> = Arc::new(
        ExtractionService::new(
            config.extraction_base_url.clone(),
            config.extraction_api_key.clone(),
        )
        .context("Failed to initialize extraction service")?,
    );
    tracing::info!(base_url = %config.extraction_base_url, "Extraction gateway initialized");

    let analytics = AnalyticsService::new(analytics_repository.clone(), file_repository.clone());

    let cleanup = Arc::new(CleanupService::new(
        file_repository.clone(),
        cleanup_run_repository.clone(),
        storage.clone(),
        Duration::from_secs(config.cleanup_interval_secs),
    ));

    let task_queue_config = TaskQueueConfig {
        max_workers: config.task_queue_max_workers,
        poll_interval_ms: config.task_queue_poll_interval_ms,
        max_retries: config.task_queue_max_retries,
    };

    let db = DbState {
        pool,
        file_repository,
        analytics_repository,
        subscription_repository,
        usage_repository,
        cleanup_run_repository,
        task_repository: task_repository.clone(),
    };

    let is_production = config.is_production();

    // The worker pool must only hold a weak reference to the state, or the
    // state would never drop; new_cyclic gives the queue that reference while
    // the state is being built.
    let state = Arc::new_cyclic(|weak: &Weak<AppState>| {
        let context: Weak<dyn TaskHandlerContext> = weak.clone();
        let task_queue = TaskQueue::new(task_repository, task_queue_config, context);

        AppState {
            db,
            processing: ProcessingState { storage, extractor },
            tasks: TaskState { task_queue },
            analytics,
            cleanup,
            config: config.clone(),
            is_production,
        }
    });

    // Kick off the periodic expired-file sweep.
    state.cleanup.clone().start();
    tracing::info!(
        interval_secs = config.cleanup_interval_secs,
        retention_days = config.file_retention_days,
        "Cleanup sweep scheduled"
    );

    tracing::info!("All services initialized");

    Ok(state)
}
