//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only
//! what they need via Axum's `FromRef`, and to avoid a single god object
//! with duplicate repositories.

use reciva_core::Config;
use reciva_db::{
    AnalyticsRepository, CleanupRunRepository, FileRepository, SubscriptionRepository,
    TaskRepository, UsageRepository,
};
use reciva_services::{AnalyticsService, CleanupService, ReceiptExtractor, Storage};
use reciva_worker::TaskQueue;
use sqlx::PgPool;
use std::sync::Arc;

// ----- Sub-state types -----

/// Database pool and repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub file_repository: FileRepository,
    pub analytics_repository: AnalyticsRepository,
    pub subscription_repository: SubscriptionRepository,
    pub usage_repository: UsageRepository,
    pub cleanup_run_repository: CleanupRunRepository,
    pub task_repository: TaskRepository,
}

/// Storage backend plus the extraction gateway.
#[derive(Clone)]
pub struct ProcessingState {
    pub storage: Arc<dyn Storage>,
    pub extractor: Arc<dyn ReceiptExtractor>,
}

/// Task queue for background work.
#[derive(Clone)]
pub struct TaskState {
    pub task_queue: TaskQueue,
}

// ----- AppState -----

/// Main application state: aggregates sub-states for dependency injection.
pub struct AppState {
    pub db: DbState,
    pub processing: ProcessingState,
    pub tasks: TaskState,
    pub analytics: AnalyticsService,
    pub cleanup: Arc<CleanupService>,
    pub config: Config,
    pub is_production: bool,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ProcessingState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.processing.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for TaskState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.tasks.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
