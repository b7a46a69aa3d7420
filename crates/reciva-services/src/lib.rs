//! Reciva business service layer.
//!
//! Hosts the domain services between the HTTP surface and the repositories:
//! receipt extraction, export rendering, spending analytics, quota policy,
//! and the expired-file cleanup sweep. Keep business logic and coordination
//! here; keep thin HTTP handling in reciva-api.

pub mod analytics;
pub mod cleanup;
pub mod export;
pub mod extraction;
pub mod quota;

pub use analytics::AnalyticsService;
pub use cleanup::CleanupService;
pub use export::{merge_receipts, render, ExportArtifact};
pub use extraction::{ExtractionService, ReceiptExtractor};
pub use reciva_storage::{create_storage, Storage, StorageError, StorageResult};
