//! Domain models shared across repositories, services, and the API.

mod analytics;
mod export;
mod file;
mod job_run;
mod receipt;
mod subscription;
mod task;
mod usage;

pub use analytics::{SpendingBucket, SpendingReport, SpendingReportRow};
pub use export::{CombinedItem, ExportFormat, ExportSummary, MergedExport};
pub use file::{FileStatus, NewProcessedFile, ProcessedFile, ProcessedFileResponse};
pub use job_run::{CleanupRun, CleanupRunStatus};
pub use receipt::{Receipt, ReceiptItem};
pub use subscription::{Subscription, Tier};
pub use task::{Task, TaskStatus, TaskType};
pub use usage::UsageLogEntry;
