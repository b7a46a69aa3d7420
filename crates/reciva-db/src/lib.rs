//! Database repositories for the Reciva data access layer.
//!
//! Each repository owns a single domain table and provides the queries the
//! services need; no SQL leaks outside this crate.

pub mod db;

pub use db::{
    AnalyticsRepository, CleanupRunRepository, FileRepository, SubscriptionRepository,
    TaskRepository, UsageRepository,
};
