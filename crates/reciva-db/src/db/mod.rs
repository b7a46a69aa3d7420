pub mod analytics;
pub mod files;
pub mod job_runs;
pub mod subscriptions;
pub mod tasks;
pub mod usage;

pub use analytics::AnalyticsRepository;
pub use files::FileRepository;
pub use job_runs::CleanupRunRepository;
pub use subscriptions::SubscriptionRepository;
pub use tasks::TaskRepository;
pub use usage::UsageRepository;
