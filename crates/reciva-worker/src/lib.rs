//! DB-backed task queue for best-effort background work.
//!
//! Tasks are persisted rows; a polling worker pool claims them with
//! `FOR UPDATE SKIP LOCKED` and dispatches through [`TaskHandlerContext`].

pub mod context;
pub mod queue;

pub use context::TaskHandlerContext;
pub use queue::{TaskQueue, TaskQueueConfig};
