//! Core types for the Reciva receipt processing service.
//!
//! This crate holds the configuration, the unified error type, the domain
//! models (processed files, receipts, exports, spending buckets,
//! subscriptions, background tasks), and the pre-upload batch validator.
//! It contains no I/O; repositories and services build on top of it.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
