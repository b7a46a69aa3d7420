//! HTTP request handlers.

pub mod analytics;
pub mod exports;
pub mod files;
pub mod upload;
pub mod usage;
pub mod webhook;
