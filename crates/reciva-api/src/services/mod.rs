//! API-side orchestration services.

pub mod upload;
