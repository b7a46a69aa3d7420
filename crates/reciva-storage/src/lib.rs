//! Storage abstraction for uploaded receipt files.
//!
//! Provides the [`Storage`] trait plus local-filesystem and S3 backends.
//!
//! # Storage key format
//!
//! Keys are user-scoped: `receipts/{user_id}/{timestamp}_{index}_{nonce}.{ext}`.
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use keys::receipt_storage_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
