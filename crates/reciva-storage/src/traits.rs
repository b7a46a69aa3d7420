//! Storage abstraction trait implemented by every backend.

use async_trait::async_trait;
use reciva_core::config::StorageBackendKind;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend-neutral object store for receipt files.
///
/// Keys are produced by [`crate::keys::receipt_storage_key`] and treated as
/// opaque by callers; the same key layout is used on every backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `storage_key`, replacing any existing object.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Read the full object at `storage_key`.
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete the object at `storage_key`. Deleting a missing object is not
    /// an error; the sweep relies on this being idempotent.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if an object exists.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Size in bytes of the object, if it exists.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Which backend this is.
    fn backend_type(&self) -> StorageBackendKind;
}
