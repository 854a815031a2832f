//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use async_trait::async_trait;
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

    #[error("Move failed: {0}")]
    MoveFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Backends hold the content of media files under string keys. The media services only
/// need to look content up and relocate it; uploads are handled elsewhere.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write data to a specific storage key, replacing any existing content
    async fn upload_with_key(&self, storage_key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Download a file by its storage key
    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Deleting a missing key succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Copy a file from one key to another
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// Move a file from one key to another; the source no longer exists afterwards
    async fn rename(&self, from_key: &str, to_key: &str) -> StorageResult<()>;
}

impl From<StorageError> for vellum_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                vellum_core::AppError::NotFound(format!("Stored file {} not found", key))
            }
            other => vellum_core::AppError::Storage(other.to_string()),
        }
    }
}
