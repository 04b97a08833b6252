use bytes::Bytes;

use crate::domain::StoragePath;

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn fetch(&self, path: &StoragePath) -> Result<Bytes, BlobStoreError>;

    async fn store(&self, path: &StoragePath, data: Bytes) -> Result<u64, BlobStoreError>;

    /// Size in bytes of the object at `path`.
    async fn head(&self, path: &StoragePath) -> Result<u64, BlobStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("upload failed: {0}")]
    UploadFailed(String),
    #[error("store configuration: {0}")]
    Configuration(String),
}
