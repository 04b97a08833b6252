use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::{ClientOptions, ObjectStore, PutPayload};

use crate::application::ports::{BlobStore, BlobStoreError};
use crate::domain::StoragePath;

/// [`BlobStore`] over any `object_store` backend.
pub struct ObjectBlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectBlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub fn local(base_path: PathBuf) -> Result<Self, BlobStoreError> {
        std::fs::create_dir_all(&base_path)
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;
        let fs = LocalFileSystem::new_with_prefix(base_path)
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;
        Ok(Self::new(Arc::new(fs)))
    }

    pub fn azure(
        account: &str,
        access_key: &str,
        container: &str,
        timeout: Duration,
    ) -> Result<Self, BlobStoreError> {
        let store = MicrosoftAzureBuilder::new()
            .with_account(account)
            .with_access_key(access_key)
            .with_container_name(container)
            .with_client_options(ClientOptions::new().with_timeout(timeout))
            .build()
            .map_err(|e| BlobStoreError::Configuration(e.to_string()))?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }
}

fn not_found_or(
    path: &StoragePath,
    e: object_store::Error,
    other: fn(String) -> BlobStoreError,
) -> BlobStoreError {
    match e {
        object_store::Error::NotFound { .. } => BlobStoreError::NotFound(path.to_string()),
        e => other(e.to_string()),
    }
}

#[async_trait::async_trait]
impl BlobStore for ObjectBlobStore {
    #[tracing::instrument(skip(self), fields(path = %path))]
    async fn fetch(&self, path: &StoragePath) -> Result<Bytes, BlobStoreError> {
        let store_path = StorePath::from(path.as_str());
        let result = self
            .inner
            .get(&store_path)
            .await
            .map_err(|e| not_found_or(path, e, BlobStoreError::DownloadFailed))?;

        result
            .bytes()
            .await
            .map_err(|e| BlobStoreError::DownloadFailed(e.to_string()))
    }

    #[tracing::instrument(skip(self, data), fields(path = %path, bytes = data.len()))]
    async fn store(&self, path: &StoragePath, data: Bytes) -> Result<u64, BlobStoreError> {
        let store_path = StorePath::from(path.as_str());
        let size = data.len() as u64;
        self.inner
            .put(&store_path, PutPayload::from(data))
            .await
            .map_err(|e| BlobStoreError::UploadFailed(e.to_string()))?;
        Ok(size)
    }

    async fn head(&self, path: &StoragePath) -> Result<u64, BlobStoreError> {
        let store_path = StorePath::from(path.as_str());
        let meta = self
            .inner
            .head(&store_path)
            .await
            .map_err(|e| not_found_or(path, e, BlobStoreError::DownloadFailed))?;
        Ok(meta.size as u64)
    }
}
