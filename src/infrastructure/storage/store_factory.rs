use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{BlobStore, BlobStoreError};
use crate::presentation::config::{StorageProviderSetting, StorageSettings};

use super::object_blob_store::ObjectBlobStore;

pub struct BlobStoreFactory;

impl BlobStoreFactory {
    pub fn create(settings: &StorageSettings) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
        match settings.provider {
            StorageProviderSetting::Local => {
                let store = ObjectBlobStore::local(PathBuf::from(&settings.local_path))?;
                Ok(Arc::new(store))
            }
            StorageProviderSetting::Memory => Ok(Arc::new(ObjectBlobStore::in_memory())),
            StorageProviderSetting::Azure => {
                let account = settings.azure_account.as_deref().ok_or_else(|| {
                    BlobStoreError::Configuration("azure_account required".into())
                })?;
                let key = settings.azure_access_key.as_deref().ok_or_else(|| {
                    BlobStoreError::Configuration("azure_access_key required".into())
                })?;
                let container = settings.azure_container.as_deref().ok_or_else(|| {
                    BlobStoreError::Configuration("azure_container required".into())
                })?;
                let timeout = Duration::from_secs(settings.timeout_seconds);
                let store = ObjectBlobStore::azure(account, key, container, timeout)?;
                Ok(Arc::new(store))
            }
        }
    }
}
