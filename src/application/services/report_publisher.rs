use std::sync::Arc;

use bytes::Bytes;

use crate::application::ports::{BlobStore, BlobStoreError};
use crate::domain::{StoragePath, UploadJob, UploadReport};

/// Writes the final report of a finished job next to its input.
pub struct ReportPublisher {
    blob_store: Arc<dyn BlobStore>,
}

impl ReportPublisher {
    pub fn new(blob_store: Arc<dyn BlobStore>) -> Self {
        Self { blob_store }
    }

    /// Overwrites any previous report, so publishing twice is harmless.
    #[tracing::instrument(skip(self, job), fields(upload_key = %job.upload_key, organization_id = %job.organization_id))]
    pub async fn publish(&self, job: &UploadJob) -> Result<StoragePath, ReportError> {
        let report = UploadReport::from_job(job);
        let body = serde_json::to_vec_pretty(&report)
            .map_err(|e| ReportError::Serialization(e.to_string()))?;

        let path = StoragePath::report(
            &job.broker_id,
            &job.organization_id,
            job.upload_key.as_str(),
        );
        let written = self.blob_store.store(&path, Bytes::from(body)).await?;

        tracing::info!(path = %path, bytes = written, "Upload report published");
        Ok(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("blob store: {0}")]
    Store(#[from] BlobStoreError),
}
