use async_trait::async_trait;

use chrono::{DateTime, Utc};

use crate::domain::{OrganizationId, UploadJob, UploadKey};

use super::RepositoryError;

/// Document store holding one [`UploadJob`] per `(upload_key, organization_id)`.
#[async_trait]
pub trait UploadRepository: Send + Sync {
    /// Inserts `job` unless a job with the same key exists. Returns the stored job and
    /// whether this call created it. An existing job is returned untouched.
    async fn create_if_absent(&self, job: &UploadJob) -> Result<(UploadJob, bool), RepositoryError>;

    async fn get(
        &self,
        upload_key: &UploadKey,
        organization_id: &OrganizationId,
    ) -> Result<Option<UploadJob>, RepositoryError>;

    /// Replaces the stored job with `job` only if its stored version is still
    /// `expected_version`. Returns `false` when another writer got there first.
    /// `dispatched_at` and `finished_at` are never cleared by this call.
    async fn update_if_version(
        &self,
        job: &UploadJob,
        expected_version: i64,
    ) -> Result<bool, RepositoryError>;

    /// Records that every work unit of the job is enqueued. Keeps an earlier mark.
    async fn mark_dispatched(
        &self,
        upload_key: &UploadKey,
        organization_id: &OrganizationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}
