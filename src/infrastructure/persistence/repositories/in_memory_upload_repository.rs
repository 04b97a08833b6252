use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::ports::{RepositoryError, UploadRepository};
use crate::domain::{OrganizationId, UploadJob, UploadKey};

type JobKey = (OrganizationId, UploadKey);

/// Process-local document store with the same conditional-write semantics as the
/// Postgres repository. Used for local runs and tests.
#[derive(Default)]
pub struct InMemoryUploadRepository {
    jobs: Mutex<HashMap<JobKey, UploadJob>>,
}

impl InMemoryUploadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobKey, UploadJob>> {
        match self.jobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl UploadRepository for InMemoryUploadRepository {
    async fn create_if_absent(&self, job: &UploadJob) -> Result<(UploadJob, bool), RepositoryError> {
        let mut jobs = self.lock();
        let key = (job.organization_id.clone(), job.upload_key.clone());
        if let Some(existing) = jobs.get(&key) {
            return Ok((existing.clone(), false));
        }
        jobs.insert(key, job.clone());
        Ok((job.clone(), true))
    }

    async fn get(
        &self,
        upload_key: &UploadKey,
        organization_id: &OrganizationId,
    ) -> Result<Option<UploadJob>, RepositoryError> {
        let key = (organization_id.clone(), upload_key.clone());
        Ok(self.lock().get(&key).cloned())
    }

    async fn update_if_version(
        &self,
        job: &UploadJob,
        expected_version: i64,
    ) -> Result<bool, RepositoryError> {
        let mut jobs = self.lock();
        let key = (job.organization_id.clone(), job.upload_key.clone());
        match jobs.get_mut(&key) {
            Some(stored) if stored.version == expected_version => {
                let dispatched_at = stored.dispatched_at.or(job.dispatched_at);
                let finished_at = stored.finished_at.or(job.finished_at);
                *stored = job.clone();
                stored.dispatched_at = dispatched_at;
                stored.finished_at = finished_at;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound(job.upload_key.to_string())),
        }
    }

    async fn mark_dispatched(
        &self,
        upload_key: &UploadKey,
        organization_id: &OrganizationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let key = (organization_id.clone(), upload_key.clone());
        match self.lock().get_mut(&key) {
            Some(stored) => {
                if stored.dispatched_at.is_none() {
                    stored.dispatched_at = Some(at);
                }
                Ok(())
            }
            None => Err(RepositoryError::NotFound(upload_key.to_string())),
        }
    }
}
