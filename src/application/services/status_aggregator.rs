use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::application::ports::{RepositoryError, UploadRepository};
use crate::domain::{MergeEffect, OrganizationId, ResponseOutcome, UploadJob, UploadKey};

use super::report_publisher::{ReportError, ReportPublisher};

const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 16;
const CONFLICT_BACKOFF: Duration = Duration::from_millis(15);

/// Merges terminal outcomes into the shared [`UploadJob`] and finalizes it when every
/// record is accounted for.
///
/// Writes are conditional on the version read, and a lost race re-reads and
/// re-applies. Merges are keyed by batch id, so redelivered batches are no-ops and
/// arrival order does not matter.
pub struct StatusAggregator {
    repository: Arc<dyn UploadRepository>,
    publisher: Arc<ReportPublisher>,
    max_conflict_retries: u32,
}

impl StatusAggregator {
    pub fn new(repository: Arc<dyn UploadRepository>, publisher: Arc<ReportPublisher>) -> Self {
        Self {
            repository,
            publisher,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries.max(1);
        self
    }

    #[tracing::instrument(
        skip(self, outcomes),
        fields(upload_key = %upload_key, organization_id = %organization_id, outcomes = outcomes.len())
    )]
    pub async fn merge(
        &self,
        upload_key: &UploadKey,
        organization_id: &OrganizationId,
        batch_id: &str,
        outcomes: &[ResponseOutcome],
    ) -> Result<UploadJob, AggregationError> {
        let skipped = outcomes.iter().filter(|o| o.class.is_retryable()).count();
        if skipped > 0 {
            tracing::warn!(skipped, "Ignoring non-terminal outcomes passed to aggregation");
        }

        for attempt in 1..=self.max_conflict_retries {
            let mut job = self
                .repository
                .get(upload_key, organization_id)
                .await?
                .ok_or_else(|| AggregationError::JobNotFound {
                    upload_key: upload_key.clone(),
                    organization_id: organization_id.clone(),
                })?;

            let expected_version = job.version;
            match job.apply(batch_id, outcomes, Utc::now()) {
                MergeEffect::AlreadyMerged => {
                    tracing::debug!(batch_id, "Outcomes already recorded, skipping");
                    if job.is_finished() {
                        self.publisher.publish(&job).await?;
                    }
                    return Ok(job);
                }
                MergeEffect::Applied {
                    recorded,
                    overflow,
                    finished_now,
                } => {
                    if overflow > 0 {
                        tracing::warn!(overflow, "Outcomes exceed the declared total, clamping");
                    }

                    job.version = expected_version + 1;
                    if self
                        .repository
                        .update_if_version(&job, expected_version)
                        .await?
                    {
                        tracing::info!(
                            recorded,
                            current = job.current,
                            total = job.total,
                            "Outcomes merged"
                        );
                        if finished_now {
                            tracing::info!(total = job.total, "Upload finished");
                            self.publisher.publish(&job).await?;
                        }
                        return Ok(job);
                    }

                    tracing::debug!(attempt, "Version conflict on upload job, retrying merge");
                    tokio::time::sleep(CONFLICT_BACKOFF * attempt).await;
                }
            }
        }

        Err(AggregationError::Conflict {
            attempts: self.max_conflict_retries,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("upload job {upload_key} of {organization_id} not found")]
    JobNotFound {
        upload_key: UploadKey,
        organization_id: OrganizationId,
    },
    #[error("upload job still contended after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("finalization: {0}")]
    Finalization(#[from] ReportError),
}
