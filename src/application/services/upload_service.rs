use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::application::ports::{
    BlobStore, BlobStoreError, QueueError, RepositoryError, UploadRepository, WorkQueue,
};
use crate::domain::{InputLocation, StoragePath, UploadInput, UploadJob, UploadKey};

use super::chunker::{self, UnitTemplate};
use super::recent_events::RecentEvents;
use super::status_aggregator::{AggregationError, StatusAggregator};
use super::validator;

/// Batch id under which validation rejections are merged.
pub const VALIDATION_BATCH: &str = "validation";

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_chunk_size: usize,
    pub max_input_bytes: u64,
    pub duplicate_event_ttl: Duration,
}

#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Dispatched {
        job: UploadJob,
        units: usize,
        rejected: usize,
    },
    /// A job already exists for this input and was fully dispatched.
    AlreadyAccepted(UploadJob),
    /// The same event was seen moments ago by this instance.
    DuplicateEvent,
}

/// Turns an input document in object storage into an upload job and its work units.
pub struct UploadService {
    blob_store: Arc<dyn BlobStore>,
    repository: Arc<dyn UploadRepository>,
    queue: Arc<dyn WorkQueue>,
    aggregator: Arc<StatusAggregator>,
    recent_events: RecentEvents,
    limits: UploadLimits,
}

impl UploadService {
    pub fn new(
        blob_store: Arc<dyn BlobStore>,
        repository: Arc<dyn UploadRepository>,
        queue: Arc<dyn WorkQueue>,
        aggregator: Arc<StatusAggregator>,
        limits: UploadLimits,
    ) -> Self {
        Self {
            blob_store,
            repository,
            queue,
            aggregator,
            recent_events: RecentEvents::new(limits.duplicate_event_ttl),
            limits,
        }
    }

    pub fn repository(&self) -> &Arc<dyn UploadRepository> {
        &self.repository
    }

    #[tracing::instrument(skip(self), fields(path = %path))]
    pub async fn accept(&self, path: &StoragePath) -> Result<AcceptOutcome, UploadError> {
        let location = path
            .parse_input()
            .ok_or_else(|| UploadError::InvalidPath(path.to_string()))?;

        if !self.recent_events.first_seen(path.as_str()) {
            tracing::debug!("Duplicate event suppressed");
            return Ok(AcceptOutcome::DuplicateEvent);
        }

        let result = self.accept_new(path, location).await;
        if result.is_err() {
            self.recent_events.forget(path.as_str());
        }
        result
    }

    async fn accept_new(
        &self,
        path: &StoragePath,
        location: InputLocation,
    ) -> Result<AcceptOutcome, UploadError> {
        let size = self.blob_store.head(path).await?;
        if size == 0 {
            return Err(UploadError::EmptyInput);
        }
        if size > self.limits.max_input_bytes {
            return Err(UploadError::TooLarge {
                size,
                max: self.limits.max_input_bytes,
            });
        }

        let data = self.blob_store.fetch(path).await?;
        let input =
            UploadInput::from_slice(&data).map_err(|e| UploadError::Malformed(e.to_string()))?;
        if input.is_empty() {
            return Err(UploadError::EmptyInput);
        }

        let operation = input.operation();
        let total = input.len() as u64;
        let validation = validator::validate(input.into_payload());

        let upload_key = UploadKey::new(location.filename.clone());
        let job = UploadJob::new(
            upload_key.clone(),
            location.organization_id.clone(),
            location.broker_id.clone(),
            total,
        );

        let (job, created) = self.repository.create_if_absent(&job).await?;
        if !created {
            if !job.needs_dispatch() {
                tracing::info!(
                    upload_key = %upload_key,
                    current = job.current,
                    total = job.total,
                    "Upload already accepted, not dispatching again"
                );
                return Ok(AcceptOutcome::AlreadyAccepted(job));
            }
            tracing::warn!(
                upload_key = %upload_key,
                "Upload accepted earlier but never fully dispatched, dispatching again"
            );
        }

        let rejected = validation.rejected.len();
        let mut job = if rejected > 0 {
            tracing::info!(rejected, "Recording records rejected by validation");
            self.aggregator
                .merge(
                    &upload_key,
                    &location.organization_id,
                    VALIDATION_BATCH,
                    &validation.rejected,
                )
                .await?
        } else {
            job
        };

        let template = UnitTemplate {
            operation,
            upload_key,
            organization_id: location.organization_id,
            broker_id: location.broker_id,
        };
        let units = chunker::into_work_units(&template, validation.valid, self.limits.max_chunk_size);
        for unit in &units {
            self.queue.enqueue(unit, Duration::ZERO).await?;
        }

        let dispatched_at = Utc::now();
        self.repository
            .mark_dispatched(&template.upload_key, &template.organization_id, dispatched_at)
            .await?;
        job.dispatched_at = job.dispatched_at.or(Some(dispatched_at));

        tracing::info!(
            operation = %operation,
            total,
            rejected,
            units = units.len(),
            "Upload accepted and dispatched"
        );

        Ok(AcceptOutcome::Dispatched {
            job,
            units: units.len(),
            rejected,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("not an upload input path: {0}")]
    InvalidPath(String),
    #[error("input is empty")]
    EmptyInput,
    #[error("input of {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("blob store: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("aggregation: {0}")]
    Aggregation(#[from] AggregationError),
    #[error("queue: {0}")]
    Queue(#[from] QueueError),
}

impl UploadError {
    /// Errors caused by the input itself; retrying the same event cannot help.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            UploadError::InvalidPath(_)
                | UploadError::EmptyInput
                | UploadError::TooLarge { .. }
                | UploadError::Malformed(_)
        )
    }
}
