use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::Instrument;

use crate::application::ports::{Delivery, QueueError, WorkQueue};
use crate::domain::{OutcomeClass, ResponseOutcome, WorkUnit};

use super::retry_scheduler::RetryScheduler;
use super::status_aggregator::{AggregationError, StatusAggregator};
use super::submission_orchestrator::SubmissionOrchestrator;

/// Consumes work units: submit, schedule retries, merge what is final, then ack.
///
/// A unit is acknowledged only after its retry is enqueued and its terminal outcomes
/// are merged. Anything failing in between leaves the delivery to time out and come
/// back, which the aggregator tolerates.
#[derive(Clone)]
pub struct UploadWorker {
    queue: Arc<dyn WorkQueue>,
    orchestrator: Arc<SubmissionOrchestrator>,
    scheduler: Arc<RetryScheduler>,
    aggregator: Arc<StatusAggregator>,
    options: WorkerOptions,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub poll_interval: Duration,
    /// Upper bound on handling one delivery. Should not exceed the queue's
    /// visibility timeout, or a slow unit is processed twice concurrently.
    pub processing_timeout: Duration,
    /// Deliveries after which a unit's records are failed instead of processed.
    pub max_deliveries: u32,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            processing_timeout: Duration::from_secs(120),
            max_deliveries: 10,
        }
    }
}

impl UploadWorker {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        orchestrator: Arc<SubmissionOrchestrator>,
        scheduler: Arc<RetryScheduler>,
        aggregator: Arc<StatusAggregator>,
        options: WorkerOptions,
    ) -> Self {
        Self {
            queue,
            orchestrator,
            scheduler,
            aggregator,
            options,
        }
    }

    pub async fn run(self, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(worker_id, "Upload worker started");
        while !*shutdown.borrow() {
            match self.poll_once().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => tracing::error!(worker_id, error = %e, "Failed to receive work unit"),
            }
            tokio::select! {
                _ = shutdown.changed() => {}
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }
        tracing::info!(worker_id, "Upload worker stopped");
    }

    /// Receives and handles at most one delivery. Returns whether one was received.
    pub async fn poll_once(&self) -> Result<bool, QueueError> {
        match self.queue.receive().await? {
            Some(delivery) => {
                self.handle(delivery).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn handle(&self, delivery: Delivery) {
        let span = tracing::info_span!(
            "work_unit",
            upload_key = %delivery.unit.upload_key,
            organization_id = %delivery.unit.organization_id,
            batch = %delivery.unit.batch_id(),
            receive_count = delivery.receive_count,
        );
        self.settle(delivery).instrument(span).await
    }

    /// Runs one delivery under the processing timeout and acks it on success.
    async fn settle(&self, delivery: Delivery) {
        let timeout = self.options.processing_timeout;
        match tokio::time::timeout(timeout, self.run_delivery(&delivery)).await {
            Ok(Ok(())) => {
                if let Err(e) = self.queue.ack(&delivery.receipt).await {
                    tracing::warn!(error = %e, "Failed to ack work unit, it will be redelivered");
                }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Work unit failed, leaving it for redelivery");
            }
            Err(_) => {
                tracing::error!(
                    timeout_secs = timeout.as_secs(),
                    "Work unit timed out, leaving it for redelivery"
                );
            }
        }
    }

    async fn run_delivery(&self, delivery: &Delivery) -> Result<(), WorkerError> {
        if delivery.receive_count > self.options.max_deliveries {
            self.abandon_unit(&delivery.unit).await
        } else {
            self.process_unit(&delivery.unit).await
        }
    }

    pub async fn process_unit(&self, unit: &WorkUnit) -> Result<(), WorkerError> {
        let outcomes = self.orchestrator.process(unit).await;
        let scheduled = self.scheduler.schedule(unit, outcomes).await?;

        if !scheduled.terminal.is_empty() {
            self.aggregator
                .merge(
                    &unit.upload_key,
                    &unit.organization_id,
                    &unit.batch_id(),
                    &scheduled.terminal,
                )
                .await?;
        }

        Ok(())
    }

    /// Fails every record of a unit that keeps coming back, so its job can still finish.
    async fn abandon_unit(&self, unit: &WorkUnit) -> Result<(), WorkerError> {
        tracing::warn!(
            records = unit.payload.len(),
            max_deliveries = self.options.max_deliveries,
            "Work unit exceeded its delivery limit, failing its records"
        );
        let outcome = ResponseOutcome::new(
            OutcomeClass::ClientError,
            None,
            "delivery attempts exhausted",
            unit.payload.record_ids(),
        );
        self.aggregator
            .merge(
                &unit.upload_key,
                &unit.organization_id,
                &unit.batch_id(),
                &[outcome],
            )
            .await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("queue: {0}")]
    Queue(#[from] QueueError),
    #[error("aggregation: {0}")]
    Aggregation(#[from] AggregationError),
}
