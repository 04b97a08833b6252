use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{QueueError, WorkQueue};
use crate::domain::{Iupd, OutcomeClass, ResponseOutcome, WorkUnit};

pub const EXHAUSTED_DETAIL: &str = "retry budget exhausted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Exponential backoff for the retry following `attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleResult {
    /// Outcomes ready to be recorded on the job.
    pub terminal: Vec<ResponseOutcome>,
    /// Unit re-enqueued for the records still in flight.
    pub retry: Option<WorkUnit>,
}

pub struct RetryScheduler {
    queue: Arc<dyn WorkQueue>,
    policy: RetryPolicy,
}

impl RetryScheduler {
    pub fn new(queue: Arc<dyn WorkQueue>, policy: RetryPolicy) -> Self {
        Self { queue, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Splits `outcomes` into what is final now and what goes back on the queue.
    ///
    /// Retryable ids are re-enqueued as a new unit one attempt further along. Once the
    /// unit has used up its attempts they become a terminal client error instead.
    #[tracing::instrument(
        skip(self, unit, outcomes),
        fields(
            upload_key = %unit.upload_key,
            chunk = unit.chunk_index,
            attempt = unit.attempt_count,
        )
    )]
    pub async fn schedule(
        &self,
        unit: &WorkUnit,
        outcomes: Vec<ResponseOutcome>,
    ) -> Result<ScheduleResult, QueueError> {
        let (mut terminal, retryable): (Vec<_>, Vec<_>) = outcomes
            .into_iter()
            .partition(|outcome| outcome.class.is_terminal());

        let retry_ids: Vec<Iupd> = retryable
            .into_iter()
            .flat_map(|outcome| outcome.record_ids)
            .collect();

        if retry_ids.is_empty() {
            return Ok(ScheduleResult {
                terminal,
                retry: None,
            });
        }

        if unit.attempt_count >= self.policy.max_attempts {
            tracing::warn!(
                records = retry_ids.len(),
                max_attempts = self.policy.max_attempts,
                "Retry budget exhausted, recording records as failed"
            );
            terminal.push(ResponseOutcome::new(
                OutcomeClass::ClientError,
                None,
                format!("{} after {} attempts", EXHAUSTED_DETAIL, unit.attempt_count + 1),
                retry_ids,
            ));
            return Ok(ScheduleResult {
                terminal,
                retry: None,
            });
        }

        let keep: HashSet<Iupd> = retry_ids.into_iter().collect();
        let retry = unit.next_attempt(unit.payload.retain_ids(&keep));
        let delay = self.policy.delay_for(unit.attempt_count);

        self.queue.enqueue(&retry, delay).await?;
        tracing::info!(
            records = retry.payload.len(),
            next_attempt = retry.attempt_count,
            delay_secs = delay.as_secs(),
            "Retry scheduled"
        );

        Ok(ScheduleResult {
            terminal,
            retry: Some(retry),
        })
    }
}
