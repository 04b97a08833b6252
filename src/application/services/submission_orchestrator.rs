use std::sync::Arc;

use futures::StreamExt;

use crate::application::ports::{ApiResponse, DebtPositionApi, SingleItem};
use crate::domain::{OutcomeClass, ResponseOutcome, WorkPayload, WorkUnit};

const MAX_DETAIL_LEN: usize = 512;
const SUCCESS_DETAIL: &str = "OK";

/// Submits one unit in bulk, falling back to one call per record when the bulk call
/// does not succeed, so a single bad record cannot sink the rest of its chunk.
pub struct SubmissionOrchestrator {
    api: Arc<dyn DebtPositionApi>,
    single_concurrency: usize,
}

impl SubmissionOrchestrator {
    pub fn new(api: Arc<dyn DebtPositionApi>, single_concurrency: usize) -> Self {
        Self {
            api,
            single_concurrency: single_concurrency.max(1),
        }
    }

    /// Returns one outcome spanning the whole unit on bulk success, otherwise one
    /// outcome per record in payload order.
    #[tracing::instrument(
        skip(self, unit),
        fields(
            upload_key = %unit.upload_key,
            organization_id = %unit.organization_id,
            operation = %unit.operation,
            chunk = unit.chunk_index,
            attempt = unit.attempt_count,
            records = unit.payload.len(),
        )
    )]
    pub async fn process(&self, unit: &WorkUnit) -> Vec<ResponseOutcome> {
        if unit.payload.is_empty() {
            return Vec::new();
        }

        match self
            .api
            .submit_bulk(&unit.organization_id, unit.operation, &unit.payload)
            .await
        {
            Ok(response) if response.is_success() => {
                tracing::debug!(status = response.status, "Bulk submission succeeded");
                return vec![ResponseOutcome::from_status(
                    response.status,
                    SUCCESS_DETAIL,
                    unit.payload.record_ids(),
                )];
            }
            Ok(response) => {
                tracing::warn!(
                    status = response.status,
                    "Bulk submission rejected, falling back to one-by-one"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Bulk submission failed, falling back to one-by-one");
            }
        }

        self.submit_one_by_one(unit).await
    }

    async fn submit_one_by_one(&self, unit: &WorkUnit) -> Vec<ResponseOutcome> {
        let items: Vec<SingleItem<'_>> = match &unit.payload {
            WorkPayload::Records(records) => records.iter().map(SingleItem::Record).collect(),
            WorkPayload::Ids(ids) => ids.iter().map(SingleItem::Id).collect(),
        };

        let calls: Vec<_> = items
            .into_iter()
            .map(|item| self.submit_single(unit, item))
            .collect();
        let outcomes: Vec<ResponseOutcome> = futures::stream::iter(calls)
            .buffered(self.single_concurrency)
            .collect()
            .await;

        let done = outcomes.iter().filter(|o| o.class.is_terminal()).count();
        tracing::info!(
            terminal = done,
            retryable = outcomes.len() - done,
            "One-by-one submission finished"
        );

        outcomes
    }

    async fn submit_single(&self, unit: &WorkUnit, item: SingleItem<'_>) -> ResponseOutcome {
        let iupd = item.iupd().clone();
        match self
            .api
            .submit_single(&unit.organization_id, unit.operation, item)
            .await
        {
            Ok(response) => {
                let detail = if response.is_success() {
                    SUCCESS_DETAIL.to_string()
                } else {
                    response_detail(&response)
                };
                ResponseOutcome::from_status(response.status, detail, vec![iupd])
            }
            Err(e) if e.is_transient() => {
                tracing::debug!(iupd = %iupd, error = %e, "Single submission transport failure");
                ResponseOutcome::unclassified(e.to_string(), vec![iupd])
            }
            Err(e) => ResponseOutcome::new(OutcomeClass::ClientError, None, e.to_string(), vec![iupd]),
        }
    }
}

/// Human-readable reason from an error body. Problem+json `detail` or `title` is
/// preferred over the raw body.
fn response_detail(response: &ApiResponse) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("title"))
                .and_then(|d| d.as_str())
                .map(String::from)
        });

    let detail = match parsed {
        Some(d) => d,
        None if response.body.trim().is_empty() => format!("HTTP {}", response.status),
        None => response.body.trim().to_string(),
    };

    truncate(detail, MAX_DETAIL_LEN)
}

fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}
