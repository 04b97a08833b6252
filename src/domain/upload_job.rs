use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BrokerId, Iupd, OrganizationId, ResponseOutcome, UploadKey};

/// Progress record of one upload, shared by every worker touching its chunks.
///
/// `current` counts distinct records with a terminal outcome. A record keeps the
/// first terminal outcome merged for it. `finished_at` is set once, when
/// `current` reaches `total`, and never cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadJob {
    pub upload_key: UploadKey,
    pub organization_id: OrganizationId,
    pub broker_id: BrokerId,
    pub total: u64,
    pub current: u64,
    pub responses: Vec<ResponseOutcome>,
    pub merged_batches: BTreeSet<String>,
    pub started_at: DateTime<Utc>,
    /// Set once every work unit of the upload has been enqueued.
    #[serde(default)]
    pub dispatched_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEffect {
    /// Every terminal id in the batch was already recorded.
    AlreadyMerged,
    Applied {
        recorded: u64,
        /// Ids beyond `total`. Non-zero means the input double-counted somewhere.
        overflow: u64,
        finished_now: bool,
    },
}

impl UploadJob {
    pub fn new(
        upload_key: UploadKey,
        organization_id: OrganizationId,
        broker_id: BrokerId,
        total: u64,
    ) -> Self {
        Self {
            upload_key,
            organization_id,
            broker_id,
            total,
            current: 0,
            responses: Vec::new(),
            merged_batches: BTreeSet::new(),
            started_at: Utc::now(),
            dispatched_at: None,
            finished_at: None,
            version: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Created but never fully enqueued, so nothing in flight will finish it.
    pub fn needs_dispatch(&self) -> bool {
        self.dispatched_at.is_none() && !self.is_finished()
    }

    pub fn pending(&self) -> u64 {
        self.total - self.current
    }

    /// Applies the terminal outcomes of one batch. Non-terminal outcomes are skipped,
    /// and so are ids recorded by an earlier batch: redeliveries of a unit may
    /// classify records differently, and only the first terminal outcome counts.
    pub fn apply(
        &mut self,
        batch_id: &str,
        outcomes: &[ResponseOutcome],
        now: DateTime<Utc>,
    ) -> MergeEffect {
        let mut seen: HashSet<Iupd> = self
            .responses
            .iter()
            .flat_map(|o| o.record_ids.iter().cloned())
            .collect();

        let mut fresh = Vec::new();
        let mut recorded = 0u64;
        for outcome in outcomes.iter().filter(|o| o.class.is_terminal()) {
            let ids: Vec<Iupd> = outcome
                .record_ids
                .iter()
                .filter(|id| seen.insert((*id).clone()))
                .cloned()
                .collect();
            if ids.is_empty() {
                continue;
            }
            recorded += ids.len() as u64;
            fresh.push(ResponseOutcome {
                record_ids: ids,
                ..outcome.clone()
            });
        }

        if fresh.is_empty() {
            return MergeEffect::AlreadyMerged;
        }

        self.responses.extend(fresh);
        let room = self.total - self.current;
        let overflow = recorded.saturating_sub(room);
        self.current += recorded - overflow;
        self.merged_batches.insert(batch_id.to_string());

        let finished_now = self.finished_at.is_none() && self.current == self.total;
        if finished_now {
            self.finished_at = Some(now);
        }

        MergeEffect::Applied {
            recorded,
            overflow,
            finished_now,
        }
    }
}
