use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{BrokerId, DebtPosition, Iupd, OperationKind, OrganizationId, UploadKey};

/// Records carried by a unit. The shape is fixed by the operation: full positions for
/// create/update, bare ids for delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum WorkPayload {
    Records(Vec<DebtPosition>),
    Ids(Vec<Iupd>),
}

impl WorkPayload {
    pub fn len(&self) -> usize {
        match self {
            WorkPayload::Records(records) => records.len(),
            WorkPayload::Ids(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_ids(&self) -> Vec<Iupd> {
        match self {
            WorkPayload::Records(records) => records.iter().map(|r| r.iupd.clone()).collect(),
            WorkPayload::Ids(ids) => ids.clone(),
        }
    }

    /// Keeps only the entries whose id is in `ids`, preserving order.
    pub fn retain_ids(&self, ids: &HashSet<Iupd>) -> Self {
        match self {
            WorkPayload::Records(records) => WorkPayload::Records(
                records
                    .iter()
                    .filter(|r| ids.contains(&r.iupd))
                    .cloned()
                    .collect(),
            ),
            WorkPayload::Ids(all) => {
                WorkPayload::Ids(all.iter().filter(|id| ids.contains(*id)).cloned().collect())
            }
        }
    }
}

/// One dispatchable batch of records plus retry bookkeeping.
///
/// Units are values: a retry produces a new unit with `attempt_count + 1`, the
/// delivered unit is never mutated and resent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkUnit {
    pub operation: OperationKind,
    pub upload_key: UploadKey,
    pub organization_id: OrganizationId,
    pub broker_id: BrokerId,
    pub chunk_index: u32,
    pub attempt_count: u32,
    pub payload: WorkPayload,
}

impl WorkUnit {
    pub fn new(
        operation: OperationKind,
        upload_key: UploadKey,
        organization_id: OrganizationId,
        broker_id: BrokerId,
        chunk_index: u32,
        payload: WorkPayload,
    ) -> Self {
        Self {
            operation,
            upload_key,
            organization_id,
            broker_id,
            chunk_index,
            attempt_count: 0,
            payload,
        }
    }

    /// Follow-up unit carrying only `payload`, one attempt further along.
    pub fn next_attempt(&self, payload: WorkPayload) -> Self {
        Self {
            operation: self.operation,
            upload_key: self.upload_key.clone(),
            organization_id: self.organization_id.clone(),
            broker_id: self.broker_id.clone(),
            chunk_index: self.chunk_index,
            attempt_count: self.attempt_count + 1,
            payload,
        }
    }

    /// Deterministic id of the outcomes this delivery produces. Redeliveries of the
    /// same unit share it, which is what makes aggregation idempotent.
    pub fn batch_id(&self) -> String {
        format!("chunk-{}-attempt-{}", self.chunk_index, self.attempt_count)
    }
}
