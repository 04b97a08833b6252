use crate::domain::{BrokerId, OperationKind, OrganizationId, UploadKey, WorkPayload, WorkUnit};

/// Default records per unit. Tuned for an average serialized debt position of
/// about 2.5 KiB against a 64 KiB message budget, leaving room for the envelope.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 20;

/// Left-to-right partition into chunks of at most `max_chunk_size` items. Only the
/// last chunk may be shorter, and no chunk is empty. A size of zero is treated as one.
pub fn split<T>(items: Vec<T>, max_chunk_size: usize) -> Vec<Vec<T>> {
    let size = max_chunk_size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Identity shared by every unit of one upload.
#[derive(Debug, Clone)]
pub struct UnitTemplate {
    pub operation: OperationKind,
    pub upload_key: UploadKey,
    pub organization_id: OrganizationId,
    pub broker_id: BrokerId,
}

/// Chunks a validated payload into first-attempt units, indexed in chunk order.
pub fn into_work_units(
    template: &UnitTemplate,
    payload: WorkPayload,
    max_chunk_size: usize,
) -> Vec<WorkUnit> {
    let payloads: Vec<WorkPayload> = match payload {
        WorkPayload::Records(records) => split(records, max_chunk_size)
            .into_iter()
            .map(WorkPayload::Records)
            .collect(),
        WorkPayload::Ids(ids) => split(ids, max_chunk_size)
            .into_iter()
            .map(WorkPayload::Ids)
            .collect(),
    };

    payloads
        .into_iter()
        .enumerate()
        .map(|(index, payload)| {
            WorkUnit::new(
                template.operation,
                template.upload_key.clone(),
                template.organization_id.clone(),
                template.broker_id.clone(),
                index as u32,
                payload,
            )
        })
        .collect()
}
