use std::collections::HashSet;

use gpd_uploader::domain::{Iupd, OperationKind, WorkPayload, WorkUnit};

use crate::helpers::fixtures::{create_unit, unit};

#[test]
fn given_new_unit_when_created_then_first_attempt() {
    let unit = create_unit(2);

    assert_eq!(unit.attempt_count, 0);
    assert_eq!(unit.batch_id(), "chunk-0-attempt-0");
}

#[test]
fn given_unit_when_building_next_attempt_then_new_value_with_incremented_count() {
    let original = create_unit(3);
    let keep: HashSet<Iupd> = [Iupd::from("IUPD-2")].into_iter().collect();

    let retry = original.next_attempt(original.payload.retain_ids(&keep));

    assert_eq!(original.attempt_count, 0);
    assert_eq!(retry.attempt_count, 1);
    assert_eq!(retry.chunk_index, original.chunk_index);
    assert_eq!(retry.payload.record_ids(), vec![Iupd::from("IUPD-2")]);
    assert_ne!(retry.batch_id(), original.batch_id());
}

#[test]
fn given_ids_payload_when_retaining_then_order_preserved() {
    let payload = WorkPayload::Ids(vec![Iupd::from("C"), Iupd::from("A"), Iupd::from("B")]);
    let keep: HashSet<Iupd> = [Iupd::from("B"), Iupd::from("C")].into_iter().collect();

    let kept = payload.retain_ids(&keep);

    assert_eq!(kept, WorkPayload::Ids(vec![Iupd::from("C"), Iupd::from("B")]));
}

#[test]
fn given_unit_when_serialized_then_deserializes_to_same_unit() {
    let original = unit(
        OperationKind::Delete,
        4,
        WorkPayload::Ids(vec![Iupd::from("A")]),
    );

    let json = serde_json::to_string(&original).unwrap();
    let decoded: WorkUnit = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded, original);
}
