use std::sync::Arc;

use gpd_uploader::application::services::SubmissionOrchestrator;
use gpd_uploader::domain::{Iupd, OperationKind, OutcomeClass, WorkPayload};

use crate::helpers::fakes::{Reply, ScriptedApi};
use crate::helpers::fixtures::{create_unit, iupds, unit};

fn orchestrator(api: &Arc<ScriptedApi>) -> SubmissionOrchestrator {
    SubmissionOrchestrator::new(api.clone(), 2)
}

#[tokio::test]
async fn given_bulk_success_when_processing_then_single_done_outcome_covers_all_records() {
    let api = Arc::new(ScriptedApi::accepting());

    let outcomes = orchestrator(&api).process(&create_unit(3)).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].class, OutcomeClass::Done);
    assert_eq!(outcomes[0].record_ids, iupds(3));
    assert_eq!(api.bulk_calls(), 1);
    assert!(api.single_calls().is_empty());
}

#[tokio::test]
async fn given_bulk_failure_when_processing_then_each_record_classified_in_order() {
    let api = Arc::new(
        ScriptedApi::accepting()
            .script_bulk(vec![Reply::Status(500)])
            .script_single("IUPD-2", vec![Reply::Status(400)])
            .script_single("IUPD-3", vec![Reply::Status(503)])
            .script_single("IUPD-4", vec![Reply::Timeout]),
    );

    let outcomes = orchestrator(&api).process(&create_unit(4)).await;

    let classes: Vec<_> = outcomes.iter().map(|o| o.class).collect();
    assert_eq!(
        classes,
        vec![
            OutcomeClass::Done,
            OutcomeClass::ClientError,
            OutcomeClass::Retryable,
            OutcomeClass::Unclassified,
        ]
    );
    assert!(outcomes.iter().all(|o| o.record_count() == 1));
    assert_eq!(outcomes[3].status_code, None);
    assert_eq!(api.single_calls().len(), 4);
}

#[tokio::test]
async fn given_bulk_transport_error_when_processing_then_falls_back_to_singles() {
    let api = Arc::new(ScriptedApi::accepting().script_bulk(vec![Reply::Timeout]));

    let outcomes = orchestrator(&api).process(&create_unit(2)).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.class == OutcomeClass::Done));
}

#[tokio::test]
async fn given_problem_json_body_when_single_rejected_then_detail_extracted() {
    let body = r#"{"title":"Bad Request","status":400,"detail":"amount mismatch"}"#;
    let api = Arc::new(
        ScriptedApi::accepting()
            .script_bulk(vec![Reply::Status(400)])
            .script_single("IUPD-1", vec![Reply::Body(400, body.to_string())]),
    );

    let outcomes = orchestrator(&api).process(&create_unit(1)).await;

    assert_eq!(outcomes[0].detail, "amount mismatch");
    assert_eq!(outcomes[0].status_code, Some(400));
}

#[tokio::test]
async fn given_invalid_request_error_when_single_submitted_then_client_error_not_retried() {
    let api = Arc::new(
        ScriptedApi::accepting()
            .script_bulk(vec![Reply::Status(500)])
            .script_single("IUPD-1", vec![Reply::Invalid]),
    );

    let outcomes = orchestrator(&api).process(&create_unit(1)).await;

    assert_eq!(outcomes[0].class, OutcomeClass::ClientError);
    assert_eq!(outcomes[0].status_code, None);
}

#[tokio::test]
async fn given_empty_payload_when_processing_then_no_calls_and_no_outcomes() {
    let api = Arc::new(ScriptedApi::accepting());
    let empty = unit(OperationKind::Delete, 0, WorkPayload::Ids(Vec::<Iupd>::new()));

    let outcomes = orchestrator(&api).process(&empty).await;

    assert!(outcomes.is_empty());
    assert_eq!(api.bulk_calls(), 0);
}
