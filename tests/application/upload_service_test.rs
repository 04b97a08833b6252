use std::sync::Arc;

use gpd_uploader::application::services::{
    AcceptOutcome, UploadError, UploadLimits, UploadService,
};
use gpd_uploader::application::ports::QueueError;
use gpd_uploader::domain::{OutcomeClass, StoragePath};

use crate::helpers::fakes::{FlakyQueue, ScriptedApi};
use crate::helpers::fixtures::{
    create_input, delete_input, input_path, iupds, position, positions,
};
use crate::helpers::pipeline::{Pipeline, immediate_retries, limits};

fn pipeline() -> Pipeline {
    Pipeline::new(ScriptedApi::accepting(), 2, immediate_retries(3))
}

#[tokio::test]
async fn given_valid_input_when_accepting_then_job_created_and_units_enqueued() {
    let pipeline = pipeline();
    let path = pipeline.put_input(create_input(positions(5))).await;

    let outcome = pipeline.service.accept(&path).await.unwrap();

    assert!(matches!(
        outcome,
        AcceptOutcome::Dispatched { units: 3, rejected: 0, .. }
    ));
    let job = pipeline.job().await.unwrap();
    assert_eq!(job.total, 5);
    assert_eq!(job.current, 0);
    assert_eq!(pipeline.queue.len(), 3);
}

#[tokio::test]
async fn given_empty_record_list_when_accepting_then_rejected_and_no_job() {
    let pipeline = pipeline();
    let path = pipeline.put_input(create_input(Vec::new())).await;

    let result = pipeline.service.accept(&path).await;

    assert!(matches!(result, Err(UploadError::EmptyInput)));
    assert!(pipeline.job().await.is_none());
    assert!(pipeline.queue.is_empty());
}

#[tokio::test]
async fn given_zero_byte_object_when_accepting_then_rejected_before_reading() {
    let pipeline = pipeline();
    let path = pipeline.put_input(Vec::new()).await;

    let result = pipeline.service.accept(&path).await;

    assert!(matches!(result, Err(UploadError::EmptyInput)));
    assert!(pipeline.job().await.is_none());
}

#[tokio::test]
async fn given_oversized_input_when_accepting_then_too_large() {
    let pipeline = Pipeline::with_options(
        ScriptedApi::accepting(),
        UploadLimits {
            max_input_bytes: 16,
            ..limits(2)
        },
        immediate_retries(3),
        Default::default(),
    );
    let path = pipeline.put_input(create_input(positions(1))).await;

    let result = pipeline.service.accept(&path).await;

    assert!(matches!(result, Err(UploadError::TooLarge { max: 16, .. })));
    assert!(result.unwrap_err().is_input_error());
}

#[tokio::test]
async fn given_path_outside_input_dir_when_accepting_then_invalid_path() {
    let pipeline = pipeline();

    let result = pipeline
        .service
        .accept(&StoragePath::from_raw("broker/org/output/file.json"))
        .await;

    assert!(matches!(result, Err(UploadError::InvalidPath(_))));
}

#[tokio::test]
async fn given_malformed_document_when_accepting_twice_then_both_report_malformed() {
    let pipeline = pipeline();
    let path = pipeline.put_input(b"{not json".to_vec()).await;

    let first = pipeline.service.accept(&path).await;
    let second = pipeline.service.accept(&path).await;

    assert!(matches!(first, Err(UploadError::Malformed(_))));
    assert!(matches!(second, Err(UploadError::Malformed(_))));
}

#[tokio::test]
async fn given_all_records_invalid_when_accepting_then_job_finishes_without_units() {
    let pipeline = pipeline();
    let mut invalid = positions(3);
    for record in &mut invalid {
        record.fiscal_code = "x".to_string();
    }
    let path = pipeline.put_input(create_input(invalid)).await;

    let outcome = pipeline.service.accept(&path).await.unwrap();

    assert!(matches!(
        outcome,
        AcceptOutcome::Dispatched { units: 0, rejected: 3, .. }
    ));
    let job = pipeline.job().await.unwrap();
    assert_eq!(job.current, 3);
    assert!(job.is_finished());
    assert!(job.responses.iter().all(|o| o.class == OutcomeClass::ClientError));
    assert!(pipeline.queue.is_empty());

    let report = pipeline.report().await.unwrap();
    assert_eq!(report.submitted_item, 3);
}

#[tokio::test]
async fn given_partially_invalid_input_when_accepting_then_rejections_recorded_up_front() {
    let pipeline = pipeline();
    let mut records = positions(3);
    records.push(position("IUPD-1"));
    let path = pipeline.put_input(create_input(records)).await;

    pipeline.service.accept(&path).await.unwrap();

    let job = pipeline.job().await.unwrap();
    assert_eq!(job.total, 4);
    assert_eq!(job.current, 1);
    assert_eq!(pipeline.queue.len(), 2);
}

#[tokio::test]
async fn given_repeated_event_when_accepting_then_duplicate_suppressed() {
    let pipeline = pipeline();
    let path = pipeline.put_input(delete_input(iupds(2))).await;

    pipeline.service.accept(&path).await.unwrap();
    let second = pipeline.service.accept(&path).await.unwrap();

    assert!(matches!(second, AcceptOutcome::DuplicateEvent));
    assert_eq!(pipeline.queue.len(), 1);
}

#[tokio::test]
async fn given_event_seen_by_another_instance_when_accepting_then_not_dispatched_again() {
    let pipeline = pipeline();
    let path = pipeline.put_input(delete_input(iupds(2))).await;
    pipeline.service.accept(&path).await.unwrap();

    let other_instance = UploadService::new(
        pipeline.blob_store.clone(),
        pipeline.repository.clone(),
        pipeline.queue.clone(),
        Arc::clone(&pipeline.aggregator),
        limits(2),
    );
    let outcome = other_instance.accept(&path).await.unwrap();

    assert!(matches!(outcome, AcceptOutcome::AlreadyAccepted(_)));
    assert_eq!(pipeline.queue.len(), 1);
}

#[tokio::test]
async fn given_missing_object_when_accepting_then_storage_error_not_input_error() {
    let pipeline = pipeline();

    let result = pipeline.service.accept(&input_path()).await;

    let error = result.unwrap_err();
    assert!(matches!(error, UploadError::Storage(_)));
    assert!(!error.is_input_error());
}

#[tokio::test]
async fn given_dispatch_failed_midway_when_event_redelivered_then_units_dispatched_again() {
    let pipeline = pipeline();
    let path = pipeline.put_input(create_input(positions(3))).await;
    let flaky = UploadService::new(
        pipeline.blob_store.clone(),
        pipeline.repository.clone(),
        Arc::new(FlakyQueue::new(pipeline.queue.clone(), 1)),
        Arc::clone(&pipeline.aggregator),
        limits(2),
    );

    let first = flaky.accept(&path).await;

    assert!(matches!(first, Err(UploadError::Queue(QueueError::EnqueueFailed(_)))));
    let job = pipeline.job().await.unwrap();
    assert!(job.needs_dispatch());
    assert!(pipeline.queue.is_empty());

    let second = flaky.accept(&path).await.unwrap();

    assert!(matches!(second, AcceptOutcome::Dispatched { units: 2, .. }));
    assert_eq!(pipeline.queue.len(), 2);
    assert!(pipeline.job().await.unwrap().dispatched_at.is_some());

    pipeline.drain().await;
    let job = pipeline.job().await.unwrap();
    assert!(job.is_finished());
    assert_eq!(job.current, 3);
}

#[tokio::test]
async fn given_successful_dispatch_when_accepting_then_job_marked_dispatched() {
    let pipeline = pipeline();
    let path = pipeline.put_input(create_input(positions(3))).await;

    pipeline.service.accept(&path).await.unwrap();

    assert!(!pipeline.job().await.unwrap().needs_dispatch());
}
