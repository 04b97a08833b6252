use std::time::Duration;

use tokio::sync::watch;

use gpd_uploader::application::services::{EXHAUSTED_DETAIL, WorkerOptions};
use gpd_uploader::domain::OutcomeClass;

use crate::helpers::fakes::{Reply, ScriptedApi};
use crate::helpers::fixtures::{create_input, create_unit, positions};
use crate::helpers::pipeline::{Pipeline, immediate_retries, limits};

#[tokio::test]
async fn given_mixed_results_when_draining_then_retry_completes_the_job() {
    // Chunk of 3 fails in bulk and resolves [Done, Done, Retryable]; chunk of 2 succeeds.
    let api = ScriptedApi::accepting()
        .script_bulk(vec![Reply::Status(500), Reply::Status(201)])
        .script_single("IUPD-3", vec![Reply::Status(503)]);
    let pipeline = Pipeline::new(api, 3, immediate_retries(3));
    let path = pipeline.put_input(create_input(positions(5))).await;
    pipeline.service.accept(&path).await.unwrap();

    assert!(pipeline.worker.poll_once().await.unwrap());
    assert!(pipeline.worker.poll_once().await.unwrap());

    let job = pipeline.job().await.unwrap();
    assert_eq!(job.current, 4);
    assert_eq!(job.pending(), 1);
    assert!(!job.is_finished());
    assert_eq!(pipeline.queue.len(), 1);

    assert_eq!(pipeline.drain().await, 1);

    let job = pipeline.job().await.unwrap();
    assert_eq!(job.current, 5);
    assert!(job.finished_at.is_some());
    assert!(job.responses.iter().all(|o| o.class == OutcomeClass::Done));
    assert_eq!(pipeline.report().await.unwrap().submitted_item, 5);
    assert!(pipeline.queue.is_empty());
}

#[tokio::test]
async fn given_client_errors_when_draining_then_records_never_retried() {
    let api = ScriptedApi::failing(400);
    let pipeline = Pipeline::new(api, 5, immediate_retries(3));
    let path = pipeline.put_input(create_input(positions(2))).await;
    pipeline.service.accept(&path).await.unwrap();

    assert_eq!(pipeline.drain().await, 1);

    let job = pipeline.job().await.unwrap();
    assert!(job.is_finished());
    assert!(job.responses.iter().all(|o| o.class == OutcomeClass::ClientError));
    assert_eq!(pipeline.api.bulk_calls(), 1);
    assert_eq!(pipeline.api.single_calls().len(), 2);
}

#[tokio::test]
async fn given_persistent_server_errors_when_draining_then_budget_exhausts_as_client_error() {
    let api = ScriptedApi::failing(503);
    let pipeline = Pipeline::new(api, 5, immediate_retries(2));
    let path = pipeline.put_input(create_input(positions(1))).await;
    pipeline.service.accept(&path).await.unwrap();

    assert_eq!(pipeline.drain().await, 3);

    let job = pipeline.job().await.unwrap();
    assert!(job.is_finished());
    assert_eq!(job.responses.len(), 1);
    assert_eq!(job.responses[0].class, OutcomeClass::ClientError);
    assert!(job.responses[0].detail.starts_with(EXHAUSTED_DETAIL));
    assert_eq!(pipeline.api.bulk_calls(), 3);
}

#[tokio::test]
async fn given_same_unit_processed_twice_when_merging_then_job_counts_it_once() {
    let pipeline = Pipeline::new(ScriptedApi::accepting(), 5, immediate_retries(3));
    let path = pipeline.put_input(create_input(positions(3))).await;
    pipeline.service.accept(&path).await.unwrap();
    let unit = create_unit(3);

    pipeline.worker.process_unit(&unit).await.unwrap();
    pipeline.worker.process_unit(&unit).await.unwrap();

    let job = pipeline.job().await.unwrap();
    assert_eq!(job.current, 3);
    assert_eq!(job.responses.len(), 1);
}

#[tokio::test]
async fn given_unit_over_delivery_limit_when_handled_then_records_failed_and_acked() {
    let options = WorkerOptions {
        max_deliveries: 0,
        ..WorkerOptions::default()
    };
    let pipeline = Pipeline::with_options(
        ScriptedApi::accepting(),
        limits(5),
        immediate_retries(3),
        options,
    );
    let path = pipeline.put_input(create_input(positions(2))).await;
    pipeline.service.accept(&path).await.unwrap();

    assert_eq!(pipeline.drain().await, 1);

    let job = pipeline.job().await.unwrap();
    assert!(job.is_finished());
    assert_eq!(job.responses[0].class, OutcomeClass::ClientError);
    assert_eq!(job.responses[0].detail, "delivery attempts exhausted");
    assert_eq!(pipeline.api.bulk_calls(), 0);
    assert!(pipeline.queue.is_empty());
}

#[tokio::test]
async fn given_redelivery_classifying_records_differently_when_merging_then_each_record_counted_once() {
    let api = ScriptedApi::accepting()
        .script_bulk(vec![Reply::Status(500), Reply::Status(500)])
        .script_single("IUPD-1", vec![Reply::Status(503), Reply::Status(201)])
        .script_single("IUPD-2", vec![Reply::Status(201), Reply::Status(503)]);
    let pipeline = Pipeline::new(api, 5, immediate_retries(3));
    let path = pipeline.put_input(create_input(positions(2))).await;
    pipeline.service.accept(&path).await.unwrap();
    let unit = create_unit(2);

    pipeline.worker.process_unit(&unit).await.unwrap();
    pipeline.worker.process_unit(&unit).await.unwrap();

    let job = pipeline.job().await.unwrap();
    assert_eq!(job.current, 2);
    assert!(job.is_finished());

    pipeline.drain().await;

    let job = pipeline.job().await.unwrap();
    let mut ids: Vec<String> = job
        .responses
        .iter()
        .flat_map(|o| o.record_ids.iter().map(|id| id.to_string()))
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["IUPD-1".to_string(), "IUPD-2".to_string()]);
    assert_eq!(job.current, 2);
    assert!(job.responses.iter().all(|o| o.class == OutcomeClass::Done));
}

#[tokio::test]
async fn given_spawned_worker_when_input_accepted_then_job_finishes_and_worker_stops() {
    let options = WorkerOptions {
        poll_interval: Duration::from_millis(10),
        ..WorkerOptions::default()
    };
    let pipeline = Pipeline::with_options(
        ScriptedApi::accepting(),
        limits(2),
        immediate_retries(3),
        options,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(pipeline.worker.clone().run(0, shutdown_rx));

    let path = pipeline.put_input(create_input(positions(5))).await;
    pipeline.service.accept(&path).await.unwrap();

    let finished = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if pipeline.job().await.is_some_and(|job| job.is_finished()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(finished.is_ok(), "job did not finish");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker stopped")
        .unwrap();
    assert!(pipeline.queue.is_empty());
}
