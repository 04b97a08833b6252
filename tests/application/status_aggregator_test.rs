use std::sync::Arc;

use gpd_uploader::application::ports::{BlobStore, UploadRepository};
use gpd_uploader::application::services::{AggregationError, ReportPublisher, StatusAggregator};
use gpd_uploader::domain::{Iupd, ResponseOutcome, StoragePath, UploadJob, UploadKey};
use gpd_uploader::infrastructure::persistence::InMemoryUploadRepository;
use gpd_uploader::infrastructure::storage::ObjectBlobStore;

use crate::helpers::fakes::ContendedRepository;
use crate::helpers::fixtures::{INPUT_FILENAME, broker, org, upload_key};

fn done(id: &str) -> ResponseOutcome {
    ResponseOutcome::from_status(201, "OK", vec![Iupd::from(id)])
}

async fn seeded<R: UploadRepository>(repository: &R, total: u64) {
    let job = UploadJob::new(upload_key(), org(), broker(), total);
    repository.create_if_absent(&job).await.unwrap();
}

fn aggregator(
    repository: Arc<dyn UploadRepository>,
) -> (StatusAggregator, Arc<ObjectBlobStore>) {
    let store = Arc::new(ObjectBlobStore::in_memory());
    let publisher = Arc::new(ReportPublisher::new(store.clone()));
    (StatusAggregator::new(repository, publisher), store)
}

fn report_path() -> StoragePath {
    StoragePath::report(&broker(), &org(), INPUT_FILENAME)
}

#[tokio::test]
async fn given_same_batch_merged_twice_when_aggregating_then_counted_once() {
    let repository = Arc::new(InMemoryUploadRepository::new());
    seeded(repository.as_ref(), 3).await;
    let (aggregator, _) = aggregator(repository.clone());

    aggregator
        .merge(&upload_key(), &org(), "chunk-0-attempt-0", &[done("A")])
        .await
        .unwrap();
    let job = aggregator
        .merge(&upload_key(), &org(), "chunk-0-attempt-0", &[done("A")])
        .await
        .unwrap();

    assert_eq!(job.current, 1);
    assert_eq!(job.responses.len(), 1);
    assert_eq!(job.version, 1);
}

#[tokio::test]
async fn given_last_batch_when_aggregating_then_job_finished_and_report_published() {
    let repository = Arc::new(InMemoryUploadRepository::new());
    seeded(repository.as_ref(), 2).await;
    let (aggregator, store) = aggregator(repository.clone());

    aggregator
        .merge(&upload_key(), &org(), "chunk-0-attempt-0", &[done("A")])
        .await
        .unwrap();
    assert!(store.head(&report_path()).await.is_err());

    let job = aggregator
        .merge(&upload_key(), &org(), "chunk-1-attempt-0", &[done("B")])
        .await
        .unwrap();

    assert!(job.is_finished());
    assert!(store.head(&report_path()).await.unwrap() > 0);
}

#[tokio::test]
async fn given_lost_writes_when_aggregating_then_retries_until_applied() {
    let repository = Arc::new(ContendedRepository::new(3));
    seeded(repository.as_ref(), 1).await;
    let (aggregator, _) = aggregator(repository.clone());

    let job = aggregator
        .merge(&upload_key(), &org(), "chunk-0-attempt-0", &[done("A")])
        .await
        .unwrap();

    assert_eq!(job.current, 1);
    assert_eq!(repository.update_calls(), 4);
}

#[tokio::test]
async fn given_persistent_contention_when_aggregating_then_conflict_error() {
    let repository = Arc::new(ContendedRepository::new(100));
    seeded(repository.as_ref(), 1).await;
    let (aggregator, _) = aggregator(repository.clone());
    let aggregator = aggregator.with_max_conflict_retries(2);

    let result = aggregator
        .merge(&upload_key(), &org(), "chunk-0-attempt-0", &[done("A")])
        .await;

    assert!(matches!(result, Err(AggregationError::Conflict { attempts: 2 })));
}

#[tokio::test]
async fn given_unknown_job_when_aggregating_then_not_found() {
    let repository = Arc::new(InMemoryUploadRepository::new());
    let (aggregator, _) = aggregator(repository);

    let result = aggregator
        .merge(&UploadKey::new("missing.json"), &org(), "validation", &[done("A")])
        .await;

    assert!(matches!(result, Err(AggregationError::JobNotFound { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_concurrent_merges_of_distinct_batches_when_aggregating_then_all_counted() {
    let repository = Arc::new(InMemoryUploadRepository::new());
    seeded(repository.as_ref(), 10).await;
    let (aggregator, store) = aggregator(repository.clone());
    let aggregator = Arc::new(aggregator);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let aggregator = Arc::clone(&aggregator);
            tokio::spawn(async move {
                aggregator
                    .merge(
                        &upload_key(),
                        &org(),
                        &format!("chunk-{}-attempt-0", i),
                        &[done(&format!("R{}", i))],
                    )
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let job = repository.get(&upload_key(), &org()).await.unwrap().unwrap();
    assert_eq!(job.current, 10);
    assert_eq!(job.responses.len(), 10);
    assert_eq!(job.merged_batches.len(), 10);
    assert!(job.is_finished());
    assert!(store.head(&report_path()).await.is_ok());
}
