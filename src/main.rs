use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;

use gpd_uploader::application::ports::{DebtPositionApi, UploadRepository, WorkQueue};
use gpd_uploader::application::services::{
    ReportPublisher, RetryScheduler, StatusAggregator, SubmissionOrchestrator, UploadService,
    UploadWorker,
};
use gpd_uploader::infrastructure::api::HttpDebtPositionApi;
use gpd_uploader::infrastructure::observability::{TracingConfig, init_tracing};
use gpd_uploader::infrastructure::persistence::{
    PgUploadRepository, PoolConfig, create_pool, run_migrations,
};
use gpd_uploader::infrastructure::queue::PgWorkQueue;
use gpd_uploader::infrastructure::storage::BlobStoreFactory;
use gpd_uploader::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;

    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(&TracingConfig::new(
        environment.as_str(),
        settings.logging.level.clone(),
        settings.logging.enable_json,
    ));

    let pool = create_pool(&PoolConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        acquire_timeout: Duration::from_secs(settings.database.acquire_timeout_seconds),
        connect_attempts: settings.database.connect_attempts,
    })
    .await?;
    run_migrations(&pool).await?;

    let blob_store = BlobStoreFactory::create(&settings.storage)?;
    let repository: Arc<dyn UploadRepository> = Arc::new(PgUploadRepository::new(pool.clone()));
    let queue: Arc<dyn WorkQueue> = Arc::new(PgWorkQueue::new(
        pool.clone(),
        settings.queue.visibility_timeout(),
    ));
    let api: Arc<dyn DebtPositionApi> = Arc::new(HttpDebtPositionApi::new(
        &settings.api.base_url,
        settings.api.subscription_key.clone(),
        Duration::from_secs(settings.api.timeout_seconds),
    )?);

    let publisher = Arc::new(ReportPublisher::new(Arc::clone(&blob_store)));
    let aggregator = Arc::new(StatusAggregator::new(Arc::clone(&repository), publisher));
    let orchestrator = Arc::new(SubmissionOrchestrator::new(
        api,
        settings.upload.single_submit_concurrency,
    ));
    let scheduler = Arc::new(RetryScheduler::new(
        Arc::clone(&queue),
        settings.upload.retry_policy(),
    ));
    let upload_service = Arc::new(UploadService::new(
        blob_store,
        Arc::clone(&repository),
        Arc::clone(&queue),
        Arc::clone(&aggregator),
        settings.upload.limits(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = UploadWorker::new(
        queue,
        orchestrator,
        scheduler,
        aggregator,
        settings.queue.worker_options(),
    );
    let mut worker_handles = Vec::with_capacity(settings.queue.workers);
    for worker_id in 0..settings.queue.workers {
        worker_handles.push(tokio::spawn(
            worker.clone().run(worker_id, shutdown_rx.clone()),
        ));
    }
    tracing::info!(workers = settings.queue.workers, "Upload workers spawned");

    let router = create_router(AppState::new(upload_service));

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Upload worker panicked");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
