use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, instrument, warn};

use crate::application::ports::RepositoryError;

const FIRST_RETRY_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(8);

/// Connection settings for the pool backing both the job store and the work queue.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    /// Shared by HTTP handlers and every worker task.
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Connects tried before giving up, so the service can start alongside its database.
    pub connect_attempts: u32,
}

#[instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn create_pool(config: &PoolConfig) -> Result<PgPool, RepositoryError> {
    let attempts = config.connect_attempts.max(1);
    let mut delay = FIRST_RETRY_DELAY;

    for attempt in 1..=attempts {
        let connected = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await;

        match connected {
            Ok(pool) => {
                info!(attempt, "PostgreSQL connection pool established");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    error = %e,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis(),
                    "PostgreSQL connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
            Err(e) => return Err(RepositoryError::ConnectionFailed(e.to_string())),
        }
    }

    Err(RepositoryError::ConnectionFailed("no connection attempt made".to_string()))
}

/// Creates `upload_jobs`, `work_units` and `dead_work_units` if missing.
pub async fn run_migrations(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::migrate!()
        .run(pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
    info!("Database migrations applied");
    Ok(())
}
