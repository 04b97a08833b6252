use std::time::Duration;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{Delivery, DeliveryReceipt, QueueError, WorkQueue};
use crate::domain::WorkUnit;

/// Work queue backed by the `work_units` table.
///
/// A claim pushes `visible_at` forward by the visibility timeout, so an unacked unit
/// becomes receivable again once that lapses. Rows whose body no longer decodes are
/// moved to `dead_work_units`.
pub struct PgWorkQueue {
    pool: PgPool,
    visibility_timeout: Duration,
}

impl PgWorkQueue {
    pub fn new(pool: PgPool, visibility_timeout: Duration) -> Self {
        Self {
            pool,
            visibility_timeout,
        }
    }

    async fn dead_letter(&self, id: i64, reason: &str) -> Result<(), QueueError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO dead_work_units (id, body, receive_count, reason)
            SELECT id, body, receive_count, $2 FROM work_units WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;

        sqlx::query("DELETE FROM work_units WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))
    }
}

#[async_trait]
impl WorkQueue for PgWorkQueue {
    #[instrument(skip(self, unit), fields(upload_key = %unit.upload_key, batch = %unit.batch_id()))]
    async fn enqueue(&self, unit: &WorkUnit, delay: Duration) -> Result<(), QueueError> {
        sqlx::query(
            r#"
            INSERT INTO work_units (body, visible_at, receive_count)
            VALUES ($1, now() + make_interval(secs => $2::float8), 0)
            "#,
        )
        .bind(Json(unit))
        .bind(delay.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(|e| QueueError::EnqueueFailed(e.to_string()))?;

        Ok(())
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let row = sqlx::query(
            r#"
            UPDATE work_units
            SET visible_at = now() + make_interval(secs => $1::float8),
                receive_count = receive_count + 1
            WHERE id = (
                SELECT id FROM work_units
                WHERE visible_at <= now()
                ORDER BY visible_at, id
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, body, receive_count
            "#,
        )
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row
            .try_get("id")
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;
        let receive_count: i32 = row
            .try_get("receive_count")
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;
        let body: serde_json::Value = row
            .try_get("body")
            .map_err(|e| QueueError::ReceiveFailed(e.to_string()))?;

        match serde_json::from_value::<WorkUnit>(body) {
            Ok(unit) => Ok(Some(Delivery {
                receipt: DeliveryReceipt(id.to_string()),
                unit,
                receive_count: u32::try_from(receive_count).unwrap_or(0),
            })),
            Err(e) => {
                tracing::error!(id, error = %e, "Undecodable work unit moved to dead letters");
                self.dead_letter(id, &e.to_string()).await?;
                Ok(None)
            }
        }
    }

    async fn ack(&self, receipt: &DeliveryReceipt) -> Result<(), QueueError> {
        let id: i64 = receipt
            .0
            .parse()
            .map_err(|_| QueueError::AckFailed(format!("invalid receipt {}", receipt.0)))?;

        sqlx::query("DELETE FROM work_units WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;

        Ok(())
    }
}
