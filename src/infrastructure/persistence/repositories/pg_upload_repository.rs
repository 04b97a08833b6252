use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{RepositoryError, UploadRepository};
use crate::domain::{BrokerId, OrganizationId, ResponseOutcome, UploadJob, UploadKey};

pub struct PgUploadRepository {
    pool: PgPool,
}

impl PgUploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadRepository for PgUploadRepository {
    #[instrument(skip(self, job), fields(upload_key = %job.upload_key, organization_id = %job.organization_id))]
    async fn create_if_absent(&self, job: &UploadJob) -> Result<(UploadJob, bool), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO upload_jobs
                (organization_id, upload_key, broker_id, total, current, responses,
                 merged_batches, started_at, dispatched_at, finished_at, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (organization_id, upload_key) DO NOTHING
            "#,
        )
        .bind(job.organization_id.as_str())
        .bind(job.upload_key.as_str())
        .bind(job.broker_id.as_str())
        .bind(to_db_count(job.total)?)
        .bind(to_db_count(job.current)?)
        .bind(Json(&job.responses))
        .bind(Json(&job.merged_batches))
        .bind(job.started_at)
        .bind(job.dispatched_at)
        .bind(job.finished_at)
        .bind(job.version)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok((job.clone(), true));
        }

        let existing = self
            .get(&job.upload_key, &job.organization_id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(job.upload_key.to_string()))?;
        Ok((existing, false))
    }

    #[instrument(skip(self), fields(upload_key = %upload_key, organization_id = %organization_id))]
    async fn get(
        &self,
        upload_key: &UploadKey,
        organization_id: &OrganizationId,
    ) -> Result<Option<UploadJob>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT organization_id, upload_key, broker_id, total, current, responses,
                   merged_batches, started_at, dispatched_at, finished_at, version
            FROM upload_jobs
            WHERE organization_id = $1 AND upload_key = $2
            "#,
        )
        .bind(organization_id.as_str())
        .bind(upload_key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        row.map(|r| job_from_row(&r)).transpose()
    }

    #[instrument(
        skip(self, job),
        fields(upload_key = %job.upload_key, organization_id = %job.organization_id, expected_version)
    )]
    async fn update_if_version(
        &self,
        job: &UploadJob,
        expected_version: i64,
    ) -> Result<bool, RepositoryError> {
        // finished_at is only ever filled in, never cleared.
        let result = sqlx::query(
            r#"
            UPDATE upload_jobs
            SET current = $1,
                responses = $2,
                merged_batches = $3,
                finished_at = COALESCE(finished_at, $4),
                version = $5
            WHERE organization_id = $6 AND upload_key = $7 AND version = $8
            "#,
        )
        .bind(to_db_count(job.current)?)
        .bind(Json(&job.responses))
        .bind(Json(&job.merged_batches))
        .bind(job.finished_at)
        .bind(job.version)
        .bind(job.organization_id.as_str())
        .bind(job.upload_key.as_str())
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(upload_key = %upload_key, organization_id = %organization_id))]
    async fn mark_dispatched(
        &self,
        upload_key: &UploadKey,
        organization_id: &OrganizationId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE upload_jobs
            SET dispatched_at = COALESCE(dispatched_at, $1)
            WHERE organization_id = $2 AND upload_key = $3
            "#,
        )
        .bind(at)
        .bind(organization_id.as_str())
        .bind(upload_key.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(upload_key.to_string()));
        }
        Ok(())
    }
}

fn job_from_row(row: &PgRow) -> Result<UploadJob, RepositoryError> {
    let get_err = |e: sqlx::Error| RepositoryError::QueryFailed(e.to_string());

    let responses: Json<Vec<ResponseOutcome>> = row.try_get("responses").map_err(get_err)?;
    let merged_batches: Json<BTreeSet<String>> = row.try_get("merged_batches").map_err(get_err)?;
    let started_at: DateTime<Utc> = row.try_get("started_at").map_err(get_err)?;
    let dispatched_at: Option<DateTime<Utc>> = row.try_get("dispatched_at").map_err(get_err)?;
    let finished_at: Option<DateTime<Utc>> = row.try_get("finished_at").map_err(get_err)?;

    Ok(UploadJob {
        upload_key: UploadKey::new(row.try_get::<String, _>("upload_key").map_err(get_err)?),
        organization_id: OrganizationId::new(
            row.try_get::<String, _>("organization_id").map_err(get_err)?,
        ),
        broker_id: BrokerId::new(row.try_get::<String, _>("broker_id").map_err(get_err)?),
        total: from_db_count(row.try_get("total").map_err(get_err)?)?,
        current: from_db_count(row.try_get("current").map_err(get_err)?)?,
        responses: responses.0,
        merged_batches: merged_batches.0,
        started_at,
        dispatched_at,
        finished_at,
        version: row.try_get("version").map_err(get_err)?,
    })
}

fn to_db_count(value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

fn from_db_count(value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|e| RepositoryError::Serialization(e.to_string()))
}
