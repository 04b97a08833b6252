use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::{OrganizationId, UploadKey, UploadReport};
use crate::presentation::state::AppState;

use super::error::error_response;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusResponse {
    pub total: u64,
    pub current: u64,
    pub finished: bool,
    #[serde(flatten)]
    pub report: UploadReport,
}

#[tracing::instrument(skip(state))]
pub async fn upload_status_handler(
    State(state): State<AppState>,
    Path((broker, organization, upload_key)): Path<(String, String, String)>,
) -> Response {
    let upload_key = UploadKey::new(upload_key);
    let organization_id = OrganizationId::new(organization);

    match state
        .upload_repository
        .get(&upload_key, &organization_id)
        .await
    {
        Ok(Some(job)) if job.broker_id.as_str() == broker => {
            let response = UploadStatusResponse {
                total: job.total,
                current: job.current,
                finished: job.is_finished(),
                report: UploadReport::from_job(&job),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(_) => error_response(
            StatusCode::NOT_FOUND,
            format!("Upload not found: {}", upload_key),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch upload status");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch upload: {}", e),
            )
        }
    }
}
