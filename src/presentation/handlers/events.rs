use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::services::AcceptOutcome;
use crate::domain::StoragePath;
use crate::presentation::state::AppState;

use super::error::error_response;

pub const SUBSCRIPTION_VALIDATION_EVENT: &str = "Microsoft.EventGrid.SubscriptionValidationEvent";
pub const BLOB_CREATED_EVENT: &str = "Microsoft.Storage.BlobCreated";

const BLOB_SUBJECT_MARKER: &str = "/blobs/";

/// One entry of an Event Grid style notification batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNotification {
    #[serde(default)]
    pub id: String,
    pub event_type: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub data: Value,
}

impl EventNotification {
    fn validation_code(&self) -> Option<&str> {
        self.data.get("validationCode").and_then(Value::as_str)
    }

    fn blob_path(&self) -> Option<StoragePath> {
        self.subject
            .split_once(BLOB_SUBJECT_MARKER)
            .map(|(_, path)| StoragePath::from_raw(path))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub validation_response: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub subject: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventsResponse {
    pub results: Vec<EventResult>,
}

#[tracing::instrument(skip(state, events), fields(events = events.len()))]
pub async fn events_handler(
    State(state): State<AppState>,
    Json(events): Json<Vec<EventNotification>>,
) -> Response {
    if let Some(code) = events
        .iter()
        .filter(|e| e.event_type == SUBSCRIPTION_VALIDATION_EVENT)
        .find_map(EventNotification::validation_code)
    {
        tracing::info!("Answering event subscription validation");
        return (
            StatusCode::OK,
            Json(ValidationResponse {
                validation_response: code.to_string(),
            }),
        )
            .into_response();
    }

    let mut results = Vec::with_capacity(events.len());
    for event in &events {
        if event.event_type != BLOB_CREATED_EVENT {
            tracing::debug!(event_type = %event.event_type, "Ignoring event");
            continue;
        }
        let Some(path) = event.blob_path() else {
            tracing::warn!(subject = %event.subject, "Blob event without a blob path");
            results.push(result(event, "ignored"));
            continue;
        };

        match state.upload_service.accept(&path).await {
            Ok(AcceptOutcome::Dispatched { .. }) => results.push(result(event, "dispatched")),
            Ok(AcceptOutcome::AlreadyAccepted(_)) => {
                results.push(result(event, "already_accepted"))
            }
            Ok(AcceptOutcome::DuplicateEvent) => results.push(result(event, "duplicate")),
            Err(e) if e.is_input_error() => {
                tracing::warn!(path = %path, error = %e, "Upload input rejected");
                results.push(result(event, "rejected"));
            }
            Err(e) => {
                // Non-2xx makes the sender redeliver the batch.
                tracing::error!(path = %path, error = %e, "Failed to accept upload");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to accept {}: {}", path, e),
                );
            }
        }
    }

    (StatusCode::ACCEPTED, Json(EventsResponse { results })).into_response()
}

fn result(event: &EventNotification, status: &str) -> EventResult {
    EventResult {
        subject: event.subject.clone(),
        status: status.to_string(),
    }
}
