use reqwest::Method;
use serde_json::{Value, json};

use crate::application::ports::{ApiError, SingleItem};
use crate::domain::{OperationKind, OrganizationId, WorkPayload};

/// Transport-neutral description of one debt-position API call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub publish: bool,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

fn base_segments(organization_id: &OrganizationId) -> Vec<String> {
    vec![
        "organizations".to_string(),
        organization_id.as_str().to_string(),
        "debtpositions".to_string(),
    ]
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

fn mismatch(operation: OperationKind, shape: &str) -> ApiError {
    ApiError::InvalidRequest(format!("{} cannot carry {}", operation, shape))
}

pub fn bulk_request(
    organization_id: &OrganizationId,
    operation: OperationKind,
    payload: &WorkPayload,
) -> Result<ApiRequest, ApiError> {
    let mut segments = base_segments(organization_id);
    match (operation, payload) {
        (OperationKind::Create, WorkPayload::Records(records)) => {
            segments.push("bulk".to_string());
            Ok(ApiRequest {
                method: Method::POST,
                segments,
                publish: true,
                body: Some(json!({ "paymentPositions": serialize(records)? })),
            })
        }
        (OperationKind::Update, WorkPayload::Records(records)) => Ok(ApiRequest {
            method: Method::PUT,
            segments,
            publish: true,
            body: Some(json!({ "paymentPositions": serialize(records)? })),
        }),
        (OperationKind::Delete, WorkPayload::Ids(ids)) => Ok(ApiRequest {
            method: Method::DELETE,
            segments,
            publish: false,
            body: Some(json!({ "paymentPositionIUPDs": serialize(ids)? })),
        }),
        (operation, WorkPayload::Records(_)) => Err(mismatch(operation, "full records")),
        (operation, WorkPayload::Ids(_)) => Err(mismatch(operation, "bare identifiers")),
    }
}

pub fn single_request(
    organization_id: &OrganizationId,
    operation: OperationKind,
    item: SingleItem<'_>,
) -> Result<ApiRequest, ApiError> {
    let mut segments = base_segments(organization_id);
    match (operation, item) {
        (OperationKind::Create, SingleItem::Record(record)) => Ok(ApiRequest {
            method: Method::POST,
            segments,
            publish: true,
            body: Some(serialize(record)?),
        }),
        (OperationKind::Update, SingleItem::Record(record)) => {
            segments.push(record.iupd.as_str().to_string());
            Ok(ApiRequest {
                method: Method::PUT,
                segments,
                publish: true,
                body: Some(serialize(record)?),
            })
        }
        (OperationKind::Delete, SingleItem::Id(iupd)) => {
            segments.push(iupd.as_str().to_string());
            Ok(ApiRequest {
                method: Method::DELETE,
                segments,
                publish: false,
                body: None,
            })
        }
        (operation, SingleItem::Record(_)) => Err(mismatch(operation, "a full record")),
        (operation, SingleItem::Id(_)) => Err(mismatch(operation, "a bare identifier")),
    }
}
