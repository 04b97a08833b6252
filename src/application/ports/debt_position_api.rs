use async_trait::async_trait;

use crate::domain::{DebtPosition, Iupd, OperationKind, OrganizationId, WorkPayload};

/// Single record for a one-by-one submission.
#[derive(Debug, Clone, Copy)]
pub enum SingleItem<'a> {
    Record(&'a DebtPosition),
    Id(&'a Iupd),
}

impl SingleItem<'_> {
    pub fn iupd(&self) -> &Iupd {
        match self {
            SingleItem::Record(record) => &record.iupd,
            SingleItem::Id(id) => id,
        }
    }
}

/// Raw response of the debt-position API. Any status is a response; only transport
/// failures are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait DebtPositionApi: Send + Sync {
    async fn submit_bulk(
        &self,
        organization_id: &OrganizationId,
        operation: OperationKind,
        payload: &WorkPayload,
    ) -> Result<ApiResponse, ApiError>;

    async fn submit_single(
        &self,
        organization_id: &OrganizationId,
        operation: OperationKind,
        item: SingleItem<'_>,
    ) -> Result<ApiResponse, ApiError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Whether resending the same request could succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ApiError::InvalidRequest(_))
    }
}
