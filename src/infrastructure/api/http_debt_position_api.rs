use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::application::ports::{ApiError, ApiResponse, DebtPositionApi, SingleItem};
use crate::domain::{OperationKind, OrganizationId, WorkPayload};

use super::request_builder::{self, ApiRequest};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

pub struct HttpDebtPositionApi {
    client: Client,
    base_url: Url,
    subscription_key: String,
}

impl HttpDebtPositionApi {
    pub fn new(
        base_url: &str,
        subscription_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidRequest(format!("base url: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            subscription_key: subscription_key.into(),
        })
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(&request.segments);
        if request.publish {
            url.query_pairs_mut().append_pair("toPublish", "true");
        }
        Ok(url)
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request)?;
        tracing::debug!(method = %request.method, url = %url, "Calling debt-position API");

        let mut builder = self
            .client
            .request(request.method, url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_transport_error)?;

        Ok(ApiResponse { status, body })
    }
}

fn map_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(e.to_string())
    } else {
        ApiError::ConnectionFailed(e.to_string())
    }
}

#[async_trait]
impl DebtPositionApi for HttpDebtPositionApi {
    #[tracing::instrument(skip(self, payload), fields(records = payload.len()))]
    async fn submit_bulk(
        &self,
        organization_id: &OrganizationId,
        operation: OperationKind,
        payload: &WorkPayload,
    ) -> Result<ApiResponse, ApiError> {
        let request = request_builder::bulk_request(organization_id, operation, payload)?;
        self.send(request).await
    }

    #[tracing::instrument(skip(self, item), fields(iupd = %item.iupd()))]
    async fn submit_single(
        &self,
        organization_id: &OrganizationId,
        operation: OperationKind,
        item: SingleItem<'_>,
    ) -> Result<ApiResponse, ApiError> {
        let request = request_builder::single_request(organization_id, operation, item)?;
        self.send(request).await
    }
}
