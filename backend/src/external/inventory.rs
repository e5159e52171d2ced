//! Inventory API client
//!
//! Talks to the inventory system that owns sowing requests and stock
//! batches. Every call carries the configured bearer token; IssueStock
//! also carries a fresh `Idempotency-Key`.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use shared::{IssuanceOutcome, IssueStockRequest, IssueStockResponse, SowingRequest};
use uuid::Uuid;

use super::StockGateway;
use crate::config::InventoryApiConfig;
use crate::error::{AppError, AppResult};

/// Inventory API client
#[derive(Clone)]
pub struct InventoryApiClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

/// GetRequest bodies come either bare or wrapped in `{"data": ...}`
#[derive(Deserialize)]
#[serde(untagged)]
enum RequestEnvelope {
    Wrapped { data: SowingRequest },
    Bare(SowingRequest),
}

impl RequestEnvelope {
    fn into_inner(self) -> SowingRequest {
        match self {
            RequestEnvelope::Wrapped { data } => data,
            RequestEnvelope::Bare(request) => request,
        }
    }
}

impl InventoryApiClient {
    /// Create a new client from configuration
    pub fn new(config: &InventoryApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_url(&self, request_id: &str, suffix: &str) -> AppResult<String> {
        ensure_path_safe(request_id)?;
        Ok(format!(
            "{}/sowing-requests/{}{}",
            self.base_url, request_id, suffix
        ))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl StockGateway for InventoryApiClient {
    async fn get_request(&self, request_id: &str) -> AppResult<SowingRequest> {
        let url = self.request_url(request_id, "")?;

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("GetRequest failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Sowing request {}", request_id)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "GetRequest error: {} - {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::ExternalService(format!("GetRequest read failed: {}", e)))?;

        parse_request(&body)
    }

    async fn issue_stock(
        &self,
        request_id: &str,
        payload: &IssueStockRequest,
    ) -> AppResult<IssuanceOutcome> {
        let url = self.request_url(request_id, "/issue")?;
        let idempotency_key = Uuid::new_v4();

        tracing::debug!(%request_id, %idempotency_key, rows = payload.allocations.len(), "calling IssueStock");

        let response = self
            .authorized(self.client.post(&url))
            .header("Idempotency-Key", idempotency_key.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("IssueStock failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Sowing request {}", request_id)));
        }

        let body = response.text().await.unwrap_or_default();
        parse_issue_response(status, &body)
    }
}

/// Request ids are interpolated into the URL path
fn ensure_path_safe(request_id: &str) -> AppResult<()> {
    let safe = !request_id.is_empty()
        && request_id.len() <= 64
        && request_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if safe {
        Ok(())
    } else {
        Err(AppError::Validation {
            field: "requestId".to_string(),
            message: "Request id may only contain letters, digits, '-' and '_'".to_string(),
        })
    }
}

fn parse_request(body: &str) -> AppResult<SowingRequest> {
    serde_json::from_str::<RequestEnvelope>(body)
        .map(RequestEnvelope::into_inner)
        .map_err(|e| AppError::ExternalService(format!("Failed to parse sowing request: {}", e)))
}

/// Business rejections arrive as 4xx with a `{success: false}` body and map
/// to [`IssuanceOutcome::Rejected`]; anything unparseable is an upstream fault.
fn parse_issue_response(status: StatusCode, body: &str) -> AppResult<IssuanceOutcome> {
    if status.is_server_error() {
        return Err(AppError::ExternalService(format!(
            "IssueStock error: {} - {}",
            status, body
        )));
    }

    let response: IssueStockResponse = serde_json::from_str(body).map_err(|e| {
        AppError::ExternalService(format!(
            "Unexpected IssueStock response ({}): {}",
            status, e
        ))
    })?;

    if response.success && !status.is_success() {
        return Err(AppError::ExternalService(format!(
            "IssueStock reported success with status {}",
            status
        )));
    }

    Ok(IssuanceOutcome::from(response))
}
