//! Error handling for the allocation server
//!
//! Every error renders as `{"error": {"code", "message", "field"?, "details"?}}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use shared::AllocationError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Engine errors
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    // External service errors
    #[error("Inventory API error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            details: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        match errors.field_errors().into_iter().next() {
            Some((field, problems)) => AppError::Validation {
                field: field.to_string(),
                message: problems
                    .first()
                    .and_then(|p| p.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field)),
            },
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Status and body for engine errors: plan and stock problems are 422,
/// lifecycle conflicts and executor rejections are 409
fn allocation_error_detail(err: &AllocationError) -> (StatusCode, ErrorDetail) {
    let message = err.to_string();
    match err {
        AllocationError::InvalidContext(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("INVALID_REQUEST_DATA", message),
        ),
        AllocationError::InsufficientStock { shortfall } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("INSUFFICIENT_STOCK", message)
                .with_details(json!({ "shortfall": shortfall })),
        ),
        AllocationError::PartialAllocation { shortfall } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("PARTIAL_ALLOCATION", message)
                .with_details(json!({ "shortfall": shortfall })),
        ),
        AllocationError::OverAllocation {
            batch_id,
            allocated,
            remaining,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("OVER_ALLOCATION", message)
                .with_field("batchId")
                .with_details(json!({
                    "batchId": batch_id,
                    "allocated": allocated,
                    "remaining": remaining,
                })),
        ),
        AllocationError::InvalidPlan { batch_id, .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("INVALID_PLAN", message)
                .with_field("batchId")
                .with_details(json!({ "batchId": batch_id })),
        ),
        AllocationError::ValidationMismatch { difference } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("VALIDATION_MISMATCH", message)
                .with_details(json!({ "difference": difference })),
        ),
        AllocationError::EmptyPlan => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorDetail::new("EMPTY_PLAN", message),
        ),
        AllocationError::RequestNotPending { status } => (
            StatusCode::CONFLICT,
            ErrorDetail::new("REQUEST_NOT_PENDING", message)
                .with_details(json!({ "status": status })),
        ),
        AllocationError::InvalidTransition { from, to } => (
            StatusCode::CONFLICT,
            ErrorDetail::new("INVALID_STATE_TRANSITION", message)
                .with_details(json!({ "from": from, "to": to })),
        ),
        AllocationError::IssuanceRejected(reason) => (
            StatusCode::CONFLICT,
            ErrorDetail::new("ISSUANCE_REJECTED", message).with_details(json!(reason)),
        ),
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", message.clone()).with_field(field.clone()),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Allocation(err) => allocation_error_detail(err),
            AppError::ExternalService(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("INVENTORY_API_ERROR", "Inventory service is unavailable"),
            ),
            AppError::Configuration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("CONFIGURATION_ERROR", "Server is misconfigured"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!(code = %error_detail.code, "Request failed: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
