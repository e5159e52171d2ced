//! HTTP handlers for sowing request allocation endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::services::allocation::{
    AdjustAllocationInput, AutoFillResponse, IssueStockInput, IssueStockReceipt, PlanReport,
    ValidatePlanInput,
};
use crate::AppState;

/// Auto-fill a plan for a pending request
pub async fn get_auto_allocation(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> AppResult<Json<AutoFillResponse>> {
    let response = state.allocation.auto_fill(&request_id).await?;
    Ok(Json(response))
}

/// Validate a plan edited on the client
pub async fn validate_allocation(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(input): Json<ValidatePlanInput>,
) -> AppResult<Json<PlanReport>> {
    let report = state.allocation.validate(&request_id, input).await?;
    Ok(Json(report))
}

/// Set or max-fill a single plan row
pub async fn adjust_allocation(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(input): Json<AdjustAllocationInput>,
) -> AppResult<Json<PlanReport>> {
    let report = state.allocation.adjust(&request_id, input).await?;
    Ok(Json(report))
}

/// Issue stock for a validated plan
pub async fn issue_stock(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(input): Json<IssueStockInput>,
) -> AppResult<Json<IssueStockReceipt>> {
    let receipt = state.allocation.issue(&request_id, input).await?;
    Ok(Json(receipt))
}
