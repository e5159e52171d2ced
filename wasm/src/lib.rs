//! WebAssembly bindings for the issuance dialog
//!
//! Lets the browser run auto-fill, validation and row edits locally while
//! the operator works on a plan. All values cross the boundary as JSON:
//! the request snapshot as returned by GetRequest, plans as
//! `{batchId: quantity}` maps and an optional policy object.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    auto_fill, fill_batch, prepare_issuance, set_allocation, summarize, validate,
    AllocationContext, AllocationPlan, AllocationPolicy, AllocationResult, AllocationSummary,
    Batch, BatchId, SowingRequest,
};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoFillOutput {
    result: AllocationResult,
    summary: AllocationSummary,
}

type Frame = (SowingRequest, AllocationContext, Vec<Batch>);

fn parse_frame(request_json: &str) -> Result<Frame, String> {
    let request: SowingRequest = serde_json::from_str(request_json)
        .map_err(|e| format!("Invalid request JSON: {}", e))?;
    let (ctx, batches) = request.allocation_frame().map_err(|e| e.to_string())?;
    Ok((request, ctx, batches))
}

fn parse_plan(plan_json: &str) -> Result<AllocationPlan, String> {
    serde_json::from_str(plan_json).map_err(|e| format!("Invalid plan JSON: {}", e))
}

fn parse_policy(policy_json: Option<&str>) -> Result<AllocationPolicy, String> {
    match policy_json.map(str::trim).filter(|p| !p.is_empty()) {
        Some(json) => serde_json::from_str(json).map_err(|e| format!("Invalid policy JSON: {}", e)),
        None => Ok(AllocationPolicy::default()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn auto_fill_inner(request_json: &str, policy_json: Option<&str>) -> Result<String, String> {
    let (_, ctx, batches) = parse_frame(request_json)?;
    let policy = parse_policy(policy_json)?;

    let result = auto_fill(&ctx, &batches, &policy).map_err(|e| e.to_string())?;
    let empty = AllocationPlan::new();
    let summary = summarize(&ctx, &batches, result.plan().unwrap_or(&empty), &policy)
        .map_err(|e| e.to_string())?;

    to_json(&AutoFillOutput { result, summary })
}

fn validate_inner(
    request_json: &str,
    plan_json: &str,
    policy_json: Option<&str>,
) -> Result<String, String> {
    let (_, ctx, batches) = parse_frame(request_json)?;
    let plan = parse_plan(plan_json)?;
    let policy = parse_policy(policy_json)?;
    let result = validate(&ctx, &batches, &plan, &policy).map_err(|e| e.to_string())?;
    to_json(&result)
}

fn set_allocation_inner(plan_json: &str, batch_id: &str, quantity: &str) -> Result<String, String> {
    let plan = parse_plan(plan_json)?;
    let quantity = Decimal::from_str(quantity.trim())
        .map_err(|e| format!("Invalid quantity '{}': {}", quantity, e))?;
    to_json(&set_allocation(&plan, &BatchId::from(batch_id), quantity))
}

fn fill_batch_inner(
    request_json: &str,
    plan_json: &str,
    batch_id: &str,
    policy_json: Option<&str>,
) -> Result<String, String> {
    let (_, ctx, batches) = parse_frame(request_json)?;
    let plan = parse_plan(plan_json)?;
    let policy = parse_policy(policy_json)?;
    let filled = fill_batch(&ctx, &batches, &plan, &BatchId::from(batch_id), &policy)
        .map_err(|e| e.to_string())?;
    to_json(&filled)
}

fn summary_inner(
    request_json: &str,
    plan_json: &str,
    policy_json: Option<&str>,
) -> Result<String, String> {
    let (_, ctx, batches) = parse_frame(request_json)?;
    let plan = parse_plan(plan_json)?;
    let policy = parse_policy(policy_json)?;
    let summary = summarize(&ctx, &batches, &plan, &policy).map_err(|e| e.to_string())?;
    to_json(&summary)
}

fn issue_payload_inner(
    request_json: &str,
    plan_json: &str,
    notes: Option<&str>,
    policy_json: Option<&str>,
) -> Result<String, String> {
    let (request, ctx, batches) = parse_frame(request_json)?;
    let plan = parse_plan(plan_json)?;
    let policy = parse_policy(policy_json)?;
    let payload = prepare_issuance(request.status, &ctx, &batches, &plan, notes, &policy)
        .map_err(|e| e.to_string())?;
    to_json(&payload)
}

fn to_js_error(message: String) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&message));
    js_sys::Error::new(&message).into()
}

/// Auto-fill a plan; returns `{result, summary}`
#[wasm_bindgen]
pub fn auto_fill_allocation(request_json: &str, policy_json: Option<String>) -> Result<String, JsValue> {
    auto_fill_inner(request_json, policy_json.as_deref()).map_err(to_js_error)
}

/// Validate a plan against the request snapshot
#[wasm_bindgen]
pub fn validate_allocation(
    request_json: &str,
    plan_json: &str,
    policy_json: Option<String>,
) -> Result<String, JsValue> {
    validate_inner(request_json, plan_json, policy_json.as_deref()).map_err(to_js_error)
}

/// Set one row; `quantity` is a decimal string so no precision is lost
#[wasm_bindgen]
pub fn set_batch_allocation(plan_json: &str, batch_id: &str, quantity: &str) -> Result<String, JsValue> {
    set_allocation_inner(plan_json, batch_id, quantity).map_err(to_js_error)
}

/// The per-row "max" button
#[wasm_bindgen]
pub fn fill_batch_allocation(
    request_json: &str,
    plan_json: &str,
    batch_id: &str,
    policy_json: Option<String>,
) -> Result<String, JsValue> {
    fill_batch_inner(request_json, plan_json, batch_id, policy_json.as_deref()).map_err(to_js_error)
}

/// Dialog header figures for the current plan
#[wasm_bindgen]
pub fn allocation_summary(
    request_json: &str,
    plan_json: &str,
    policy_json: Option<String>,
) -> Result<String, JsValue> {
    summary_inner(request_json, plan_json, policy_json.as_deref()).map_err(to_js_error)
}

/// IssueStock payload for a valid plan
#[wasm_bindgen]
pub fn issue_stock_payload(
    request_json: &str,
    plan_json: &str,
    notes: Option<String>,
    policy_json: Option<String>,
) -> Result<String, JsValue> {
    issue_payload_inner(
        request_json,
        plan_json,
        notes.as_deref(),
        policy_json.as_deref(),
    )
    .map_err(to_js_error)
}
