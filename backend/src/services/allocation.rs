//! Allocation service: auto-fill, validation, manual edits and issuance
//! for one sowing request at a time
//!
//! Every call re-reads the request from the inventory system, so plans are
//! always checked against the freshest batch snapshot available.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    auto_fill, fill_batch, prepare_issuance, set_allocation, summarize, validate,
    AllocationContext, AllocationError, AllocationPlan, AllocationPolicy, AllocationResult,
    AllocationSummary, Batch, BatchId, Discrepancy, IssuanceOutcome, RequestStatus,
    SowingRequest, StockAllocation, ValidationResult,
};
use validator::Validate;

use crate::error::AppResult;
use crate::external::StockGateway;

/// Allocation service over a stock gateway
#[derive(Clone)]
pub struct AllocationService<G> {
    gateway: G,
    policy: AllocationPolicy,
}

/// Request header shown above the batch table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOverview {
    pub request_id: String,
    pub request_number: String,
    pub plant_name: String,
    pub subtype_name: Option<String>,
    pub unit_name: Option<String>,
    pub status: RequestStatus,
}

/// Response of the auto-fill endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFillResponse {
    pub request: RequestOverview,
    pub batches: Vec<Batch>,
    pub result: AllocationResult,
    /// Figures for the offered plan, or for an empty plan when none is offered
    pub summary: AllocationSummary,
}

/// Response of validate and adjust
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub plan: AllocationPlan,
    pub summary: AllocationSummary,
    pub validation: ValidationResult,
    pub discrepancy: Discrepancy,
}

/// Input for validating a client-side plan
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePlanInput {
    pub plan: AllocationPlan,
}

/// Input for a manual row edit. Without `quantity` the row is filled to the
/// most it can contribute.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustAllocationInput {
    #[serde(default)]
    pub plan: AllocationPlan,
    #[validate(length(min = 1, max = 64, message = "Batch id must be 1-64 characters"))]
    pub batch_id: String,
    pub quantity: Option<Decimal>,
}

/// Input for issuing stock
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueStockInput {
    pub plan: AllocationPlan,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

/// Receipt for an accepted issuance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStockReceipt {
    pub request_id: String,
    pub status: RequestStatus,
    pub message: String,
    pub allocations: Vec<StockAllocation>,
    pub issued_at: DateTime<Utc>,
}

struct Snapshot {
    request: SowingRequest,
    ctx: AllocationContext,
    batches: Vec<Batch>,
}

impl<G: StockGateway> AllocationService<G> {
    pub fn new(gateway: G, policy: AllocationPolicy) -> Self {
        Self { gateway, policy }
    }

    async fn snapshot(&self, request_id: &str) -> AppResult<Snapshot> {
        let request = self.gateway.get_request(request_id).await?;
        let (ctx, batches) = request.allocation_frame()?;
        Ok(Snapshot {
            request,
            ctx,
            batches,
        })
    }

    fn report(&self, snapshot: &Snapshot, plan: AllocationPlan) -> AppResult<PlanReport> {
        let validation = validate(&snapshot.ctx, &snapshot.batches, &plan, &self.policy)?;
        let summary = summarize(&snapshot.ctx, &snapshot.batches, &plan, &self.policy)?;
        Ok(PlanReport {
            discrepancy: validation.discrepancy(),
            plan,
            summary,
            validation,
        })
    }

    /// Run auto-fill against a fresh snapshot
    pub async fn auto_fill(&self, request_id: &str) -> AppResult<AutoFillResponse> {
        let snapshot = self.snapshot(request_id).await?;
        let result = auto_fill(&snapshot.ctx, &snapshot.batches, &self.policy)?;

        let empty = AllocationPlan::new();
        let summary = summarize(
            &snapshot.ctx,
            &snapshot.batches,
            result.plan().unwrap_or(&empty),
            &self.policy,
        )?;

        match &result {
            AllocationResult::Full { plan } => {
                tracing::info!(%request_id, rows = plan.len(), "auto-fill covered request")
            }
            other => tracing::warn!(
                %request_id,
                shortfall = %other.shortfall(),
                "auto-fill could not cover request"
            ),
        }

        let Snapshot {
            request, batches, ..
        } = snapshot;

        Ok(AutoFillResponse {
            request: RequestOverview {
                request_id: request_id.to_string(),
                request_number: request.request_number,
                plant_name: request.plant_name,
                subtype_name: request.subtype_name,
                unit_name: request.unit_name,
                status: request.status,
            },
            batches,
            result,
            summary,
        })
    }

    /// Validate a client-side plan
    pub async fn validate(&self, request_id: &str, input: ValidatePlanInput) -> AppResult<PlanReport> {
        input.validate()?;
        let snapshot = self.snapshot(request_id).await?;
        self.report(&snapshot, input.plan)
    }

    /// Apply one manual edit and report the resulting plan
    pub async fn adjust(
        &self,
        request_id: &str,
        input: AdjustAllocationInput,
    ) -> AppResult<PlanReport> {
        input.validate()?;
        let snapshot = self.snapshot(request_id).await?;
        let batch_id = BatchId::new(input.batch_id);

        let plan = match input.quantity {
            Some(quantity) => set_allocation(&input.plan, &batch_id, quantity),
            None => fill_batch(
                &snapshot.ctx,
                &snapshot.batches,
                &input.plan,
                &batch_id,
                &self.policy,
            )?,
        };

        tracing::debug!(%request_id, %batch_id, quantity = %plan.quantity(&batch_id), "plan row adjusted");
        self.report(&snapshot, plan)
    }

    /// Validate against a fresh snapshot and hand the plan to the executor
    pub async fn issue(&self, request_id: &str, input: IssueStockInput) -> AppResult<IssueStockReceipt> {
        input.validate()?;
        let snapshot = self.snapshot(request_id).await?;

        let payload = prepare_issuance(
            snapshot.request.status,
            &snapshot.ctx,
            &snapshot.batches,
            &input.plan,
            input.notes.as_deref(),
            &self.policy,
        )?;

        tracing::info!(%request_id, rows = payload.allocations.len(), "issuing stock");
        let outcome = self.gateway.issue_stock(request_id, &payload).await?;
        let status = snapshot.request.status.after_issuance(&outcome)?;

        match outcome {
            IssuanceOutcome::Accepted { message } => {
                tracing::info!(%request_id, %status, "stock issued");
                Ok(IssueStockReceipt {
                    request_id: request_id.to_string(),
                    status,
                    message,
                    allocations: payload.allocations,
                    issued_at: Utc::now(),
                })
            }
            IssuanceOutcome::Rejected { reason } => {
                tracing::warn!(%request_id, %reason, "issuance rejected");
                Err(AllocationError::IssuanceRejected(reason).into())
            }
        }
    }
}
