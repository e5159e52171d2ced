//! Contract types for the external issuance executor

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::BatchId;

/// One line of an IssueStock call, in the batch's own unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAllocation {
    pub batch_id: BatchId,
    pub quantity: Decimal,
}

/// Payload of IssueStock(requestId, allocations, notes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStockRequest {
    pub allocations: Vec<StockAllocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Raw IssueStock response: `{success, message}`, optionally with a
/// machine-readable code and the offending batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStockResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub batch_id: Option<BatchId>,
}

/// Why the executor refused a locally valid plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Stock moved between validation and issuance
    InsufficientBatchQuantity { batch_id: BatchId },
    /// Server-side re-check of the plan failed
    ValidationMismatch,
    Other { message: String },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::InsufficientBatchQuantity { batch_id } => {
                write!(f, "insufficient quantity left in batch {}", batch_id)
            }
            RejectionReason::ValidationMismatch => {
                write!(f, "allocation does not match the requested quantity")
            }
            RejectionReason::Other { message } => write!(f, "{}", message),
        }
    }
}

/// Result of handing a plan to the executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IssuanceOutcome {
    Accepted { message: String },
    Rejected { reason: RejectionReason },
}

impl IssuanceOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IssuanceOutcome::Accepted { .. })
    }
}

impl From<IssueStockResponse> for IssuanceOutcome {
    fn from(response: IssueStockResponse) -> Self {
        if response.success {
            return IssuanceOutcome::Accepted {
                message: response.message,
            };
        }

        let code = response.code.as_deref().map(str::to_ascii_uppercase);
        let message = response.message.to_lowercase();

        let reason = match (code.as_deref(), response.batch_id) {
            (Some("INSUFFICIENT_BATCH_QUANTITY"), Some(batch_id)) => {
                RejectionReason::InsufficientBatchQuantity { batch_id }
            }
            (Some("VALIDATION_MISMATCH"), _) => RejectionReason::ValidationMismatch,
            // Older deployments only send prose
            (None, Some(batch_id)) if message.contains("insufficient") => {
                RejectionReason::InsufficientBatchQuantity { batch_id }
            }
            (None, _) if message.contains("must equal") || message.contains("mismatch") => {
                RejectionReason::ValidationMismatch
            }
            _ => RejectionReason::Other {
                message: response.message,
            },
        };

        IssuanceOutcome::Rejected { reason }
    }
}
