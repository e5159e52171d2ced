//! Error types for the allocation engine

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{RejectionReason, RequestStatus};
use crate::types::BatchId;

/// Every allocation failure is recoverable by the caller: re-run auto-fill,
/// edit the plan, or retry issuance against a fresh snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("Invalid allocation context: {0}")]
    InvalidContext(String),

    #[error("Insufficient stock: short by {shortfall}")]
    InsufficientStock { shortfall: Decimal },

    #[error("Stock exhausted before the request was covered: short by {shortfall}")]
    PartialAllocation { shortfall: Decimal },

    #[error("Batch {batch_id} over-allocated: {allocated} allocated, {remaining} remaining")]
    OverAllocation {
        batch_id: BatchId,
        allocated: Decimal,
        remaining: Decimal,
    },

    #[error("Invalid allocation for batch {batch_id}: {reason}")]
    InvalidPlan { batch_id: BatchId, reason: String },

    #[error("Allocated total differs from the requested quantity by {difference}")]
    ValidationMismatch { difference: Decimal },

    #[error("Allocation plan is empty")]
    EmptyPlan,

    #[error("Request is {status}; only pending requests can be allocated")]
    RequestNotPending { status: RequestStatus },

    #[error("Cannot move request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("Issuance rejected: {0}")]
    IssuanceRejected(RejectionReason),
}

/// Result alias for engine operations
pub type EngineResult<T> = Result<T, AllocationError>;
