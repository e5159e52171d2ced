//! Sowing request snapshot and lifecycle

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{classify_batches, AllocationContext, Batch, BatchRecord, IssuanceOutcome};
use crate::allocation::total_available;
use crate::error::{AllocationError, EngineResult};
use crate::types::{UnitId, UnknownUnitPolicy};

/// Lifecycle of a sowing request: pending → issued | rejected | cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Issued,
    Rejected,
    Cancelled,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Issued => write!(f, "issued"),
            RequestStatus::Rejected => write!(f, "rejected"),
            RequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Only pending requests may be allocated or edited
    pub fn ensure_allocatable(&self) -> EngineResult<()> {
        if self.is_terminal() {
            return Err(AllocationError::RequestNotPending { status: *self });
        }
        Ok(())
    }

    /// Validate a lifecycle transition; terminal states never move
    pub fn transition(self, to: RequestStatus) -> EngineResult<RequestStatus> {
        if self.is_terminal() || to == RequestStatus::Pending {
            return Err(AllocationError::InvalidTransition { from: self, to });
        }
        Ok(to)
    }

    /// Status once the executor has answered. A rejection leaves the
    /// request pending so the plan can be corrected and retried.
    pub fn after_issuance(self, outcome: &IssuanceOutcome) -> EngineResult<RequestStatus> {
        match outcome {
            IssuanceOutcome::Accepted { .. } => self.transition(RequestStatus::Issued),
            IssuanceOutcome::Rejected { .. } => {
                self.ensure_allocatable()?;
                Ok(self)
            }
        }
    }
}

/// GetRequest(id) payload from the inventory API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SowingRequest {
    pub request_number: String,
    #[serde(default)]
    pub plant_name: String,
    #[serde(default)]
    pub subtype_name: Option<String>,
    pub packets_needed: Decimal,
    pub packets_requested: Decimal,
    #[serde(default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub primary_unit_id: Option<UnitId>,
    #[serde(default)]
    pub secondary_unit_id: Option<UnitId>,
    #[serde(default)]
    pub conversion_factor: Option<Decimal>,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub batches: Vec<BatchRecord>,
}

impl SowingRequest {
    /// Build the allocation frame for this request
    pub fn allocation_context(&self) -> EngineResult<AllocationContext> {
        AllocationContext::new(
            self.packets_needed,
            self.packets_requested,
            self.primary_unit_id.clone(),
            self.secondary_unit_id.clone(),
            self.conversion_factor,
        )
    }

    /// Context plus classified batches, refusing non-pending requests and
    /// snapshots whose stock cannot be totalled in the primary unit
    pub fn allocation_frame(&self) -> EngineResult<(AllocationContext, Vec<Batch>)> {
        self.status.ensure_allocatable()?;
        let ctx = self.allocation_context()?;
        let batches = classify_batches(&self.batches, &ctx);
        total_available(&batches, &ctx, UnknownUnitPolicy::TreatAsPrimary)?;
        Ok((ctx, batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RejectionReason;

    const REQUEST_JSON: &str = r#"{
        "requestNumber": "SR-0042",
        "plantName": "Tomato",
        "subtypeName": "Cherry",
        "packetsNeeded": 90,
        "packetsRequested": 100,
        "unitName": "packets",
        "primaryUnitId": 1,
        "secondaryUnitId": 2,
        "conversionFactor": 100,
        "batches": [
            {"id": 1, "batchNumber": "TOM-01", "remainingQuantity": 60, "unitId": 1},
            {"id": 2, "batchNumber": "TOM-02", "remainingQuantity": 6000, "unitId": 2}
        ]
    }"#;

    #[test]
    fn test_parse_request_defaults_to_pending() {
        let request: SowingRequest = serde_json::from_str(REQUEST_JSON).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        let (ctx, batches) = request.allocation_frame().unwrap();
        assert_eq!(ctx.excess(), Decimal::from(10));
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_issued_request_not_allocatable() {
        let mut request: SowingRequest = serde_json::from_str(REQUEST_JSON).unwrap();
        request.status = RequestStatus::Issued;
        assert_eq!(
            request.allocation_frame().unwrap_err(),
            AllocationError::RequestNotPending {
                status: RequestStatus::Issued
            }
        );
    }

    #[test]
    fn test_unconvertible_stock_rejected_up_front() {
        let mut request: SowingRequest = serde_json::from_str(REQUEST_JSON).unwrap();
        request.conversion_factor = Some(Decimal::new(1, 3));
        request.batches[1].remaining_quantity = Decimal::MAX;

        assert!(matches!(
            request.allocation_frame(),
            Err(AllocationError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_terminal_states_do_not_transition() {
        assert_eq!(
            RequestStatus::Pending.transition(RequestStatus::Cancelled),
            Ok(RequestStatus::Cancelled)
        );
        assert!(RequestStatus::Issued.transition(RequestStatus::Rejected).is_err());
        assert!(RequestStatus::Pending.transition(RequestStatus::Pending).is_err());
    }

    #[test]
    fn test_after_issuance() {
        let accepted = IssuanceOutcome::Accepted {
            message: "ok".to_string(),
        };
        let rejected = IssuanceOutcome::Rejected {
            reason: RejectionReason::ValidationMismatch,
        };

        assert_eq!(
            RequestStatus::Pending.after_issuance(&accepted),
            Ok(RequestStatus::Issued)
        );
        assert_eq!(
            RequestStatus::Pending.after_issuance(&rejected),
            Ok(RequestStatus::Pending)
        );
        assert!(RequestStatus::Cancelled.after_issuance(&accepted).is_err());
    }
}
