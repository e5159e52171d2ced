//! Preparing a plan for the external issuance executor

use tracing::debug;

use crate::error::EngineResult;
use crate::models::{AllocationContext, AllocationPlan, Batch, IssueStockRequest, RequestStatus};
use crate::types::AllocationPolicy;
use crate::validation::validate;

/// Turn a plan into an IssueStock payload.
///
/// The request must still be pending and the plan must validate against
/// `batches`. Zero rows are dropped and blank notes are omitted. Callers
/// should pass the freshest snapshot they have; the executor re-checks
/// stock atomically at commit time anyway.
pub fn prepare_issuance(
    status: RequestStatus,
    ctx: &AllocationContext,
    batches: &[Batch],
    plan: &AllocationPlan,
    notes: Option<&str>,
    policy: &AllocationPolicy,
) -> EngineResult<IssueStockRequest> {
    status.ensure_allocatable()?;
    validate(ctx, batches, plan, policy)?.ensure_valid()?;

    let allocations = plan.to_allocations();
    debug!(rows = allocations.len(), "plan ready for issuance");

    Ok(IssueStockRequest {
        allocations,
        notes: notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AllocationError;
    use crate::models::UnitTag;
    use crate::types::{BatchId, UnitId};
    use rust_decimal::Decimal;

    fn ctx() -> AllocationContext {
        AllocationContext::primary_only(Decimal::from(30), UnitId::from("packet")).unwrap()
    }

    fn batches() -> Vec<Batch> {
        vec![
            Batch::new("a", "A", UnitTag::Primary, Decimal::from(20)),
            Batch::new("b", "B", UnitTag::Primary, Decimal::from(20)),
        ]
    }

    #[test]
    fn test_valid_plan_becomes_payload() {
        let plan = AllocationPlan::new()
            .with_allocation(BatchId::from("b"), Decimal::from(10))
            .with_allocation(BatchId::from("a"), Decimal::from(20));

        let payload = prepare_issuance(
            RequestStatus::Pending,
            &ctx(),
            &batches(),
            &plan,
            Some("  first sowing  "),
            &AllocationPolicy::default(),
        )
        .unwrap();

        assert_eq!(payload.allocations.len(), 2);
        assert_eq!(payload.allocations[0].batch_id, BatchId::from("a"));
        assert_eq!(payload.notes.as_deref(), Some("first sowing"));
    }

    #[test]
    fn test_invalid_plan_is_refused() {
        let plan = AllocationPlan::new().with_allocation(BatchId::from("a"), Decimal::from(25));
        let result = prepare_issuance(
            RequestStatus::Pending,
            &ctx(),
            &batches(),
            &plan,
            None,
            &AllocationPolicy::default(),
        );
        assert!(matches!(result, Err(AllocationError::OverAllocation { .. })));
    }

    #[test]
    fn test_cancelled_request_is_refused() {
        let plan = AllocationPlan::new()
            .with_allocation(BatchId::from("a"), Decimal::from(20))
            .with_allocation(BatchId::from("b"), Decimal::from(10));
        let result = prepare_issuance(
            RequestStatus::Cancelled,
            &ctx(),
            &batches(),
            &plan,
            Some("   "),
            &AllocationPolicy::default(),
        );
        assert_eq!(
            result,
            Err(AllocationError::RequestNotPending {
                status: RequestStatus::Cancelled
            })
        );
    }
}
