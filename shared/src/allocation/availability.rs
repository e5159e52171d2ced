//! Availability aggregation and dialog summary figures

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{checked_total, out_of_range, AllocationContext, AllocationPlan, Batch};
use crate::types::{AllocationPolicy, UnknownUnitPolicy};

/// Total stock across `batches`, in the primary unit
pub fn total_available(
    batches: &[Batch],
    ctx: &AllocationContext,
    unknown_unit: UnknownUnitPolicy,
) -> EngineResult<Decimal> {
    checked_total(
        batches
            .iter()
            .map(|batch| batch.canonical_remaining(ctx, unknown_unit)),
    )
}

/// Canonical sum of the plan entries that match a batch in the snapshot.
/// Entries for unknown ids contribute nothing.
pub fn allocated_canonical(
    batches: &[Batch],
    ctx: &AllocationContext,
    plan: &AllocationPlan,
    unknown_unit: UnknownUnitPolicy,
) -> EngineResult<Decimal> {
    let mut seen = std::collections::HashSet::new();
    checked_total(
        batches
            .iter()
            .filter(|batch| seen.insert(&batch.id))
            .filter_map(|batch| {
                plan.get(&batch.id)
                    .map(|qty| ctx.to_canonical(batch.unit_tag, qty, unknown_unit))
            }),
    )
}

/// Header figures for the issuance dialog, all in the primary unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSummary {
    pub packets_needed: Decimal,
    pub packets_requested: Decimal,
    pub excess: Decimal,
    pub total_available: Decimal,
    pub total_allocated: Decimal,
    /// Requested minus allocated; negative when over-allocated
    pub remaining: Decimal,
}

pub fn summarize(
    ctx: &AllocationContext,
    batches: &[Batch],
    plan: &AllocationPlan,
    policy: &AllocationPolicy,
) -> EngineResult<AllocationSummary> {
    let total_allocated = allocated_canonical(batches, ctx, plan, policy.unknown_unit)?;
    let remaining = ctx
        .packets_requested()
        .checked_sub(total_allocated)
        .ok_or_else(|| out_of_range(total_allocated))?;

    Ok(AllocationSummary {
        packets_needed: ctx.packets_needed(),
        packets_requested: ctx.packets_requested(),
        excess: ctx.excess(),
        total_available: total_available(batches, ctx, policy.unknown_unit)?,
        total_allocated,
        remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitTag;
    use crate::types::{BatchId, UnitId};

    fn ctx() -> AllocationContext {
        AllocationContext::new(
            Decimal::from(80),
            Decimal::from(100),
            Some(UnitId::from("packet")),
            Some(UnitId::from("seed")),
            Some(Decimal::from(100)),
        )
        .unwrap()
    }

    fn batches() -> Vec<Batch> {
        vec![
            Batch::new("a", "A-1", UnitTag::Primary, Decimal::from(60)),
            Batch::new("b", "B-1", UnitTag::Secondary, Decimal::from(6000)),
            Batch::new("c", "C-1", UnitTag::Unknown, Decimal::from(5)),
        ]
    }

    #[test]
    fn test_total_available_converts_units() {
        assert_eq!(
            total_available(&batches(), &ctx(), UnknownUnitPolicy::TreatAsPrimary),
            Ok(Decimal::from(125))
        );
        assert_eq!(
            total_available(&batches(), &ctx(), UnknownUnitPolicy::Exclude),
            Ok(Decimal::from(120))
        );
    }

    #[test]
    fn test_total_available_empty() {
        assert_eq!(
            total_available(&[], &ctx(), UnknownUnitPolicy::TreatAsPrimary),
            Ok(Decimal::ZERO)
        );
    }

    #[test]
    fn test_summary() {
        let plan = AllocationPlan::new()
            .with_allocation(BatchId::from("a"), Decimal::from(60))
            .with_allocation(BatchId::from("b"), Decimal::from(3000))
            .with_allocation(BatchId::from("ghost"), Decimal::from(99));

        let summary = summarize(&ctx(), &batches(), &plan, &AllocationPolicy::default()).unwrap();
        assert_eq!(summary.excess, Decimal::from(20));
        assert_eq!(summary.total_allocated, Decimal::from(90));
        assert_eq!(summary.remaining, Decimal::from(10));
        assert_eq!(summary.total_available, Decimal::from(125));
    }

    #[test]
    fn test_total_available_overflow_is_an_error() {
        let huge = Decimal::MAX;
        let batches = vec![
            Batch::new("a", "A-1", UnitTag::Primary, huge),
            Batch::new("b", "B-1", UnitTag::Primary, huge),
        ];
        assert!(matches!(
            total_available(&batches, &ctx(), UnknownUnitPolicy::TreatAsPrimary),
            Err(crate::error::AllocationError::InvalidContext(_))
        ));
    }
}
