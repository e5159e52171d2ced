//! Manual adjustment of a plan
//!
//! Setters are pure and never revalidate: callers follow each edit with
//! [`crate::validation::validate`].

use rust_decimal::Decimal;

use super::{allocated_canonical, planner::batch_quantity};
use crate::error::EngineResult;
use crate::models::{out_of_range, AllocationContext, AllocationPlan, Batch};
use crate::types::{AllocationPolicy, BatchId};

/// Replace the entry for `batch_id`; zero removes it. No clamping, so an
/// over-allocation stays visible to the validator as a row error.
pub fn set_allocation(plan: &AllocationPlan, batch_id: &BatchId, quantity: Decimal) -> AllocationPlan {
    plan.clone().with_allocation(batch_id.clone(), quantity)
}

/// Set one batch to the most it can contribute toward what the other rows
/// leave uncovered (the per-row "max" action). Unknown ids return the plan
/// unchanged.
pub fn fill_batch(
    ctx: &AllocationContext,
    batches: &[Batch],
    plan: &AllocationPlan,
    batch_id: &BatchId,
    policy: &AllocationPolicy,
) -> EngineResult<AllocationPlan> {
    let Some(batch) = batches.iter().find(|b| &b.id == batch_id) else {
        return Ok(plan.clone());
    };

    let others = plan.clone().with_allocation(batch_id.clone(), Decimal::ZERO);
    let covered = allocated_canonical(batches, ctx, &others, policy.unknown_unit)?;
    let uncovered = ctx
        .packets_requested()
        .checked_sub(covered)
        .ok_or_else(|| out_of_range(covered))?;
    let available = batch.canonical_remaining(ctx, policy.unknown_unit)?;

    if uncovered <= Decimal::ZERO || available <= Decimal::ZERO {
        return Ok(others);
    }

    let quantity = batch_quantity(ctx, batch, policy, uncovered.min(available))?;
    Ok(others.with_allocation(batch_id.clone(), quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitTag;
    use crate::types::UnitId;
    use crate::validation::validate;

    fn ctx() -> AllocationContext {
        AllocationContext::new(
            Decimal::from(100),
            Decimal::from(100),
            Some(UnitId::from("packet")),
            Some(UnitId::from("seed")),
            Some(Decimal::from(100)),
        )
        .unwrap()
    }

    fn batches() -> Vec<Batch> {
        vec![
            Batch::new("a", "A", UnitTag::Primary, Decimal::from(60)),
            Batch::new("b", "B", UnitTag::Secondary, Decimal::from(6000)),
        ]
    }

    #[test]
    fn test_set_allocation_does_not_touch_original() {
        let original = AllocationPlan::new().with_allocation(BatchId::from("a"), Decimal::from(60));
        let edited = set_allocation(&original, &BatchId::from("a"), Decimal::from(10));

        assert_eq!(original.quantity(&BatchId::from("a")), Decimal::from(60));
        assert_eq!(edited.quantity(&BatchId::from("a")), Decimal::from(10));
    }

    #[test]
    fn test_set_allocation_zero_removes() {
        let plan = AllocationPlan::new().with_allocation(BatchId::from("a"), Decimal::from(60));
        let edited = set_allocation(&plan, &BatchId::from("a"), Decimal::ZERO);
        assert!(!edited.contains(&BatchId::from("a")));
    }

    #[test]
    fn test_set_allocation_keeps_over_allocation() {
        let plan = set_allocation(&AllocationPlan::new(), &BatchId::from("a"), Decimal::from(65));
        assert_eq!(plan.quantity(&BatchId::from("a")), Decimal::from(65));

        let result = validate(&ctx(), &batches(), &plan, &AllocationPolicy::default()).unwrap();
        assert_eq!(result.violating_batches(), vec![&BatchId::from("a")]);
    }

    #[test]
    fn test_fill_batch_covers_the_gap() {
        let plan = AllocationPlan::new().with_allocation(BatchId::from("a"), Decimal::from(60));
        let filled = fill_batch(
            &ctx(),
            &batches(),
            &plan,
            &BatchId::from("b"),
            &AllocationPolicy::default(),
        )
        .unwrap();

        assert_eq!(filled.quantity(&BatchId::from("b")), Decimal::from(4000));
        assert!(validate(&ctx(), &batches(), &filled, &AllocationPolicy::default()).unwrap().valid);
    }

    #[test]
    fn test_fill_batch_caps_at_stock() {
        let filled = fill_batch(
            &ctx(),
            &batches(),
            &AllocationPlan::new(),
            &BatchId::from("a"),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert_eq!(filled.quantity(&BatchId::from("a")), Decimal::from(60));
    }

    #[test]
    fn test_fill_batch_when_already_covered_clears_row() {
        let plan = AllocationPlan::new()
            .with_allocation(BatchId::from("b"), Decimal::from(6000))
            .with_allocation(BatchId::from("a"), Decimal::from(60));
        let filled = fill_batch(
            &ctx(),
            &batches(),
            &plan,
            &BatchId::from("a"),
            &AllocationPolicy::default(),
        )
        .unwrap();

        assert_eq!(filled.quantity(&BatchId::from("a")), Decimal::from(40));

        let covered = AllocationPlan::new().with_allocation(BatchId::from("a"), Decimal::from(100));
        let cleared = fill_batch(
            &ctx(),
            &batches(),
            &covered,
            &BatchId::from("b"),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(!cleared.contains(&BatchId::from("b")));
    }
}
