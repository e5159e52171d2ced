//! Greedy auto-fill planner

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::total_available;
use crate::error::{AllocationError, EngineResult};
use crate::models::{out_of_range, AllocationContext, AllocationPlan, Batch};
use crate::types::{
    round_quantity, truncate_quantity, within_tolerance, AllocationPolicy, ShortfallPolicy,
    SortPolicy, EPSILON,
};

/// Outcome of auto-fill. Shortfalls are in the primary unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AllocationResult {
    /// Plan covers the request within tolerance
    Full { plan: AllocationPlan },
    /// Stock cannot cover the request; no plan is offered
    Insufficient { shortfall: Decimal },
    /// Batches ran out first; the plan is kept for manual completion.
    /// With a secondary unit coarser than the primary one this can also
    /// happen while stock covers the request: takes are truncated to
    /// 0.01 of the batch unit, so up to that much per batch is left over.
    Partial {
        plan: AllocationPlan,
        shortfall: Decimal,
    },
}

impl AllocationResult {
    pub fn is_full(&self) -> bool {
        matches!(self, AllocationResult::Full { .. })
    }

    pub fn plan(&self) -> Option<&AllocationPlan> {
        match self {
            AllocationResult::Full { plan } | AllocationResult::Partial { plan, .. } => Some(plan),
            AllocationResult::Insufficient { .. } => None,
        }
    }

    pub fn shortfall(&self) -> Decimal {
        match self {
            AllocationResult::Full { .. } => Decimal::ZERO,
            AllocationResult::Insufficient { shortfall }
            | AllocationResult::Partial { shortfall, .. } => *shortfall,
        }
    }

    /// The plan of a full result; anything else becomes an error
    pub fn into_plan(self) -> EngineResult<AllocationPlan> {
        match self {
            AllocationResult::Full { plan } => Ok(plan),
            AllocationResult::Insufficient { shortfall } => {
                Err(AllocationError::InsufficientStock { shortfall })
            }
            AllocationResult::Partial { shortfall, .. } => {
                Err(AllocationError::PartialAllocation { shortfall })
            }
        }
    }
}

/// Distribute the requested quantity across `batches`, largest first.
///
/// Each take is rounded to 2 dp in the batch's own unit and the remainder
/// is reduced by the canonical value of the rounded take, so rounding on
/// one batch is absorbed by the next. Only a non-empty plan is `Full`.
#[instrument(level = "debug", skip(ctx, batches), fields(
    requested = %ctx.packets_requested(),
    batch_count = batches.len()
))]
pub fn auto_fill(
    ctx: &AllocationContext,
    batches: &[Batch],
    policy: &AllocationPolicy,
) -> EngineResult<AllocationResult> {
    let requested = ctx.packets_requested();
    let available = total_available(batches, ctx, policy.unknown_unit)?;

    if policy.shortfall == ShortfallPolicy::Block && available < requested - EPSILON {
        let shortfall = requested - available;
        debug!(%available, %shortfall, "auto-fill blocked by insufficient stock");
        return Ok(AllocationResult::Insufficient { shortfall });
    }

    let mut remaining = requested;
    let mut plan = AllocationPlan::new();

    for (available_canonical, batch) in ordered_candidates(batches, ctx, policy)? {
        if remaining <= Decimal::ZERO || within_tolerance(remaining) {
            break;
        }
        if available_canonical <= Decimal::ZERO {
            continue;
        }

        let take_canonical = remaining.min(available_canonical);
        let quantity = batch_quantity(ctx, batch, policy, take_canonical)?;
        if quantity <= Decimal::ZERO {
            continue;
        }

        let taken = ctx.to_canonical(batch.unit_tag, quantity, policy.unknown_unit)?;
        remaining = remaining
            .checked_sub(taken)
            .ok_or_else(|| out_of_range(taken))?;
        debug!(batch_id = %batch.id, %quantity, %remaining, "allocated from batch");
        plan = plan.with_allocation(batch.id.clone(), quantity);
    }

    let result = if plan.is_empty() {
        AllocationResult::Insufficient {
            shortfall: remaining,
        }
    } else if within_tolerance(remaining) {
        AllocationResult::Full { plan }
    } else {
        debug!(shortfall = %remaining, "batches exhausted before request was covered");
        AllocationResult::Partial {
            plan,
            shortfall: remaining,
        }
    };
    Ok(result)
}

/// Batches in visiting order with their canonical stock. `sort_by` is
/// stable, so ties keep input order.
fn ordered_candidates<'a>(
    batches: &'a [Batch],
    ctx: &AllocationContext,
    policy: &AllocationPolicy,
) -> EngineResult<Vec<(Decimal, &'a Batch)>> {
    let mut ordered = batches
        .iter()
        .map(|batch| Ok((batch.canonical_remaining(ctx, policy.unknown_unit)?, batch)))
        .collect::<EngineResult<Vec<_>>>()?;

    match policy.sort {
        SortPolicy::RawQuantityDescending => {
            ordered.sort_by(|(_, a), (_, b)| b.remaining_quantity.cmp(&a.remaining_quantity));
        }
        SortPolicy::CanonicalQuantityDescending => {
            ordered.sort_by(|(a, _), (b, _)| b.cmp(a));
        }
    }
    Ok(ordered)
}

/// Convert a canonical take into a 2 dp quantity in the batch's unit.
///
/// Never exceeds the batch's remaining stock, and never overshoots the
/// take by a full tolerance step (possible when one secondary unit is
/// worth several primary units); both cases truncate instead of rounding.
pub(crate) fn batch_quantity(
    ctx: &AllocationContext,
    batch: &Batch,
    policy: &AllocationPolicy,
    take_canonical: Decimal,
) -> EngineResult<Decimal> {
    let exact = if take_canonical >= batch.canonical_remaining(ctx, policy.unknown_unit)? {
        batch.remaining_quantity
    } else {
        ctx.to_batch_unit(batch.unit_tag, take_canonical)?
    };

    let rounded = round_quantity(exact);
    let overshoot =
        ctx.to_canonical(batch.unit_tag, rounded, policy.unknown_unit)? - take_canonical;

    if rounded > batch.remaining_quantity || overshoot >= EPSILON {
        Ok(truncate_quantity(exact).min(batch.remaining_quantity))
    } else {
        Ok(rounded)
    }
}
