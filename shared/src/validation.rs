//! Plan validation
//!
//! Checks a plan against the snapshot it was built from: per-batch caps,
//! the exact-sum rule within tolerance, and non-emptiness. Validation never
//! repairs a plan; every failure is reported so the caller can show it.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AllocationError, EngineResult};
use crate::models::{out_of_range, AllocationContext, AllocationPlan, Batch, UnitTag};
use crate::types::{within_tolerance, AllocationPolicy, BatchId, UnknownUnitPolicy};

/// What is wrong with a single plan row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// More than the batch holds
    OverAllocation {
        allocated: Decimal,
        remaining: Decimal,
    },
    NegativeQuantity {
        allocated: Decimal,
    },
    /// Plan refers to a batch missing from the snapshot
    UnknownBatch,
    /// Positive allocation to an unclassified batch while such batches are excluded
    ExcludedUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchViolation {
    pub batch_id: BatchId,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl BatchViolation {
    fn into_error(self) -> AllocationError {
        match self.kind {
            ViolationKind::OverAllocation {
                allocated,
                remaining,
            } => AllocationError::OverAllocation {
                batch_id: self.batch_id,
                allocated,
                remaining,
            },
            ViolationKind::NegativeQuantity { allocated } => AllocationError::InvalidPlan {
                batch_id: self.batch_id,
                reason: format!("negative quantity {}", allocated),
            },
            ViolationKind::UnknownBatch => AllocationError::InvalidPlan {
                batch_id: self.batch_id,
                reason: "batch is not part of this request".to_string(),
            },
            ViolationKind::ExcludedUnit => AllocationError::InvalidPlan {
                batch_id: self.batch_id,
                reason: "batch unit matches neither request unit".to_string(),
            },
        }
    }
}

/// Signed gap between requested and allocated, for "under by X" / "over by X"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "amount", rename_all = "snake_case")]
pub enum Discrepancy {
    Exact,
    Under(Decimal),
    Over(Decimal),
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discrepancy::Exact => write!(f, "exact"),
            Discrepancy::Under(amount) => write!(f, "under by {}", amount),
            Discrepancy::Over(amount) => write!(f, "over by {}", amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub requested: Decimal,
    /// Canonical sum of the plan rows that match a batch
    pub total_allocated: Decimal,
    /// `requested - total_allocated`
    pub difference: Decimal,
    pub violations: Vec<BatchViolation>,
}

impl ValidationResult {
    pub fn discrepancy(&self) -> Discrepancy {
        if within_tolerance(self.difference) {
            Discrepancy::Exact
        } else if self.difference > Decimal::ZERO {
            Discrepancy::Under(self.difference)
        } else {
            Discrepancy::Over(-self.difference)
        }
    }

    /// Batch ids carrying at least one violation, in report order
    pub fn violating_batches(&self) -> Vec<&BatchId> {
        self.violations.iter().map(|v| &v.batch_id).collect()
    }

    /// First blocking problem as an error; row errors come before sum errors
    pub fn ensure_valid(&self) -> EngineResult<()> {
        if let Some(violation) = self.violations.first() {
            return Err(violation.clone().into_error());
        }
        if self.total_allocated <= Decimal::ZERO {
            return Err(AllocationError::EmptyPlan);
        }
        if !within_tolerance(self.difference) {
            return Err(AllocationError::ValidationMismatch {
                difference: self.difference,
            });
        }
        Ok(())
    }
}

/// Validate `plan` against the batch snapshot. Rule breaches are reported
/// in the result; only quantities outside the decimal range are errors.
pub fn validate(
    ctx: &AllocationContext,
    batches: &[Batch],
    plan: &AllocationPlan,
    policy: &AllocationPolicy,
) -> EngineResult<ValidationResult> {
    let mut known: HashSet<&BatchId> = HashSet::new();
    let mut violations = Vec::new();
    let mut total_allocated = Decimal::ZERO;

    for batch in batches {
        if !known.insert(&batch.id) {
            continue;
        }
        let Some(allocated) = plan.get(&batch.id) else {
            continue;
        };

        if allocated < Decimal::ZERO {
            violations.push(BatchViolation {
                batch_id: batch.id.clone(),
                kind: ViolationKind::NegativeQuantity { allocated },
            });
        } else if allocated > batch.remaining_quantity {
            violations.push(BatchViolation {
                batch_id: batch.id.clone(),
                kind: ViolationKind::OverAllocation {
                    allocated,
                    remaining: batch.remaining_quantity,
                },
            });
        }

        if batch.unit_tag == UnitTag::Unknown
            && policy.unknown_unit == UnknownUnitPolicy::Exclude
            && allocated > Decimal::ZERO
        {
            violations.push(BatchViolation {
                batch_id: batch.id.clone(),
                kind: ViolationKind::ExcludedUnit,
            });
        }

        let canonical = ctx.to_canonical(batch.unit_tag, allocated, policy.unknown_unit)?;
        total_allocated = total_allocated
            .checked_add(canonical)
            .ok_or_else(|| out_of_range(canonical))?;
    }

    for (batch_id, quantity) in plan.iter() {
        if !known.contains(batch_id) && !quantity.is_zero() {
            violations.push(BatchViolation {
                batch_id: batch_id.clone(),
                kind: ViolationKind::UnknownBatch,
            });
        }
    }

    let requested = ctx.packets_requested();
    let difference = requested
        .checked_sub(total_allocated)
        .ok_or_else(|| out_of_range(total_allocated))?;
    let valid = within_tolerance(difference)
        && violations.is_empty()
        && total_allocated > Decimal::ZERO;

    Ok(ValidationResult {
        valid,
        requested,
        total_allocated,
        difference,
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitId;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ctx(requested: &str) -> AllocationContext {
        AllocationContext::new(
            dec(requested),
            dec(requested),
            Some(UnitId::from("packet")),
            Some(UnitId::from("seed")),
            Some(Decimal::from(100)),
        )
        .unwrap()
    }

    fn batches() -> Vec<Batch> {
        vec![
            Batch::new("a", "A", UnitTag::Primary, dec("60")),
            Batch::new("b", "B", UnitTag::Secondary, dec("6000")),
            Batch::new("u", "U", UnitTag::Unknown, dec("10")),
        ]
    }

    fn plan(entries: &[(&str, &str)]) -> AllocationPlan {
        entries
            .iter()
            .map(|(id, qty)| (BatchId::from(*id), dec(qty)))
            .collect()
    }

    // ========================================================================
    // Sum checks
    // ========================================================================

    #[test]
    fn test_exact_plan_is_valid() {
        let result = validate(
            &ctx("100"),
            &batches(),
            &plan(&[("a", "60"), ("b", "4000")]),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(result.valid);
        assert_eq!(result.difference, Decimal::ZERO);
        assert_eq!(result.discrepancy(), Discrepancy::Exact);
        assert!(result.ensure_valid().is_ok());
    }

    #[test]
    fn test_under_allocation_reports_signed_difference() {
        let result = validate(
            &ctx("100"),
            &batches(),
            &plan(&[("a", "50")]),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(!result.valid);
        assert_eq!(result.discrepancy(), Discrepancy::Under(dec("50")));
        assert_eq!(
            result.ensure_valid(),
            Err(AllocationError::ValidationMismatch {
                difference: dec("50")
            })
        );
    }

    #[test]
    fn test_over_allocation_of_total() {
        let result = validate(
            &ctx("10"),
            &batches(),
            &plan(&[("a", "12")]),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(!result.valid);
        assert_eq!(result.discrepancy().to_string(), "over by 2");
    }

    #[test]
    fn test_difference_inside_tolerance_is_valid() {
        let result = validate(
            &ctx("25.005"),
            &batches(),
            &plan(&[("a", "25.01")]),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(result.valid);
        assert!(result.difference.abs() < dec("0.01"));
    }

    #[test]
    fn test_empty_plan_is_invalid() {
        let result = validate(
            &ctx("10"),
            &batches(),
            &AllocationPlan::new(),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(!result.valid);
        assert_eq!(result.ensure_valid(), Err(AllocationError::EmptyPlan));
    }

    // ========================================================================
    // Row checks
    // ========================================================================

    #[test]
    fn test_batch_over_allocation_is_a_violation() {
        let result = validate(
            &ctx("65"),
            &batches(),
            &plan(&[("a", "65")]),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(!result.valid);
        assert_eq!(result.violating_batches(), vec![&BatchId::from("a")]);
        assert!(matches!(
            result.ensure_valid(),
            Err(AllocationError::OverAllocation { .. })
        ));
    }

    #[test]
    fn test_negative_quantity_is_a_violation() {
        let result = validate(
            &ctx("10"),
            &batches(),
            &plan(&[("a", "20"), ("b", "-1000")]),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(!result.valid);
        assert_eq!(
            result.violations[0].kind,
            ViolationKind::NegativeQuantity {
                allocated: dec("-1000")
            }
        );
    }

    #[test]
    fn test_unknown_batch_is_a_violation() {
        let result = validate(
            &ctx("10"),
            &batches(),
            &plan(&[("a", "10"), ("zzz", "1")]),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(!result.valid);
        assert_eq!(result.total_allocated, dec("10"));
        assert_eq!(result.violations[0].kind, ViolationKind::UnknownBatch);
    }

    #[test]
    fn test_unknown_unit_follows_policy() {
        let legacy = validate(
            &ctx("10"),
            &batches(),
            &plan(&[("u", "10")]),
            &AllocationPolicy::default(),
        )
        .unwrap();
        assert!(legacy.valid);

        let strict = validate(
            &ctx("10"),
            &batches(),
            &plan(&[("u", "10")]),
            &AllocationPolicy {
                unknown_unit: UnknownUnitPolicy::Exclude,
                ..AllocationPolicy::default()
            },
        )
        .unwrap();
        assert!(!strict.valid);
        assert_eq!(strict.violations[0].kind, ViolationKind::ExcludedUnit);
    }

    #[test]
    fn test_out_of_range_plan_is_an_error() {
        let plan: AllocationPlan = [
            (BatchId::from("a"), Decimal::MAX),
            (BatchId::from("u"), Decimal::MAX),
        ]
        .into_iter()
        .collect();

        assert!(matches!(
            validate(&ctx("10"), &batches(), &plan, &AllocationPolicy::default()),
            Err(AllocationError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_violation_json_shape() {
        let violation = BatchViolation {
            batch_id: BatchId::from("a"),
            kind: ViolationKind::OverAllocation {
                allocated: dec("65"),
                remaining: dec("60"),
            },
        };
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["batchId"], "a");
        assert_eq!(json["kind"], "over_allocation");
    }
}
