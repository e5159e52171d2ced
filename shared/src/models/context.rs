//! Unit/quantity frame for one allocation session

use rust_decimal::Decimal;
use serde::Serialize;

use super::UnitTag;
use crate::error::{AllocationError, EngineResult};
use crate::types::{UnitId, UnknownUnitPolicy, EPSILON};

/// The canonical (primary) unit frame an allocation is computed in
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationContext {
    packets_needed: Decimal,
    packets_requested: Decimal,
    primary_unit_id: Option<UnitId>,
    secondary_unit_id: Option<UnitId>,
    /// Secondary units per one primary unit
    conversion_factor: Decimal,
}

impl AllocationContext {
    /// Build a context, rejecting frames no allocation could satisfy
    pub fn new(
        packets_needed: Decimal,
        packets_requested: Decimal,
        primary_unit_id: Option<UnitId>,
        secondary_unit_id: Option<UnitId>,
        conversion_factor: Option<Decimal>,
    ) -> EngineResult<Self> {
        if packets_needed < Decimal::ZERO {
            return Err(AllocationError::InvalidContext(
                "packets needed cannot be negative".to_string(),
            ));
        }
        if packets_requested < EPSILON {
            return Err(AllocationError::InvalidContext(format!(
                "packets requested must be at least {}",
                EPSILON
            )));
        }
        if packets_requested < packets_needed {
            return Err(AllocationError::InvalidContext(format!(
                "packets requested ({}) is below packets needed ({})",
                packets_requested, packets_needed
            )));
        }

        let conversion_factor = match (&secondary_unit_id, conversion_factor) {
            (_, Some(factor)) if factor <= Decimal::ZERO => {
                return Err(AllocationError::InvalidContext(
                    "conversion factor must be positive".to_string(),
                ));
            }
            (_, Some(factor)) => factor,
            (Some(_), None) => {
                return Err(AllocationError::InvalidContext(
                    "a secondary unit requires a conversion factor".to_string(),
                ));
            }
            (None, None) => Decimal::ONE,
        };

        Ok(Self {
            packets_needed,
            packets_requested,
            primary_unit_id,
            secondary_unit_id,
            conversion_factor,
        })
    }

    /// Single-unit context with no excess, mostly handy for callers and tests
    pub fn primary_only(packets_requested: Decimal, primary_unit_id: UnitId) -> EngineResult<Self> {
        Self::new(
            packets_requested,
            packets_requested,
            Some(primary_unit_id),
            None,
            None,
        )
    }

    pub fn packets_needed(&self) -> Decimal {
        self.packets_needed
    }

    pub fn packets_requested(&self) -> Decimal {
        self.packets_requested
    }

    /// Amount requested on top of the minimum need
    pub fn excess(&self) -> Decimal {
        self.packets_requested - self.packets_needed
    }

    pub fn primary_unit_id(&self) -> Option<&UnitId> {
        self.primary_unit_id.as_ref()
    }

    pub fn secondary_unit_id(&self) -> Option<&UnitId> {
        self.secondary_unit_id.as_ref()
    }

    pub fn conversion_factor(&self) -> Decimal {
        self.conversion_factor
    }

    /// Classify a recorded unit id. Primary wins when both ids match.
    pub fn classify_unit(&self, unit_id: Option<&UnitId>) -> UnitTag {
        let Some(unit_id) = unit_id else {
            return UnitTag::Unknown;
        };
        if self.primary_unit_id.as_ref() == Some(unit_id) {
            UnitTag::Primary
        } else if self.secondary_unit_id.as_ref() == Some(unit_id) {
            UnitTag::Secondary
        } else {
            UnitTag::Unknown
        }
    }

    /// Express a batch-unit quantity in the primary unit
    pub fn to_canonical(
        &self,
        unit_tag: UnitTag,
        quantity: Decimal,
        unknown_unit: UnknownUnitPolicy,
    ) -> EngineResult<Decimal> {
        match (unit_tag, unknown_unit) {
            (UnitTag::Primary, _) => Ok(quantity),
            (UnitTag::Secondary, _) => quantity
                .checked_div(self.conversion_factor)
                .ok_or_else(|| out_of_range(quantity)),
            (UnitTag::Unknown, UnknownUnitPolicy::TreatAsPrimary) => Ok(quantity),
            (UnitTag::Unknown, UnknownUnitPolicy::Exclude) => Ok(Decimal::ZERO),
        }
    }

    /// Express a primary-unit quantity in a batch's own unit
    pub fn to_batch_unit(&self, unit_tag: UnitTag, canonical: Decimal) -> EngineResult<Decimal> {
        match unit_tag {
            UnitTag::Secondary => canonical
                .checked_mul(self.conversion_factor)
                .ok_or_else(|| out_of_range(canonical)),
            UnitTag::Primary | UnitTag::Unknown => Ok(canonical),
        }
    }
}

/// Error for a quantity whose conversion or sum leaves the decimal range
pub(crate) fn out_of_range(quantity: Decimal) -> AllocationError {
    AllocationError::InvalidContext(format!(
        "quantity {} cannot be converted between units",
        quantity
    ))
}

/// Overflow-checked sum of canonical quantities
pub(crate) fn checked_total(
    quantities: impl IntoIterator<Item = EngineResult<Decimal>>,
) -> EngineResult<Decimal> {
    quantities.into_iter().try_fold(Decimal::ZERO, |total, quantity| {
        let quantity = quantity?;
        total
            .checked_add(quantity)
            .ok_or_else(|| out_of_range(quantity))
    })
}
