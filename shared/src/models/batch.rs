//! Stock batch models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AllocationContext;
use crate::error::EngineResult;
use crate::types::{BatchId, UnitId, UnknownUnitPolicy};

/// Which of the request's two units a batch is recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitTag {
    Primary,
    Secondary,
    Unknown,
}

impl std::fmt::Display for UnitTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitTag::Primary => write!(f, "Primary"),
            UnitTag::Secondary => write!(f, "Secondary"),
            UnitTag::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A batch as delivered by the inventory API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub id: BatchId,
    pub batch_number: String,
    pub remaining_quantity: Decimal,
    #[serde(default)]
    pub unit_id: Option<UnitId>,
}

/// A batch classified against an allocation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: BatchId,
    pub batch_number: String,
    pub unit_tag: UnitTag,
    /// In the batch's own unit
    pub remaining_quantity: Decimal,
}

impl Batch {
    pub fn new(
        id: impl Into<BatchId>,
        batch_number: impl Into<String>,
        unit_tag: UnitTag,
        remaining_quantity: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            batch_number: batch_number.into(),
            unit_tag,
            remaining_quantity,
        }
    }

    /// Classify a raw record once; the tag is fixed for the session
    pub fn classify(record: &BatchRecord, ctx: &AllocationContext) -> Self {
        Self {
            id: record.id.clone(),
            batch_number: record.batch_number.clone(),
            unit_tag: ctx.classify_unit(record.unit_id.as_ref()),
            remaining_quantity: record.remaining_quantity,
        }
    }

    /// Remaining stock expressed in the primary unit
    pub fn canonical_remaining(
        &self,
        ctx: &AllocationContext,
        unknown_unit: UnknownUnitPolicy,
    ) -> EngineResult<Decimal> {
        ctx.to_canonical(self.unit_tag, self.remaining_quantity, unknown_unit)
    }
}

/// Classify every record of a snapshot
pub fn classify_batches(records: &[BatchRecord], ctx: &AllocationContext) -> Vec<Batch> {
    records
        .iter()
        .map(|record| Batch::classify(record, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_batches_from_json() {
        let ctx = AllocationContext::new(
            Decimal::from(100),
            Decimal::from(100),
            Some(UnitId::from("1")),
            Some(UnitId::from("2")),
            Some(Decimal::from(100)),
        )
        .unwrap();

        let records: Vec<BatchRecord> = serde_json::from_str(
            r#"[
                {"id": 11, "batchNumber": "B-11", "remainingQuantity": 60, "unitId": 1},
                {"id": "12", "batchNumber": "B-12", "remainingQuantity": "6000", "unitId": "2"},
                {"id": 13, "batchNumber": "B-13", "remainingQuantity": 5}
            ]"#,
        )
        .unwrap();

        let batches = classify_batches(&records, &ctx);
        assert_eq!(batches[0].unit_tag, UnitTag::Primary);
        assert_eq!(batches[1].unit_tag, UnitTag::Secondary);
        assert_eq!(batches[2].unit_tag, UnitTag::Unknown);
        assert_eq!(
            batches[1].canonical_remaining(&ctx, UnknownUnitPolicy::TreatAsPrimary),
            Ok(Decimal::from(60))
        );
    }
}
