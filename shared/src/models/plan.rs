//! Allocation plan: batch id → quantity in that batch's own unit

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::StockAllocation;
use crate::types::BatchId;

/// Immutable per-batch assignment. Transitions return a new plan.
///
/// Backed by a `BTreeMap` so two plans with the same entries serialize
/// identically regardless of how they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationPlan {
    entries: BTreeMap<BatchId, Decimal>,
}

impl AllocationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty plan ("clear all" in the dialog)
    pub fn cleared(&self) -> Self {
        Self::default()
    }

    pub fn get(&self, batch_id: &BatchId) -> Option<Decimal> {
        self.entries.get(batch_id).copied()
    }

    /// Allocated quantity, zero when the batch has no entry
    pub fn quantity(&self, batch_id: &BatchId) -> Decimal {
        self.get(batch_id).unwrap_or(Decimal::ZERO)
    }

    pub fn contains(&self, batch_id: &BatchId) -> bool {
        self.entries.contains_key(batch_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BatchId, Decimal)> {
        self.entries.iter().map(|(id, qty)| (id, *qty))
    }

    /// Replace the entry for `batch_id`; a zero quantity removes it.
    /// Quantities are stored as given, including over-allocations.
    pub fn with_allocation(mut self, batch_id: BatchId, quantity: Decimal) -> Self {
        if quantity.is_zero() {
            self.entries.remove(&batch_id);
        } else {
            self.entries.insert(batch_id, quantity);
        }
        self
    }

    /// Entries with a positive quantity, in batch id order
    pub fn to_allocations(&self) -> Vec<StockAllocation> {
        self.entries
            .iter()
            .filter(|(_, qty)| **qty > Decimal::ZERO)
            .map(|(id, qty)| StockAllocation {
                batch_id: id.clone(),
                quantity: *qty,
            })
            .collect()
    }
}

impl FromIterator<(BatchId, Decimal)> for AllocationPlan {
    fn from_iter<I: IntoIterator<Item = (BatchId, Decimal)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |plan, (id, qty)| plan.with_allocation(id, qty))
    }
}
