//! Common types used across the allocation engine

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

/// Tolerance used to treat near-equal quantities as exact (0.01)
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Decimal places kept on every per-batch allocation
pub const QUANTITY_DP: u32 = 2;

/// True when `value` is strictly inside the tolerance band
pub fn within_tolerance(value: Decimal) -> bool {
    value.abs() < EPSILON
}

/// Round a quantity to 2 dp, midpoint away from zero
pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncate a quantity to 2 dp toward zero
pub fn truncate_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::ToZero)
}

/// Upstream ids arrive as JSON strings or numbers depending on the endpoint
fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Opaque stock batch identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(#[serde(deserialize_with = "deserialize_lenient_id")] String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BatchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a measurement unit (packets, seeds, trays...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(#[serde(deserialize_with = "deserialize_lenient_id")] String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order in which auto-fill visits batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Legacy ordering: raw remaining quantity, ignoring the unit
    RawQuantityDescending,
    /// Remaining quantity converted to the primary unit
    #[default]
    CanonicalQuantityDescending,
}

/// How batches recorded in neither request unit are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownUnitPolicy {
    /// Count the raw quantity as primary units (legacy behaviour)
    #[default]
    TreatAsPrimary,
    /// Contribute nothing; never drawn from by auto-fill
    Exclude,
}

/// What auto-fill does when stock cannot cover the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Refuse to build a plan at all
    #[default]
    Block,
    /// Allocate what exists and report the remainder
    AllocateAvailable,
}

/// Knobs shared by auto-fill, validation and adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationPolicy {
    pub sort: SortPolicy,
    pub unknown_unit: UnknownUnitPolicy,
    pub shortfall: ShortfallPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_epsilon_value() {
        assert_eq!(EPSILON, dec("0.01"));
    }

    #[test]
    fn test_within_tolerance_is_strict() {
        assert!(within_tolerance(dec("0.009")));
        assert!(within_tolerance(dec("-0.005")));
        assert!(!within_tolerance(dec("0.01")));
        assert!(!within_tolerance(dec("-0.02")));
    }

    #[test]
    fn test_round_quantity_midpoint_away_from_zero() {
        assert_eq!(round_quantity(dec("25.005")), dec("25.01"));
        assert_eq!(round_quantity(dec("25.004")), dec("25.00"));
        assert_eq!(truncate_quantity(dec("25.009")), dec("25.00"));
    }

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let ids: Vec<BatchId> = serde_json::from_str(r#"["b-1", 42]"#).unwrap();
        assert_eq!(ids, vec![BatchId::from("b-1"), BatchId::from("42")]);

        let unit: UnitId = serde_json::from_str("7").unwrap();
        assert_eq!(unit.as_str(), "7");
    }

    #[test]
    fn test_policy_defaults_and_names() {
        let policy: AllocationPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy.sort, SortPolicy::CanonicalQuantityDescending);
        assert_eq!(policy.unknown_unit, UnknownUnitPolicy::TreatAsPrimary);
        assert_eq!(policy.shortfall, ShortfallPolicy::Block);

        let legacy: AllocationPolicy =
            serde_json::from_str(r#"{"sort":"raw_quantity_descending","shortfall":"allocate_available"}"#)
                .unwrap();
        assert_eq!(legacy.sort, SortPolicy::RawQuantityDescending);
        assert_eq!(legacy.shortfall, ShortfallPolicy::AllocateAvailable);
    }
}
