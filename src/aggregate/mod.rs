//! Aggregate functions
//!
//! An aggregate function combines two values of one physical column type into
//! a third value of the same type. Functions are identified in the schema by
//! an [`AggregateFunctionId`] and resolved once, when a merge engine is built,
//! into an [`Aggregator`] that the engine calls directly.
//!
//! Built-in functions:
//! - `sum`: wrapping integer addition at the logical width (16 bits for
//!   shorts), IEEE float addition
//! - `max` / `min`: total order of the column type; bytes compare signed
//! - `union`: sorted set union of string sets
//! - `frequency_map_merge`: per-key sum of count maps
//! - `first`: keeps the first input unchanged

pub mod builtin;
pub mod registry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::{ColumnType, ColumnValue};

pub use registry::AggregatorRegistry;

// ============================================================================
// Function identity
// ============================================================================

/// Identity of an aggregate function as declared in the schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregateFunctionId {
  Sum,
  Max,
  Min,
  Union,
  FrequencyMapMerge,
  First,
  /// User-defined function registered by name
  Custom(String),
}

impl AggregateFunctionId {
  pub fn as_str(&self) -> &str {
    match self {
      AggregateFunctionId::Sum => "sum",
      AggregateFunctionId::Max => "max",
      AggregateFunctionId::Min => "min",
      AggregateFunctionId::Union => "union",
      AggregateFunctionId::FrequencyMapMerge => "frequency_map_merge",
      AggregateFunctionId::First => "first",
      AggregateFunctionId::Custom(name) => name,
    }
  }

  pub fn is_builtin(&self) -> bool {
    !matches!(self, AggregateFunctionId::Custom(_))
  }
}

impl FromStr for AggregateFunctionId {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(match s {
      "sum" => AggregateFunctionId::Sum,
      "max" => AggregateFunctionId::Max,
      "min" => AggregateFunctionId::Min,
      "union" => AggregateFunctionId::Union,
      "frequency_map_merge" => AggregateFunctionId::FrequencyMapMerge,
      "first" | "identity" => AggregateFunctionId::First,
      other => AggregateFunctionId::Custom(other.to_string()),
    })
  }
}

impl From<String> for AggregateFunctionId {
  fn from(value: String) -> Self {
    match value.parse() {
      Ok(id) => id,
      Err(never) => match never {},
    }
  }
}

impl From<AggregateFunctionId> for String {
  fn from(id: AggregateFunctionId) -> Self {
    id.as_str().to_string()
  }
}

impl fmt::Display for AggregateFunctionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ============================================================================
// User-defined functions
// ============================================================================

/// A pure, commutative, associative binary operation over one column type.
///
/// The engine never passes Null to `combine` and always passes two values of
/// a type for which `accepts` returned true.
pub trait AggregateFunction: Send + Sync + fmt::Debug {
  /// Registered name
  fn name(&self) -> &str;

  /// Whether this function can combine values of the given column type
  fn accepts(&self, column_type: ColumnType) -> bool;

  /// Combine two values; `None` means the pair is unsupported
  fn combine(&self, a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue>;
}

// ============================================================================
// Resolved aggregators
// ============================================================================

/// A resolved aggregate function, ready to be called by the merge engine
#[derive(Debug, Clone)]
pub enum Aggregator {
  Sum,
  /// `sum` over a Short property, wrapping at 16 bits
  ShortSum,
  Max,
  Min,
  /// `max` over a Byte property, comparing the byte as signed
  ByteMax,
  /// `min` over a Byte property, comparing the byte as signed
  ByteMin,
  Union,
  FrequencyMapMerge,
  First,
  Custom(Arc<dyn AggregateFunction>),
}

impl Aggregator {
  pub fn name(&self) -> &str {
    match self {
      Aggregator::Sum | Aggregator::ShortSum => "sum",
      Aggregator::Max | Aggregator::ByteMax => "max",
      Aggregator::Min | Aggregator::ByteMin => "min",
      Aggregator::Union => "union",
      Aggregator::FrequencyMapMerge => "frequency_map_merge",
      Aggregator::First => "first",
      Aggregator::Custom(function) => function.name(),
    }
  }

  pub fn accepts(&self, column_type: ColumnType) -> bool {
    match self {
      Aggregator::Sum => column_type.is_numeric(),
      Aggregator::ShortSum => column_type == ColumnType::Int32,
      Aggregator::Max | Aggregator::Min => column_type.is_ordered(),
      Aggregator::ByteMax | Aggregator::ByteMin => column_type == ColumnType::Binary,
      Aggregator::Union => column_type == ColumnType::Utf8Set,
      Aggregator::FrequencyMapMerge => column_type == ColumnType::CountMap,
      Aggregator::First => true,
      Aggregator::Custom(function) => function.accepts(column_type),
    }
  }

  /// Combine two column values.
  ///
  /// A Null on either side yields the other side unchanged. `None` means the
  /// two values are not a supported pair for this function.
  pub fn combine(&self, a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
    match (a.is_null(), b.is_null()) {
      (true, _) => return Some(b.clone()),
      (false, true) => return Some(a.clone()),
      _ => {}
    }

    match self {
      Aggregator::Sum => builtin::sum(a, b),
      Aggregator::ShortSum => builtin::sum_short(a, b),
      Aggregator::Max => builtin::max(a, b),
      Aggregator::Min => builtin::min(a, b),
      Aggregator::ByteMax => builtin::max_byte(a, b),
      Aggregator::ByteMin => builtin::min_byte(a, b),
      Aggregator::Union => builtin::union(a, b),
      Aggregator::FrequencyMapMerge => builtin::merge_frequency_maps(a, b),
      Aggregator::First => Some(builtin::first(a, b)),
      Aggregator::Custom(function) => function.combine(a, b),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_id_parsing() {
    assert_eq!("sum".parse::<AggregateFunctionId>().unwrap(), AggregateFunctionId::Sum);
    assert_eq!(
      "identity".parse::<AggregateFunctionId>().unwrap(),
      AggregateFunctionId::First
    );
    assert_eq!(
      "hll".parse::<AggregateFunctionId>().unwrap(),
      AggregateFunctionId::Custom("hll".to_string())
    );
    assert_eq!(AggregateFunctionId::FrequencyMapMerge.to_string(), "frequency_map_merge");
  }

  #[test]
  fn test_null_passes_through() {
    let value = ColumnValue::Int64(7);
    assert_eq!(Aggregator::Sum.combine(&ColumnValue::Null, &value), Some(value.clone()));
    assert_eq!(Aggregator::Sum.combine(&value, &ColumnValue::Null), Some(value));
    assert_eq!(
      Aggregator::Max.combine(&ColumnValue::Null, &ColumnValue::Null),
      Some(ColumnValue::Null)
    );
  }

  #[test]
  fn test_accepts() {
    assert!(Aggregator::Sum.accepts(ColumnType::Float32));
    assert!(!Aggregator::Sum.accepts(ColumnType::Utf8));
    assert!(Aggregator::Max.accepts(ColumnType::Binary));
    assert!(!Aggregator::Max.accepts(ColumnType::CountMap));
    assert!(Aggregator::First.accepts(ColumnType::Utf8Set));
    assert!(Aggregator::ShortSum.accepts(ColumnType::Int32));
    assert!(!Aggregator::ShortSum.accepts(ColumnType::Int64));
    assert!(!Aggregator::ByteMax.accepts(ColumnType::Utf8));
  }
}
