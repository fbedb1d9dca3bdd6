//! Aggregate function registry
//!
//! Built-in functions are always available. User-defined functions are
//! registered by name and shared as `Arc<dyn AggregateFunction>`.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::debug;

use super::{AggregateFunction, AggregateFunctionId, Aggregator};
use crate::error::{ColumnarError, Result};
use crate::schema::{PropertyDef, ValueType};

/// Resolves aggregate function identities into callable aggregators
#[derive(Debug, Clone, Default)]
pub struct AggregatorRegistry {
  custom: HashMap<String, Arc<dyn AggregateFunction>>,
}

impl AggregatorRegistry {
  /// Create a registry holding only the built-in functions
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a user-defined function under its own name.
  ///
  /// Fails if the name shadows a built-in or is already registered.
  pub fn register(&mut self, function: Arc<dyn AggregateFunction>) -> Result<()> {
    let name = function.name().to_string();
    if name.is_empty() {
      return Err(ColumnarError::InvalidArgument(
        "aggregate function name must be set".to_string(),
      ));
    }
    let id: AggregateFunctionId = AggregateFunctionId::from(name.clone());
    if id.is_builtin() {
      return Err(ColumnarError::AlreadyExists(format!(
        "aggregate function '{name}' is built in"
      )));
    }
    if self.custom.contains_key(&name) {
      return Err(ColumnarError::AlreadyExists(format!(
        "aggregate function '{name}'"
      )));
    }
    debug!(function = %name, "registered aggregate function");
    self.custom.insert(name, function);
    Ok(())
  }

  /// Builder-style variant of [`register`](Self::register)
  pub fn with(mut self, function: Arc<dyn AggregateFunction>) -> Result<Self> {
    self.register(function)?;
    Ok(self)
  }

  pub fn contains(&self, id: &AggregateFunctionId) -> bool {
    match id {
      AggregateFunctionId::Custom(name) => self.custom.contains_key(name),
      _ => true,
    }
  }

  /// Resolve the aggregate function declared by `property`.
  ///
  /// Every physical column of the property's value type must be accepted by
  /// the resolved function. Built-ins are narrowed to the logical type, so a
  /// Short sum wraps at 16 bits and Byte max/min compare signed.
  pub fn resolve(&self, group: &str, property: &PropertyDef) -> Result<Aggregator> {
    let id = property
      .aggregate_function
      .as_ref()
      .ok_or_else(|| ColumnarError::MissingAggregator {
        group: group.to_string(),
        property: property.name.clone(),
      })?;

    let aggregator = match id {
      AggregateFunctionId::Sum => Aggregator::Sum,
      AggregateFunctionId::Max => Aggregator::Max,
      AggregateFunctionId::Min => Aggregator::Min,
      AggregateFunctionId::Union => Aggregator::Union,
      AggregateFunctionId::FrequencyMapMerge => Aggregator::FrequencyMapMerge,
      AggregateFunctionId::First => Aggregator::First,
      AggregateFunctionId::Custom(name) => match self.custom.get(name) {
        Some(function) => Aggregator::Custom(Arc::clone(function)),
        None => {
          return Err(ColumnarError::UnknownAggregator {
            group: group.to_string(),
            property: property.name.clone(),
            function: name.clone(),
          })
        }
      },
    };

    let aggregator = match (aggregator, property.value_type) {
      (Aggregator::Sum, ValueType::Short) => Aggregator::ShortSum,
      (Aggregator::Max, ValueType::Byte) => Aggregator::ByteMax,
      (Aggregator::Min, ValueType::Byte) => Aggregator::ByteMin,
      (aggregator, _) => aggregator,
    };

    for &column_type in property.value_type.column_types() {
      if !aggregator.accepts(column_type) {
        return Err(ColumnarError::AggregatorTypeMismatch {
          group: group.to_string(),
          property: property.name.clone(),
          function: id.to_string(),
          column_type,
        });
      }
    }

    debug!(
      group,
      property = %property.name,
      function = aggregator.name(),
      "resolved aggregate function"
    );
    Ok(aggregator)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{ColumnType, ColumnValue};

  #[derive(Debug)]
  struct BitOr;

  impl AggregateFunction for BitOr {
    fn name(&self) -> &str {
      "bit_or"
    }

    fn accepts(&self, column_type: ColumnType) -> bool {
      column_type == ColumnType::Int64
    }

    fn combine(&self, a: &ColumnValue, b: &ColumnValue) -> Option<ColumnValue> {
      match (a, b) {
        (ColumnValue::Int64(x), ColumnValue::Int64(y)) => Some(ColumnValue::Int64(x | y)),
        _ => None,
      }
    }
  }

  #[test]
  fn test_resolve_builtin() {
    let registry = AggregatorRegistry::new();
    let property = PropertyDef::new("count", ValueType::Long).aggregate(AggregateFunctionId::Sum);
    let aggregator = registry.resolve("E", &property).unwrap();
    assert_eq!(aggregator.name(), "sum");
  }

  #[test]
  fn test_resolve_narrows_to_logical_width() {
    let registry = AggregatorRegistry::new();
    let short = PropertyDef::new("s", ValueType::Short).aggregate(AggregateFunctionId::Sum);
    let aggregator = registry.resolve("E", &short).unwrap();
    assert!(matches!(aggregator, Aggregator::ShortSum));
    assert_eq!(aggregator.name(), "sum");
    assert_eq!(
      aggregator.combine(&ColumnValue::Int32(30_000), &ColumnValue::Int32(30_000)),
      Some(ColumnValue::Int32(-5_536))
    );

    let byte = PropertyDef::new("b", ValueType::Byte).aggregate(AggregateFunctionId::Min);
    assert!(matches!(registry.resolve("E", &byte).unwrap(), Aggregator::ByteMin));

    let int = PropertyDef::new("i", ValueType::Int).aggregate(AggregateFunctionId::Sum);
    assert!(matches!(registry.resolve("E", &int).unwrap(), Aggregator::Sum));
  }

  #[test]
  fn test_resolve_unknown() {
    let registry = AggregatorRegistry::new();
    let property = PropertyDef::new("flags", ValueType::Long)
      .aggregate(AggregateFunctionId::Custom("bit_or".to_string()));
    let err = registry.resolve("E", &property).unwrap_err();
    assert!(matches!(err, ColumnarError::UnknownAggregator { ref function, .. } if function == "bit_or"));
  }

  #[test]
  fn test_resolve_type_mismatch() {
    let registry = AggregatorRegistry::new();
    let property = PropertyDef::new("tags", ValueType::StringSet).aggregate(AggregateFunctionId::Sum);
    let err = registry.resolve("E", &property).unwrap_err();
    assert!(matches!(
      err,
      ColumnarError::AggregatorTypeMismatch {
        column_type: ColumnType::Utf8Set,
        ..
      }
    ));
  }

  #[test]
  fn test_resolve_missing() {
    let registry = AggregatorRegistry::new();
    let property = PropertyDef::new("ts", ValueType::Date);
    assert!(matches!(
      registry.resolve("E", &property),
      Err(ColumnarError::MissingAggregator { .. })
    ));
  }

  #[test]
  fn test_custom_function() {
    let registry = AggregatorRegistry::new().with(Arc::new(BitOr)).unwrap();
    let property = PropertyDef::new("flags", ValueType::Long)
      .aggregate(AggregateFunctionId::Custom("bit_or".to_string()));
    let aggregator = registry.resolve("E", &property).unwrap();
    assert_eq!(
      aggregator.combine(&ColumnValue::Int64(0b01), &ColumnValue::Int64(0b10)),
      Some(ColumnValue::Int64(0b11))
    );

    let wrong = PropertyDef::new("flags", ValueType::Int)
      .aggregate(AggregateFunctionId::Custom("bit_or".to_string()));
    assert!(registry.resolve("E", &wrong).is_err());
  }

  #[test]
  fn test_register_rejects_duplicates_and_builtins() {
    #[derive(Debug)]
    struct Shadow;
    impl AggregateFunction for Shadow {
      fn name(&self) -> &str {
        "sum"
      }
      fn accepts(&self, _: ColumnType) -> bool {
        true
      }
      fn combine(&self, a: &ColumnValue, _: &ColumnValue) -> Option<ColumnValue> {
        Some(a.clone())
      }
    }

    let mut registry = AggregatorRegistry::new();
    assert!(matches!(
      registry.register(Arc::new(Shadow)),
      Err(ColumnarError::AlreadyExists(_))
    ));
    registry.register(Arc::new(BitOr)).unwrap();
    assert!(registry.register(Arc::new(BitOr)).is_err());
    assert!(registry.contains(&AggregateFunctionId::Custom("bit_or".to_string())));
  }
}
