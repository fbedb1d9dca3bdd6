//! Core value and row types
//!
//! Rows are flat sequences of physical column values. Floats are stored under
//! a total order so every value (and therefore every row key) is `Eq + Ord + Hash`.

use std::collections::BTreeMap;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Physical column position inside a row
pub type ColumnIndex = usize;

// ============================================================================
// Element kinds
// ============================================================================

/// Kind of graph element stored by a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
  /// Identified by a single vertex
  Entity,
  /// Identified by source, destination and directed flag
  Edge,
}

impl ElementKind {
  /// Number of logical identity fields (1 for entities, 3 for edges)
  pub fn identity_arity(self) -> usize {
    match self {
      ElementKind::Entity => 1,
      ElementKind::Edge => 3,
    }
  }
}

// ============================================================================
// Physical column types
// ============================================================================

/// Physical column types a row can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
  Boolean,
  Int32,
  Int64,
  Float32,
  Float64,
  Binary,
  Utf8,
  /// Sorted, de-duplicated sequence of strings
  Utf8Set,
  /// String key to i64 count
  CountMap,
}

impl ColumnType {
  /// Whether values of this type have a meaningful total order for Max/Min
  pub fn is_ordered(self) -> bool {
    !matches!(self, ColumnType::Utf8Set | ColumnType::CountMap)
  }

  pub fn is_numeric(self) -> bool {
    matches!(
      self,
      ColumnType::Int32 | ColumnType::Int64 | ColumnType::Float32 | ColumnType::Float64
    )
  }
}

impl fmt::Display for ColumnType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

// ============================================================================
// Column values
// ============================================================================

/// A single physical column value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnValue {
  Null,
  Boolean(bool),
  Int32(i32),
  Int64(i64),
  Float32(OrderedFloat<f32>),
  Float64(OrderedFloat<f64>),
  Binary(Vec<u8>),
  Utf8(String),
  Utf8Set(Vec<String>),
  CountMap(BTreeMap<String, i64>),
}

impl ColumnValue {
  pub fn float32(value: f32) -> Self {
    ColumnValue::Float32(OrderedFloat(value))
  }

  pub fn float64(value: f64) -> Self {
    ColumnValue::Float64(OrderedFloat(value))
  }

  pub fn utf8(value: impl Into<String>) -> Self {
    ColumnValue::Utf8(value.into())
  }

  /// Build a string set; the stored sequence is sorted and de-duplicated.
  pub fn utf8_set<I, S>(values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut values: Vec<String> = values.into_iter().map(Into::into).collect();
    values.sort_unstable();
    values.dedup();
    ColumnValue::Utf8Set(values)
  }

  pub fn count_map<I, S>(entries: I) -> Self
  where
    I: IntoIterator<Item = (S, i64)>,
    S: Into<String>,
  {
    ColumnValue::CountMap(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }

  pub fn is_null(&self) -> bool {
    matches!(self, ColumnValue::Null)
  }

  /// Physical type of this value, `None` for Null
  pub fn column_type(&self) -> Option<ColumnType> {
    match self {
      ColumnValue::Null => None,
      ColumnValue::Boolean(_) => Some(ColumnType::Boolean),
      ColumnValue::Int32(_) => Some(ColumnType::Int32),
      ColumnValue::Int64(_) => Some(ColumnType::Int64),
      ColumnValue::Float32(_) => Some(ColumnType::Float32),
      ColumnValue::Float64(_) => Some(ColumnType::Float64),
      ColumnValue::Binary(_) => Some(ColumnType::Binary),
      ColumnValue::Utf8(_) => Some(ColumnType::Utf8),
      ColumnValue::Utf8Set(_) => Some(ColumnType::Utf8Set),
      ColumnValue::CountMap(_) => Some(ColumnType::CountMap),
    }
  }

  /// Short name used in error messages
  pub fn type_name(&self) -> String {
    match self.column_type() {
      Some(column_type) => column_type.to_string(),
      None => "Null".to_string(),
    }
  }

  /// True if the value is Null or of the given type
  pub fn conforms_to(&self, column_type: ColumnType) -> bool {
    match self.column_type() {
      Some(actual) => actual == column_type,
      None => true,
    }
  }
}

impl From<bool> for ColumnValue {
  fn from(value: bool) -> Self {
    ColumnValue::Boolean(value)
  }
}

impl From<i32> for ColumnValue {
  fn from(value: i32) -> Self {
    ColumnValue::Int32(value)
  }
}

impl From<i64> for ColumnValue {
  fn from(value: i64) -> Self {
    ColumnValue::Int64(value)
  }
}

impl From<f32> for ColumnValue {
  fn from(value: f32) -> Self {
    ColumnValue::float32(value)
  }
}

impl From<f64> for ColumnValue {
  fn from(value: f64) -> Self {
    ColumnValue::float64(value)
  }
}

impl From<&str> for ColumnValue {
  fn from(value: &str) -> Self {
    ColumnValue::Utf8(value.to_string())
  }
}

impl From<String> for ColumnValue {
  fn from(value: String) -> Self {
    ColumnValue::Utf8(value)
  }
}

// ============================================================================
// Rows
// ============================================================================

/// An immutable physical row: identity columns, property columns, then an
/// optional trailing merge count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Row {
  values: Vec<ColumnValue>,
}

impl Row {
  pub fn new(values: Vec<ColumnValue>) -> Self {
    Self { values }
  }

  pub fn values(&self) -> &[ColumnValue] {
    &self.values
  }

  pub fn get(&self, index: ColumnIndex) -> Option<&ColumnValue> {
    self.values.get(index)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn into_values(self) -> Vec<ColumnValue> {
    self.values
  }
}

impl From<Vec<ColumnValue>> for Row {
  fn from(values: Vec<ColumnValue>) -> Self {
    Self::new(values)
  }
}

/// Identity plus group-by column values of a row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(pub Vec<ColumnValue>);
