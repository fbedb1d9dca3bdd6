//! Logical schema view
//!
//! Element groups declare their identity kind, vertex type and an ordered list
//! of properties. Each property has a logical value type (which fixes its
//! physical column footprint), an optional aggregate function and a group-by
//! flag. Schemas are plain values; `validate` is the explicit check that
//! replaces builder-time validation.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateFunctionId;
use crate::error::{ColumnarError, Result};
use crate::types::{ColumnType, ColumnValue, ElementKind};

// ============================================================================
// Value types
// ============================================================================

/// Logical property / vertex types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
  Boolean,
  /// Single byte, stored as a one-byte binary column
  Byte,
  /// Stored widened to Int32
  Short,
  Int,
  Long,
  Float,
  Double,
  String,
  /// Epoch milliseconds
  Date,
  StringSet,
  FrequencyMap,
  /// (type, value) pair
  TypeValue,
  /// (type, sub-type, value) triple
  TypeSubTypeValue,
}

impl ValueType {
  /// Physical column types, in their fixed order
  pub fn column_types(self) -> &'static [ColumnType] {
    match self {
      ValueType::Boolean => &[ColumnType::Boolean],
      ValueType::Byte => &[ColumnType::Binary],
      ValueType::Short | ValueType::Int => &[ColumnType::Int32],
      ValueType::Long | ValueType::Date => &[ColumnType::Int64],
      ValueType::Float => &[ColumnType::Float32],
      ValueType::Double => &[ColumnType::Float64],
      ValueType::String => &[ColumnType::Utf8],
      ValueType::StringSet => &[ColumnType::Utf8Set],
      ValueType::FrequencyMap => &[ColumnType::CountMap],
      ValueType::TypeValue => &[ColumnType::Utf8, ColumnType::Utf8],
      ValueType::TypeSubTypeValue => &[ColumnType::Utf8, ColumnType::Utf8, ColumnType::Utf8],
    }
  }

  /// Sub-column suffixes for multi-column types (empty for scalar types)
  pub fn sub_columns(self) -> &'static [&'static str] {
    match self {
      ValueType::TypeValue => &["type", "value"],
      ValueType::TypeSubTypeValue => &["type", "sub_type", "value"],
      _ => &[],
    }
  }

  pub fn width(self) -> usize {
    self.column_types().len()
  }

  /// Whether a non-null physical value lies in this type's domain.
  ///
  /// Shorts must fit in 16 bits and bytes are exactly one byte long; other
  /// types admit every value of their column type.
  pub fn admits(self, value: &ColumnValue) -> bool {
    match (self, value) {
      (ValueType::Short, ColumnValue::Int32(v)) => i16::try_from(*v).is_ok(),
      (ValueType::Byte, ColumnValue::Binary(bytes)) => bytes.len() == 1,
      _ => true,
    }
  }
}

// ============================================================================
// Property definitions
// ============================================================================

/// Property definition for an element group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
  /// Property name
  pub name: String,
  /// Logical value type
  pub value_type: ValueType,
  /// Aggregate function applied when two rows are merged
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub aggregate_function: Option<AggregateFunctionId>,
  /// Part of the deduplication key; never aggregated
  #[serde(default)]
  pub group_by: bool,
}

impl PropertyDef {
  pub fn new(name: &str, value_type: ValueType) -> Self {
    Self {
      name: name.to_string(),
      value_type,
      aggregate_function: None,
      group_by: false,
    }
  }

  pub fn aggregate(mut self, function: AggregateFunctionId) -> Self {
    self.aggregate_function = Some(function);
    self
  }

  pub fn group_by(mut self) -> Self {
    self.group_by = true;
    self
  }
}

// ============================================================================
// Element groups
// ============================================================================

/// Schema of one element group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementGroupSchema {
  /// Group name
  pub name: String,
  /// Entity or edge
  pub kind: ElementKind,
  /// Type of the vertex (or of source and destination for edges)
  pub vertex_type: ValueType,
  /// Properties in declared order
  #[serde(default)]
  pub properties: Vec<PropertyDef>,
}

impl ElementGroupSchema {
  pub fn entity(name: &str, vertex_type: ValueType) -> Self {
    Self {
      name: name.to_string(),
      kind: ElementKind::Entity,
      vertex_type,
      properties: Vec::new(),
    }
  }

  pub fn edge(name: &str, vertex_type: ValueType) -> Self {
    Self {
      name: name.to_string(),
      kind: ElementKind::Edge,
      vertex_type,
      properties: Vec::new(),
    }
  }

  pub fn property(mut self, property: PropertyDef) -> Self {
    self.properties.push(property);
    self
  }

  pub fn identity_arity(&self) -> usize {
    self.kind.identity_arity()
  }

  pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
    self.properties.iter().find(|p| p.name == name)
  }

  /// All property names in declared order
  pub fn property_names(&self) -> impl Iterator<Item = &str> {
    self.properties.iter().map(|p| p.name.as_str())
  }

  /// Non-group-by property names in declared order
  pub fn aggregated_properties(&self) -> impl Iterator<Item = &str> {
    self
      .properties
      .iter()
      .filter(|p| !p.group_by)
      .map(|p| p.name.as_str())
  }

  /// Group-by property names
  pub fn group_by(&self) -> IndexSet<&str> {
    self
      .properties
      .iter()
      .filter(|p| p.group_by)
      .map(|p| p.name.as_str())
      .collect()
  }

  /// Check the group is structurally sound.
  ///
  /// Aggregator resolution is left to the merge engine; this only checks that
  /// each non-group-by property declares one.
  pub fn validate(&self) -> Result<()> {
    if self.name.is_empty() {
      return Err(ColumnarError::InvalidSchema(
        "element group name must be set".to_string(),
      ));
    }

    let mut seen = IndexSet::with_capacity(self.properties.len());
    for property in &self.properties {
      if property.name.is_empty() {
        return Err(ColumnarError::InvalidSchema(format!(
          "group '{}' has a property with an empty name",
          self.name
        )));
      }
      if !seen.insert(property.name.as_str()) {
        return Err(ColumnarError::InvalidSchema(format!(
          "group '{}' declares property '{}' more than once",
          self.name, property.name
        )));
      }
      if !property.group_by && property.aggregate_function.is_none() {
        return Err(ColumnarError::MissingAggregator {
          group: self.name.clone(),
          property: property.name.clone(),
        });
      }
    }

    Ok(())
  }
}

// ============================================================================
// Graph schema
// ============================================================================

/// All element groups of a store, keyed by name in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ElementGroupSchema>", into = "Vec<ElementGroupSchema>")]
pub struct GraphSchema {
  groups: IndexMap<String, ElementGroupSchema>,
}

impl GraphSchema {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a group, replacing any group of the same name
  pub fn group(mut self, group: ElementGroupSchema) -> Self {
    self.groups.insert(group.name.clone(), group);
    self
  }

  pub fn get(&self, name: &str) -> Option<&ElementGroupSchema> {
    self.groups.get(name)
  }

  pub fn require(&self, name: &str) -> Result<&ElementGroupSchema> {
    self
      .groups
      .get(name)
      .ok_or_else(|| ColumnarError::UnknownGroup(name.to_string()))
  }

  pub fn groups(&self) -> impl Iterator<Item = &ElementGroupSchema> {
    self.groups.values()
  }

  pub fn group_names(&self) -> impl Iterator<Item = &str> {
    self.groups.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.groups.len()
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }

  pub fn validate(&self) -> Result<()> {
    for group in self.groups.values() {
      group.validate()?;
    }
    Ok(())
  }

  pub fn from_json(json: &str) -> Result<Self> {
    let schema: GraphSchema = serde_json::from_str(json)?;
    schema.validate()?;
    Ok(schema)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(self)?)
  }
}

impl TryFrom<Vec<ElementGroupSchema>> for GraphSchema {
  type Error = ColumnarError;

  fn try_from(groups: Vec<ElementGroupSchema>) -> Result<Self> {
    let mut map = IndexMap::with_capacity(groups.len());
    for group in groups {
      if map.contains_key(&group.name) {
        return Err(ColumnarError::InvalidSchema(format!(
          "element group '{}' declared more than once",
          group.name
        )));
      }
      map.insert(group.name.clone(), group);
    }
    Ok(Self { groups: map })
  }
}

impl From<GraphSchema> for Vec<ElementGroupSchema> {
  fn from(schema: GraphSchema) -> Self {
    schema.groups.into_values().collect()
  }
}
