//! Column mapping
//!
//! Expands the logical schema into a physical row layout:
//!
//! ```text
//! entity: [VERTEX..]                [property columns..] [__count]
//! edge:   [SRC..] [DST..] [DIRECTED] [property columns..] [__count]
//! ```
//!
//! A property spans one column per slot of its value type, always in the
//! same order. The trailing count column is optional on input rows.

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::constants::{
  COLUMN_PATH_SEPARATOR, COUNT, DESTINATION, DIRECTED, FRESH_ROW_COUNT, SOURCE, VERTEX,
};
use crate::error::{ColumnarError, Result};
use crate::schema::{ElementGroupSchema, GraphSchema, ValueType};
use crate::types::{ColumnIndex, ColumnType, ColumnValue, ElementKind, Row, RowKey};

// ============================================================================
// Property footprint
// ============================================================================

/// Physical footprint of one logical property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyColumns {
  /// Column positions, in fixed order
  pub indices: Vec<ColumnIndex>,
  /// Column types, parallel to `indices`
  pub types: Vec<ColumnType>,
  /// Whether the property is part of the group-by key
  pub group_by: bool,
}

// ============================================================================
// Group layout
// ============================================================================

/// Physical layout of the rows of one element group
#[derive(Debug, Clone)]
pub struct GroupLayout {
  group: String,
  kind: ElementKind,
  identity: Vec<ColumnIndex>,
  properties: IndexMap<String, PropertyColumns>,
  /// Types of every column except the count
  column_types: Vec<ColumnType>,
  /// Logical type owning each column, parallel to `column_types`
  value_types: Vec<ValueType>,
  /// Names of every column including the count
  column_names: Vec<String>,
}

impl GroupLayout {
  pub fn from_group(group: &ElementGroupSchema) -> Result<Self> {
    group.validate()?;

    let mut column_types = Vec::new();
    let mut value_types = Vec::new();
    let mut column_names = Vec::new();

    let mut push_value = |name: &str, value_type: ValueType| -> Vec<ColumnIndex> {
      let start = column_types.len();
      let sub_columns = value_type.sub_columns();
      for (slot, &column_type) in value_type.column_types().iter().enumerate() {
        column_types.push(column_type);
        value_types.push(value_type);
        column_names.push(match sub_columns.get(slot) {
          Some(suffix) => format!("{name}{COLUMN_PATH_SEPARATOR}{suffix}"),
          None => name.to_string(),
        });
      }
      (start..column_types.len()).collect()
    };

    let identity = match group.kind {
      ElementKind::Entity => push_value(VERTEX, group.vertex_type),
      ElementKind::Edge => {
        let mut columns = push_value(SOURCE, group.vertex_type);
        columns.extend(push_value(DESTINATION, group.vertex_type));
        columns.extend(push_value(DIRECTED, ValueType::Boolean));
        columns
      }
    };

    let mut properties = IndexMap::with_capacity(group.properties.len());
    for property in &group.properties {
      let indices = push_value(&property.name, property.value_type);
      if indices.is_empty() {
        return Err(ColumnarError::InvalidSchema(format!(
          "property '{}' in group '{}' maps to no columns",
          property.name, group.name
        )));
      }
      properties.insert(
        property.name.clone(),
        PropertyColumns {
          indices,
          types: property.value_type.column_types().to_vec(),
          group_by: property.group_by,
        },
      );
    }

    column_names.push(COUNT.to_string());

    Ok(Self {
      group: group.name.clone(),
      kind: group.kind,
      identity,
      properties,
      column_types,
      value_types,
      column_names,
    })
  }

  pub fn group(&self) -> &str {
    &self.group
  }

  pub fn kind(&self) -> ElementKind {
    self.kind
  }

  /// Number of columns excluding the trailing count
  pub fn width(&self) -> usize {
    self.column_types.len()
  }

  /// Position of the merge count column
  pub fn count_index(&self) -> ColumnIndex {
    self.column_types.len()
  }

  pub fn identity_columns(&self) -> &[ColumnIndex] {
    &self.identity
  }

  /// Ordered physical columns of a property
  pub fn columns_for(&self, property: &str) -> Result<&[ColumnIndex]> {
    Ok(&self.property(property)?.indices)
  }

  pub fn property(&self, property: &str) -> Result<&PropertyColumns> {
    self
      .properties
      .get(property)
      .ok_or_else(|| ColumnarError::UnknownProperty {
        group: self.group.clone(),
        property: property.to_string(),
      })
  }

  /// Properties in declared order
  pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyColumns)> {
    self.properties.iter().map(|(name, cols)| (name.as_str(), cols))
  }

  /// Identity columns followed by every group-by column
  pub fn key_columns(&self) -> Vec<ColumnIndex> {
    let mut columns = self.identity.clone();
    for cols in self.properties.values().filter(|c| c.group_by) {
      columns.extend_from_slice(&cols.indices);
    }
    columns
  }

  /// Type of a non-count column
  pub fn column_type(&self, index: ColumnIndex) -> Option<ColumnType> {
    self.column_types.get(index).copied()
  }

  /// Physical column names, including the trailing count column
  pub fn column_names(&self) -> &[String] {
    &self.column_names
  }

  /// Check a value may be stored in a non-count column: Null, or of the
  /// column's type and inside its logical type's domain.
  pub fn check_value(&self, index: ColumnIndex, value: &ColumnValue) -> Result<()> {
    let (Some(&expected), Some(&value_type)) =
      (self.column_types.get(index), self.value_types.get(index))
    else {
      return Err(ColumnarError::PreconditionViolation(format!(
        "group '{}' has no column {index}",
        self.group
      )));
    };

    if !value.conforms_to(expected) {
      return Err(ColumnarError::TypeMismatch {
        column: index,
        expected,
        found: value.type_name(),
      });
    }
    if !value.is_null() && !value_type.admits(value) {
      return Err(ColumnarError::TypeMismatch {
        column: index,
        expected,
        found: format!("{value:?} outside {value_type:?}"),
      });
    }
    Ok(())
  }

  /// Check a row has this layout: `width` or `width + 1` columns, each value
  /// accepted by [`check_value`](Self::check_value).
  pub fn check_row(&self, row: &Row) -> Result<()> {
    let width = self.width();
    if row.len() != width && row.len() != width + 1 {
      return Err(ColumnarError::PreconditionViolation(format!(
        "row for group '{}' has {} columns, expected {} or {}",
        self.group,
        row.len(),
        width,
        width + 1
      )));
    }

    for (index, value) in row.values().iter().take(width).enumerate() {
      self.check_value(index, value)?;
    }

    Ok(())
  }

  /// Merge count of a row; an absent or Null count column counts as 1.
  pub fn count_of(&self, row: &Row) -> Result<i64> {
    match row.get(self.count_index()) {
      None | Some(ColumnValue::Null) => Ok(FRESH_ROW_COUNT),
      Some(ColumnValue::Int64(count)) if *count >= 1 => Ok(*count),
      Some(ColumnValue::Int64(count)) => Err(ColumnarError::PreconditionViolation(format!(
        "merge count must be positive, found {count}"
      ))),
      Some(other) => Err(ColumnarError::TypeMismatch {
        column: self.count_index(),
        expected: ColumnType::Int64,
        found: other.type_name(),
      }),
    }
  }

  /// Identity and group-by values of a row
  pub fn key_of(&self, row: &Row) -> Result<RowKey> {
    let key_columns = self.key_columns();
    let mut key = Vec::with_capacity(key_columns.len());
    for index in key_columns {
      let value = row.get(index).ok_or_else(|| {
        ColumnarError::PreconditionViolation(format!(
          "row for group '{}' is missing key column {index}",
          self.group
        ))
      })?;
      key.push(value.clone());
    }
    Ok(RowKey(key))
  }

  pub fn row_builder(&self) -> RowBuilder<'_> {
    RowBuilder::new(self)
  }
}

// ============================================================================
// Column mapping
// ============================================================================

/// Layouts of every element group of a schema
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
  groups: HashMap<String, GroupLayout>,
}

impl ColumnMapping {
  pub fn from_schema(schema: &GraphSchema) -> Result<Self> {
    let mut groups = HashMap::with_capacity(schema.len());
    for group in schema.groups() {
      groups.insert(group.name.clone(), GroupLayout::from_group(group)?);
    }
    Ok(Self { groups })
  }

  pub fn layout(&self, group: &str) -> Result<&GroupLayout> {
    self
      .groups
      .get(group)
      .ok_or_else(|| ColumnarError::UnknownGroup(group.to_string()))
  }

  /// Ordered physical columns of `property` in `group`
  pub fn columns_for(&self, group: &str, property: &str) -> Result<&[ColumnIndex]> {
    self.layout(group)?.columns_for(property)
  }
}

// ============================================================================
// Row builder
// ============================================================================

/// Assembles a row in layout order. Unset properties are Null.
#[derive(Debug, Clone)]
pub struct RowBuilder<'a> {
  layout: &'a GroupLayout,
  values: Vec<ColumnValue>,
  count: Option<i64>,
}

impl<'a> RowBuilder<'a> {
  pub fn new(layout: &'a GroupLayout) -> Self {
    Self {
      layout,
      values: vec![ColumnValue::Null; layout.width()],
      count: Some(FRESH_ROW_COUNT),
    }
  }

  /// Set the vertex of an entity row
  pub fn vertex<I>(self, vertex: I) -> Result<Self>
  where
    I: IntoIterator<Item = ColumnValue>,
  {
    if self.layout.kind != ElementKind::Entity {
      return Err(ColumnarError::InvalidArgument(format!(
        "group '{}' holds edges, not entities",
        self.layout.group
      )));
    }
    let layout = self.layout;
    self.fill(&layout.identity, vertex)
  }

  /// Set source, destination and directed flag of an edge row
  pub fn edge<S, D>(self, source: S, destination: D, directed: bool) -> Result<Self>
  where
    S: IntoIterator<Item = ColumnValue>,
    D: IntoIterator<Item = ColumnValue>,
  {
    if self.layout.kind != ElementKind::Edge {
      return Err(ColumnarError::InvalidArgument(format!(
        "group '{}' holds entities, not edges",
        self.layout.group
      )));
    }
    let layout = self.layout;
    let vertex_width = (layout.identity.len() - 1) / 2;
    let (source_cols, rest) = layout.identity.split_at(vertex_width);
    let (destination_cols, directed_col) = rest.split_at(vertex_width);

    self
      .fill(source_cols, source)?
      .fill(destination_cols, destination)?
      .fill(directed_col, [ColumnValue::Boolean(directed)])
  }

  /// Set every column of a property
  pub fn property<I>(self, name: &str, values: I) -> Result<Self>
  where
    I: IntoIterator<Item = ColumnValue>,
  {
    let layout = self.layout;
    self.fill(layout.columns_for(name)?, values)
  }

  /// Set an explicit merge count
  pub fn count(mut self, count: i64) -> Self {
    self.count = Some(count);
    self
  }

  /// Leave the count column off; the row counts as 1
  pub fn without_count(mut self) -> Self {
    self.count = None;
    self
  }

  pub fn build(self) -> Row {
    let mut values = self.values;
    if let Some(count) = self.count {
      values.push(ColumnValue::Int64(count));
    }
    Row::new(values)
  }

  fn fill<I>(mut self, indices: &[ColumnIndex], values: I) -> Result<Self>
  where
    I: IntoIterator<Item = ColumnValue>,
  {
    let values: Vec<ColumnValue> = values.into_iter().collect();
    if values.len() != indices.len() {
      return Err(ColumnarError::InvalidArgument(format!(
        "expected {} values, got {}",
        indices.len(),
        values.len()
      )));
    }
    for (&index, value) in indices.iter().zip(values) {
      self.layout.check_value(index, &value)?;
      self.values[index] = value;
    }
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::aggregate::AggregateFunctionId;
  use crate::schema::PropertyDef;

  fn edge_schema() -> ElementGroupSchema {
    ElementGroupSchema::edge("E", ValueType::String)
      .property(PropertyDef::new("ts", ValueType::Date).group_by())
      .property(
        PropertyDef::new("tsv", ValueType::TypeSubTypeValue).aggregate(AggregateFunctionId::Max),
      )
      .property(PropertyDef::new("n", ValueType::Long).aggregate(AggregateFunctionId::Sum))
  }

  #[test]
  fn test_edge_layout() {
    let layout = GroupLayout::from_group(&edge_schema()).unwrap();
    assert_eq!(layout.identity_columns(), &[0, 1, 2]);
    assert_eq!(layout.columns_for("ts").unwrap(), &[3]);
    assert_eq!(layout.columns_for("tsv").unwrap(), &[4, 5, 6]);
    assert_eq!(layout.columns_for("n").unwrap(), &[7]);
    assert_eq!(layout.width(), 8);
    assert_eq!(layout.count_index(), 8);
    assert_eq!(layout.key_columns(), vec![0, 1, 2, 3]);
    assert_eq!(
      layout.column_names(),
      &["SRC", "DST", "DIRECTED", "ts", "tsv_type", "tsv_sub_type", "tsv_value", "n", "__count"]
    );
  }

  #[test]
  fn test_multi_column_vertex() {
    let schema = ElementGroupSchema::edge("E", ValueType::TypeValue);
    let layout = GroupLayout::from_group(&schema).unwrap();
    assert_eq!(layout.identity_columns(), &[0, 1, 2, 3, 4]);

    let row = layout
      .row_builder()
      .edge(
        [ColumnValue::utf8("t"), ColumnValue::utf8("a")],
        [ColumnValue::utf8("t"), ColumnValue::utf8("b")],
        false,
      )
      .unwrap()
      .build();
    assert_eq!(row.get(4), Some(&ColumnValue::Boolean(false)));
    assert_eq!(row.get(2), Some(&ColumnValue::utf8("t")));
  }

  #[test]
  fn test_unknown_property() {
    let layout = GroupLayout::from_group(&edge_schema()).unwrap();
    assert!(matches!(
      layout.columns_for("missing"),
      Err(ColumnarError::UnknownProperty { .. })
    ));
  }

  #[test]
  fn test_mapping_lookup() {
    let schema = GraphSchema::new().group(edge_schema());
    let mapping = ColumnMapping::from_schema(&schema).unwrap();
    assert_eq!(mapping.columns_for("E", "n").unwrap(), &[7]);
    assert!(matches!(mapping.layout("X"), Err(ColumnarError::UnknownGroup(_))));
  }

  #[test]
  fn test_builder_type_checks() {
    let layout = GroupLayout::from_group(&edge_schema()).unwrap();
    let err = layout
      .row_builder()
      .property("n", [ColumnValue::utf8("nope")])
      .unwrap_err();
    assert!(matches!(err, ColumnarError::TypeMismatch { column: 7, .. }));

    let err = layout
      .row_builder()
      .property("tsv", [ColumnValue::utf8("only one")])
      .unwrap_err();
    assert!(matches!(err, ColumnarError::InvalidArgument(_)));

    assert!(layout.row_builder().vertex([ColumnValue::utf8("v")]).is_err());
  }

  #[test]
  fn test_count_of() {
    let layout = GroupLayout::from_group(&edge_schema()).unwrap();
    let fresh = layout.row_builder().without_count().build();
    assert_eq!(fresh.len(), layout.width());
    assert_eq!(layout.count_of(&fresh).unwrap(), 1);

    let counted = layout.row_builder().count(5).build();
    assert_eq!(layout.count_of(&counted).unwrap(), 5);

    let zero = layout.row_builder().count(0).build();
    assert!(layout.count_of(&zero).is_err());
  }

  #[test]
  fn test_check_row() {
    let layout = GroupLayout::from_group(&edge_schema()).unwrap();
    assert!(layout.check_row(&layout.row_builder().build()).is_ok());
    assert!(matches!(
      layout.check_row(&Row::new(vec![ColumnValue::Null; 3])),
      Err(ColumnarError::PreconditionViolation(_))
    ));

    let mut values = layout.row_builder().build().into_values();
    values[7] = ColumnValue::Int32(1);
    assert!(matches!(
      layout.check_row(&Row::new(values)),
      Err(ColumnarError::TypeMismatch { column: 7, .. })
    ));
  }

  #[test]
  fn test_narrow_values_rejected() {
    let group = ElementGroupSchema::entity("E", ValueType::String)
      .property(PropertyDef::new("s", ValueType::Short).aggregate(AggregateFunctionId::Sum))
      .property(PropertyDef::new("b", ValueType::Byte).aggregate(AggregateFunctionId::Max));
    let layout = GroupLayout::from_group(&group).unwrap();

    let err = layout
      .row_builder()
      .property("s", [ColumnValue::Int32(40_000)])
      .unwrap_err();
    assert!(matches!(err, ColumnarError::TypeMismatch { column: 1, .. }));
    assert!(layout.row_builder().property("s", [ColumnValue::Int32(-40)]).is_ok());

    for bytes in [vec![], vec![1, 2]] {
      let err = layout
        .row_builder()
        .property("b", [ColumnValue::Binary(bytes)])
        .unwrap_err();
      assert!(matches!(err, ColumnarError::TypeMismatch { column: 2, .. }));
    }

    let mut values = layout.row_builder().build().into_values();
    values[1] = ColumnValue::Int32(i32::MAX);
    assert!(matches!(
      layout.check_row(&Row::new(values)),
      Err(ColumnarError::TypeMismatch { column: 1, .. })
    ));
  }
}
