//! Merge engine
//!
//! Combines two rows of one element group that share a key (identity plus
//! group-by columns) into a single row. Identity and group-by columns are
//! copied; every other property column is combined by the aggregate function
//! the schema declares for it; the trailing merge counts are added.
//!
//! Aggregators are resolved once, when the engine is built, into a plan
//! indexed by property position. The engine holds no mutable state and is
//! shared freely across threads.

use tracing::{debug, trace};

use crate::aggregate::{Aggregator, AggregatorRegistry};
use crate::error::{ColumnarError, Result};
use crate::layout::{ColumnMapping, GroupLayout};
use crate::schema::ElementGroupSchema;
use crate::types::{ColumnIndex, ColumnType, ColumnValue, ElementKind, Row, RowKey};

/// One step of the merge plan, in declared property order
#[derive(Debug, Clone)]
enum PropertyPlan {
  /// Group-by property: copied from the first input
  PassThrough { columns: Vec<ColumnIndex> },
  /// Aggregated property: each column combined by the resolved aggregator
  Aggregate {
    columns: Vec<(ColumnIndex, ColumnType)>,
    aggregator: Aggregator,
  },
}

/// Pure row combiner for one element group
#[derive(Debug, Clone)]
pub struct MergeEngine {
  layout: GroupLayout,
  key_columns: Vec<ColumnIndex>,
  plan: Vec<PropertyPlan>,
}

impl MergeEngine {
  /// Build the engine for `group` using the layout from `mapping`.
  ///
  /// Fails with a configuration error if any non-group-by property has no
  /// resolvable aggregate function, or one whose input type disagrees with
  /// the property's columns.
  pub fn new(
    group: &ElementGroupSchema,
    mapping: &ColumnMapping,
    registry: &AggregatorRegistry,
  ) -> Result<Self> {
    let layout = mapping.layout(&group.name)?.clone();
    Self::with_layout(group, layout, registry)
  }

  /// Build the engine from a group alone, deriving its layout
  pub fn for_group(group: &ElementGroupSchema, registry: &AggregatorRegistry) -> Result<Self> {
    Self::with_layout(group, GroupLayout::from_group(group)?, registry)
  }

  fn with_layout(
    group: &ElementGroupSchema,
    layout: GroupLayout,
    registry: &AggregatorRegistry,
  ) -> Result<Self> {
    group.validate()?;
    check_layout_matches(group, &layout)?;

    let mut plan = Vec::with_capacity(group.properties.len());
    for property in &group.properties {
      let footprint = layout.property(&property.name)?;
      if footprint.types.as_slice() != property.value_type.column_types() {
        return Err(ColumnarError::InvalidSchema(format!(
          "column mapping for '{}' in group '{}' does not match its value type",
          property.name, group.name
        )));
      }

      if property.group_by {
        plan.push(PropertyPlan::PassThrough {
          columns: footprint.indices.clone(),
        });
      } else {
        let aggregator = registry.resolve(&group.name, property)?;
        plan.push(PropertyPlan::Aggregate {
          columns: footprint
            .indices
            .iter()
            .copied()
            .zip(footprint.types.iter().copied())
            .collect(),
          aggregator,
        });
      }
    }

    let key_columns = layout.key_columns();
    debug!(
      group = %group.name,
      properties = plan.len(),
      key_columns = key_columns.len(),
      width = layout.width(),
      "built merge engine"
    );

    Ok(Self {
      layout,
      key_columns,
      plan,
    })
  }

  pub fn group(&self) -> &str {
    self.layout.group()
  }

  pub fn kind(&self) -> ElementKind {
    self.layout.kind()
  }

  pub fn layout(&self) -> &GroupLayout {
    &self.layout
  }

  /// Merge two rows sharing one key.
  ///
  /// The output always carries the count column and has the inputs' layout.
  pub fn merge(&self, a: &Row, b: &Row) -> Result<Row> {
    self.layout.check_row(a)?;
    self.layout.check_row(b)?;
    self.check_same_key(a, b)?;

    let count_a = self.layout.count_of(a)?;
    let count_b = self.layout.count_of(b)?;
    let count = count_a.checked_add(count_b).ok_or_else(|| {
      ColumnarError::PreconditionViolation(format!(
        "merge count overflow ({count_a} + {count_b})"
      ))
    })?;

    let (a, b) = (a.values(), b.values());
    let mut merged = vec![ColumnValue::Null; self.layout.width() + 1];

    for &index in self.layout.identity_columns() {
      merged[index] = a[index].clone();
    }

    for step in &self.plan {
      match step {
        PropertyPlan::PassThrough { columns } => {
          for &index in columns {
            merged[index] = a[index].clone();
          }
        }
        PropertyPlan::Aggregate {
          columns,
          aggregator,
        } => {
          for &(index, expected) in columns {
            merged[index] =
              self.combine_column(aggregator, index, expected, &a[index], &b[index])?;
          }
        }
      }
    }

    merged[self.layout.count_index()] = ColumnValue::Int64(count);

    trace!(group = self.layout.group(), count, "merged rows");
    Ok(Row::new(merged))
  }

  /// Left fold of [`merge`](Self::merge); `None` for an empty input.
  pub fn merge_all<I>(&self, rows: I) -> Result<Option<Row>>
  where
    I: IntoIterator<Item = Row>,
  {
    let mut rows = rows.into_iter();
    let Some(first) = rows.next() else {
      return Ok(None);
    };

    let mut acc = self.normalize(first)?;
    for row in rows {
      acc = self.merge(&acc, &row)?;
    }
    Ok(Some(acc))
  }

  /// Check a row against the layout and append the count column if absent
  pub fn normalize(&self, row: Row) -> Result<Row> {
    self.layout.check_row(&row)?;
    let count = self.layout.count_of(&row)?;
    let mut values = row.into_values();
    values.truncate(self.layout.width());
    values.push(ColumnValue::Int64(count));
    Ok(Row::new(values))
  }

  /// Identity and group-by values of a row
  pub fn key_of(&self, row: &Row) -> Result<RowKey> {
    self.layout.key_of(row)
  }

  /// Merge count of a row (1 when the count column is absent)
  pub fn count_of(&self, row: &Row) -> Result<i64> {
    self.layout.count_of(row)
  }

  fn check_same_key(&self, a: &Row, b: &Row) -> Result<()> {
    for &index in &self.key_columns {
      if a.get(index) != b.get(index) {
        return Err(ColumnarError::PreconditionViolation(format!(
          "rows of group '{}' differ in key column '{}'",
          self.layout.group(),
          self.layout.column_names()[index]
        )));
      }
    }
    Ok(())
  }

  fn combine_column(
    &self,
    aggregator: &Aggregator,
    index: ColumnIndex,
    expected: ColumnType,
    a: &ColumnValue,
    b: &ColumnValue,
  ) -> Result<ColumnValue> {
    let merged = aggregator
      .combine(a, b)
      .ok_or_else(|| ColumnarError::TypeMismatch {
        column: index,
        expected,
        found: format!("{} and {}", a.type_name(), b.type_name()),
      })?;

    self.layout.check_value(index, &merged)?;
    Ok(merged)
  }
}

/// The layout must describe exactly this group: same kind, identity width
/// and properties in declared order.
fn check_layout_matches(group: &ElementGroupSchema, layout: &GroupLayout) -> Result<()> {
  let identity_width = match group.kind {
    ElementKind::Entity => group.vertex_type.width(),
    ElementKind::Edge => 2 * group.vertex_type.width() + 1,
  };
  let same_properties = layout
    .properties()
    .map(|(name, _)| name)
    .eq(group.property_names());

  if layout.kind() != group.kind
    || layout.identity_columns().len() != identity_width
    || !same_properties
  {
    return Err(ColumnarError::InvalidSchema(format!(
      "column mapping for group '{}' does not match its schema",
      group.name
    )));
  }
  Ok(())
}
