//! Columnar store handle
//!
//! Holds a validated schema, its column mapping and one merge engine per
//! element group. Everything is resolved when the store is opened, so
//! configuration errors surface before any row is processed.

use indexmap::IndexMap;
use tracing::info;

use crate::aggregate::AggregatorRegistry;
use crate::compact::{CompactionOptions, CompactionOutput, Compactor};
use crate::error::{ColumnarError, Result};
use crate::layout::{ColumnMapping, GroupLayout};
use crate::merge::MergeEngine;
use crate::schema::GraphSchema;
use crate::types::Row;

/// Schema, layouts and merge engines of a columnar graph store
#[derive(Debug, Clone)]
pub struct ColumnarStore {
  schema: GraphSchema,
  mapping: ColumnMapping,
  engines: IndexMap<String, MergeEngine>,
}

impl ColumnarStore {
  /// Open a store with the built-in aggregate functions only
  pub fn open(schema: GraphSchema) -> Result<Self> {
    Self::open_with_registry(schema, &AggregatorRegistry::new())
  }

  /// Open a store resolving aggregate functions against `registry`
  pub fn open_with_registry(schema: GraphSchema, registry: &AggregatorRegistry) -> Result<Self> {
    schema.validate()?;
    let mapping = ColumnMapping::from_schema(&schema)?;

    let mut engines = IndexMap::with_capacity(schema.len());
    for group in schema.groups() {
      engines.insert(group.name.clone(), MergeEngine::new(group, &mapping, registry)?);
    }

    info!(groups = engines.len(), "opened columnar store");
    Ok(Self {
      schema,
      mapping,
      engines,
    })
  }

  pub fn schema(&self) -> &GraphSchema {
    &self.schema
  }

  pub fn mapping(&self) -> &ColumnMapping {
    &self.mapping
  }

  pub fn layout(&self, group: &str) -> Result<&GroupLayout> {
    self.mapping.layout(group)
  }

  pub fn engine(&self, group: &str) -> Result<&MergeEngine> {
    self
      .engines
      .get(group)
      .ok_or_else(|| ColumnarError::UnknownGroup(group.to_string()))
  }

  /// Merge two rows of `group`
  pub fn merge(&self, group: &str, a: &Row, b: &Row) -> Result<Row> {
    self.engine(group)?.merge(a, b)
  }

  /// Compact partitioned rows of `group`
  pub fn compact(
    &self,
    group: &str,
    partitions: Vec<Vec<Row>>,
    options: CompactionOptions,
  ) -> Result<CompactionOutput> {
    Compactor::new(self.engine(group)?, options)?.compact(partitions)
  }
}
