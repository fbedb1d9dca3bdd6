//! Partition-parallel compaction
//!
//! Runs the merge engine as the combiner of a two-stage reduce:
//!
//! 1. each input partition is pre-aggregated by row key;
//! 2. partial rows are routed to output partitions by `xxh64(key)`;
//! 3. each output partition is merged by key again.
//!
//! Every key ends up in exactly one output row. Within a partition, rows keep
//! the order in which their key was first seen.

use std::hash::{Hash, Hasher};

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::{debug, info};
use xxhash_rust::xxh64::Xxh64;

use crate::constants::{DEFAULT_OUTPUT_PARTITIONS, DEFAULT_PARTITION_SEED};
use crate::error::{ColumnarError, Result};
use crate::merge::MergeEngine;
use crate::types::{Row, RowKey};

// ============================================================================
// Options
// ============================================================================

/// Options for a compaction pass
#[derive(Debug, Clone)]
pub struct CompactionOptions {
  /// Number of output partitions (must be > 0)
  pub output_partitions: usize,
  /// Run partitions on the rayon pool (ignored on wasm32)
  pub parallel: bool,
  /// Seed for key routing
  pub hash_seed: u64,
}

impl Default for CompactionOptions {
  fn default() -> Self {
    Self {
      output_partitions: DEFAULT_OUTPUT_PARTITIONS,
      parallel: true,
      hash_seed: DEFAULT_PARTITION_SEED,
    }
  }
}

impl CompactionOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn output_partitions(mut self, value: usize) -> Self {
    self.output_partitions = value;
    self
  }

  pub fn parallel(mut self, value: bool) -> Self {
    self.parallel = value;
    self
  }

  pub fn hash_seed(mut self, value: u64) -> Self {
    self.hash_seed = value;
    self
  }
}

// ============================================================================
// Output
// ============================================================================

/// Row counts observed during a compaction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionStats {
  /// Rows received
  pub input_rows: usize,
  /// Rows left after per-partition pre-aggregation
  pub partial_rows: usize,
  /// Rows emitted (one per distinct key)
  pub output_rows: usize,
}

/// Result of a compaction pass
#[derive(Debug, Clone)]
pub struct CompactionOutput {
  pub partitions: Vec<Vec<Row>>,
  pub stats: CompactionStats,
}

// ============================================================================
// Compactor
// ============================================================================

/// Drives a merge engine over partitioned rows
#[derive(Debug, Clone)]
pub struct Compactor<'a> {
  engine: &'a MergeEngine,
  options: CompactionOptions,
}

impl<'a> Compactor<'a> {
  pub fn new(engine: &'a MergeEngine, options: CompactionOptions) -> Result<Self> {
    if options.output_partitions == 0 {
      return Err(ColumnarError::InvalidArgument(
        "output_partitions must be > 0".to_string(),
      ));
    }
    Ok(Self { engine, options })
  }

  pub fn options(&self) -> &CompactionOptions {
    &self.options
  }

  /// Output partition a key is routed to
  pub fn partition_of(&self, key: &RowKey) -> usize {
    let mut hasher = Xxh64::new(self.options.hash_seed);
    key.hash(&mut hasher);
    (hasher.finish() % self.options.output_partitions as u64) as usize
  }

  /// Combine all rows sharing a key. The first error aborts the pass.
  pub fn compact(&self, partitions: Vec<Vec<Row>>) -> Result<CompactionOutput> {
    let engine = self.engine;
    let input_rows = partitions.iter().map(Vec::len).sum();

    let partials = run_partitions(partitions, self.options.parallel, |rows| {
      combine_by_key(engine, rows)
    })?;
    let partial_rows = partials.iter().map(IndexMap::len).sum();

    let mut buckets: Vec<Vec<Row>> = vec![Vec::new(); self.options.output_partitions];
    for partial in partials {
      for (key, row) in partial {
        buckets[self.partition_of(&key)].push(row);
      }
    }
    debug!(
      group = engine.group(),
      partial_rows,
      buckets = buckets.len(),
      "routed partial rows"
    );

    let merged = run_partitions(buckets, self.options.parallel, |rows| {
      combine_by_key(engine, rows)
    })?;
    let partitions: Vec<Vec<Row>> = merged
      .into_iter()
      .map(|combined| combined.into_values().collect())
      .collect();

    let stats = CompactionStats {
      input_rows,
      partial_rows,
      output_rows: partitions.iter().map(Vec::len).sum(),
    };
    info!(
      group = engine.group(),
      input_rows = stats.input_rows,
      partial_rows = stats.partial_rows,
      output_rows = stats.output_rows,
      "compaction finished"
    );

    Ok(CompactionOutput { partitions, stats })
  }
}

/// Merge rows sharing a key, in first-seen key order
pub fn combine_by_key(engine: &MergeEngine, rows: Vec<Row>) -> Result<IndexMap<RowKey, Row>> {
  let mut combined: IndexMap<RowKey, Row> = IndexMap::with_capacity(rows.len());
  for row in rows {
    match combined.entry(engine.key_of(&row)?) {
      Entry::Occupied(mut entry) => {
        let merged = engine.merge(entry.get(), &row)?;
        *entry.get_mut() = merged;
      }
      Entry::Vacant(entry) => {
        entry.insert(engine.normalize(row)?);
      }
    }
  }
  Ok(combined)
}

#[cfg(not(target_arch = "wasm32"))]
fn run_partitions<T, F>(inputs: Vec<Vec<Row>>, parallel: bool, f: F) -> Result<Vec<T>>
where
  T: Send,
  F: Fn(Vec<Row>) -> Result<T> + Send + Sync,
{
  use rayon::prelude::*;

  if parallel {
    inputs.into_par_iter().map(f).collect()
  } else {
    inputs.into_iter().map(f).collect()
  }
}

#[cfg(target_arch = "wasm32")]
fn run_partitions<T, F>(inputs: Vec<Vec<Row>>, _parallel: bool, f: F) -> Result<Vec<T>>
where
  F: Fn(Vec<Row>) -> Result<T>,
{
  inputs.into_iter().map(f).collect()
}
