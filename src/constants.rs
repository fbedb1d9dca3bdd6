//! Column names and defaults shared across the store

// ============================================================================
// Reserved column names
// ============================================================================

/// Identity column of an entity row
pub const VERTEX: &str = "VERTEX";
/// Source identity column of an edge row
pub const SOURCE: &str = "SRC";
/// Destination identity column of an edge row
pub const DESTINATION: &str = "DST";
/// Directed flag column of an edge row
pub const DIRECTED: &str = "DIRECTED";
/// Trailing merge-count column
pub const COUNT: &str = "__count";

/// Separator between a property name and its sub-column name
pub const COLUMN_PATH_SEPARATOR: &str = "_";

// ============================================================================
// Merge count
// ============================================================================

/// Count of a row that has never been merged (also used when the count column is absent)
pub const FRESH_ROW_COUNT: i64 = 1;

// ============================================================================
// Compaction defaults
// ============================================================================

/// Default number of output partitions produced by a compaction pass
pub const DEFAULT_OUTPUT_PARTITIONS: usize = 4;

/// Default xxh64 seed used to route row keys to output partitions
pub const DEFAULT_PARTITION_SEED: u64 = 0;
