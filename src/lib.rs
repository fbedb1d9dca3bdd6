//! KiteDB columnar - schema-driven element merging for columnar graph stores
//!
//! Graph elements (entities and edges) are stored as flat columnar rows. When
//! two rows share an identity and group-by key they are merged into one,
//! applying per property the aggregate function the schema declares.
//!
//! # Architecture
//!
//! - **Schema** (`schema`): element groups, property types, group-by flags
//! - **Layout** (`layout`): logical properties expanded to physical columns
//! - **Aggregators** (`aggregate`): built-in and user-defined combine functions
//! - **Merge engine** (`merge`): pure, thread-safe row combiner per group
//! - **Compaction** (`compact`): partition-parallel reduce over the engine
//!
//! The named-view cache (`named_view`) and federated trait query
//! (`federated`) live alongside the merge engine.

#![deny(clippy::all)]

// Core modules
pub mod constants;
pub mod error;
pub mod types;

// Schema and physical layout
pub mod layout;
pub mod schema;

// Aggregation and merging
pub mod aggregate;
pub mod compact;
pub mod merge;
pub mod store;

// Adjoining operations
pub mod federated;
pub mod named_view;

// Re-export commonly used items
pub use aggregate::{AggregateFunction, AggregateFunctionId, Aggregator, AggregatorRegistry};
pub use compact::{CompactionOptions, CompactionOutput, CompactionStats, Compactor};
pub use error::{ColumnarError, Result};
pub use layout::{ColumnMapping, GroupLayout, RowBuilder};
pub use merge::MergeEngine;
pub use schema::{ElementGroupSchema, GraphSchema, PropertyDef, ValueType};
pub use store::ColumnarStore;
pub use types::{ColumnIndex, ColumnType, ColumnValue, ElementKind, Row, RowKey};
