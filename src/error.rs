//! Error types for the columnar element store

use thiserror::Error;

use crate::types::ColumnType;

/// Errors raised by schema resolution, merging, and the adjoining caches
#[derive(Debug, Error)]
pub enum ColumnarError {
  // ==========================================================================
  // Configuration (detected when a merge engine is built)
  // ==========================================================================
  #[error("no aggregate function registered as '{function}' (group '{group}', property '{property}')")]
  UnknownAggregator {
    group: String,
    property: String,
    function: String,
  },

  #[error("property '{property}' in group '{group}' is not group-by and declares no aggregate function")]
  MissingAggregator { group: String, property: String },

  #[error("aggregate function '{function}' does not accept {column_type} (group '{group}', property '{property}')")]
  AggregatorTypeMismatch {
    group: String,
    property: String,
    function: String,
    column_type: ColumnType,
  },

  #[error("Invalid schema: {0}")]
  InvalidSchema(String),

  #[error("Unknown element group: {0}")]
  UnknownGroup(String),

  #[error("Unknown property '{property}' in group '{group}'")]
  UnknownProperty { group: String, property: String },

  // ==========================================================================
  // Merge-time failures
  // ==========================================================================
  #[error("Merge precondition violated: {0}")]
  PreconditionViolation(String),

  #[error("Type mismatch in column {column}: expected {expected}, found {found}")]
  TypeMismatch {
    column: usize,
    expected: ColumnType,
    found: String,
  },

  // ==========================================================================
  // Named views and federation
  // ==========================================================================
  #[error("Already exists: {0}")]
  AlreadyExists(String),

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  #[error("Unknown graph: {0}")]
  UnknownGraph(String),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl ColumnarError {
  /// True for errors that mean the schema or aggregator bindings are unusable.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      ColumnarError::UnknownAggregator { .. }
        | ColumnarError::MissingAggregator { .. }
        | ColumnarError::AggregatorTypeMismatch { .. }
        | ColumnarError::InvalidSchema(_)
        | ColumnarError::UnknownGroup(_)
        | ColumnarError::UnknownProperty { .. }
    )
  }
}

pub type Result<T> = std::result::Result<T, ColumnarError>;
