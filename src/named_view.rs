//! Named views
//!
//! A named view is a reusable, parameterised view definition stored in a
//! key-value cache under its name. Adding a view whose name is taken fails
//! unless the caller asks to overwrite it.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ColumnarError, Result};

// ============================================================================
// View details
// ============================================================================

/// Declaration of one view parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewParameterDetail {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Name of the expected value type
  pub value_class: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_value: Option<serde_json::Value>,
  #[serde(default)]
  pub required: bool,
}

/// A view stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedViewDetail {
  pub name: String,
  /// View definition as JSON
  pub view: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub parameters: IndexMap<String, ViewParameterDetail>,
}

// ============================================================================
// Add operation
// ============================================================================

/// Request to add a named view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddNamedView {
  pub name: String,
  pub view: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default)]
  pub parameters: IndexMap<String, ViewParameterDetail>,
  /// Replace an existing view of the same name
  #[serde(default)]
  pub overwrite: bool,
}

impl AddNamedView {
  pub fn new(name: &str, view: serde_json::Value) -> Self {
    Self {
      name: name.to_string(),
      view,
      description: None,
      parameters: IndexMap::new(),
      overwrite: false,
    }
  }

  /// Parse the view definition from a JSON string
  pub fn from_view_json(name: &str, view: &str) -> Result<Self> {
    Ok(Self::new(name, serde_json::from_str(view)?))
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.is_empty() {
      return Err(ColumnarError::InvalidArgument(
        "NamedView name must be set".to_string(),
      ));
    }
    Ok(())
  }

  fn to_detail(&self) -> NamedViewDetail {
    NamedViewDetail {
      name: self.name.clone(),
      view: self.view.clone(),
      description: self.description.clone(),
      parameters: self.parameters.clone(),
    }
  }
}

// ============================================================================
// Cache
// ============================================================================

/// Key-value store of named views
pub trait NamedViewCache: Send + Sync {
  /// Add a view; fails with `AlreadyExists` if the name is taken and
  /// `overwrite` is false.
  fn add(&self, detail: NamedViewDetail, overwrite: bool) -> Result<()>;

  fn get(&self, name: &str) -> Option<NamedViewDetail>;

  /// Remove a view, returning whether it existed
  fn remove(&self, name: &str) -> bool;

  /// Names of all views, in insertion order
  fn names(&self) -> Vec<String>;
}

/// In-process named view cache
#[derive(Debug, Default)]
pub struct InMemoryNamedViewCache {
  views: RwLock<IndexMap<String, NamedViewDetail>>,
}

impl InMemoryNamedViewCache {
  pub fn new() -> Self {
    Self::default()
  }
}

impl NamedViewCache for InMemoryNamedViewCache {
  fn add(&self, detail: NamedViewDetail, overwrite: bool) -> Result<()> {
    if detail.name.is_empty() {
      return Err(ColumnarError::InvalidArgument(
        "NamedView name must be set".to_string(),
      ));
    }

    let mut views = self.views.write();
    if views.contains_key(&detail.name) {
      if !overwrite {
        return Err(ColumnarError::AlreadyExists(format!(
          "named view '{}'",
          detail.name
        )));
      }
      warn!(name = %detail.name, "overwriting named view");
    }
    debug!(name = %detail.name, "stored named view");
    views.insert(detail.name.clone(), detail);
    Ok(())
  }

  fn get(&self, name: &str) -> Option<NamedViewDetail> {
    self.views.read().get(name).cloned()
  }

  fn remove(&self, name: &str) -> bool {
    self.views.write().shift_remove(name).is_some()
  }

  fn names(&self) -> Vec<String> {
    self.views.read().keys().cloned().collect()
  }
}

// ============================================================================
// Handler
// ============================================================================

/// Executes [`AddNamedView`] requests against a cache
#[derive(Clone)]
pub struct AddNamedViewHandler {
  cache: Arc<dyn NamedViewCache>,
}

impl Default for AddNamedViewHandler {
  fn default() -> Self {
    Self::new(Arc::new(InMemoryNamedViewCache::new()))
  }
}

impl AddNamedViewHandler {
  pub fn new(cache: Arc<dyn NamedViewCache>) -> Self {
    Self { cache }
  }

  pub fn cache(&self) -> &Arc<dyn NamedViewCache> {
    &self.cache
  }

  pub fn do_operation(&self, operation: &AddNamedView) -> Result<()> {
    operation.validate()?;
    self.cache.add(operation.to_detail(), operation.overwrite)
  }
}
