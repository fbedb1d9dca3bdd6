//! Federated store traits
//!
//! A federated store fronts several sub-stores, each advertising a set of
//! capabilities. `GetTraits` asks either which traits *any* target supports
//! (union) or which traits *every* target supports (intersection).

use bitflags::bitflags;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ColumnarError, Result};

bitflags! {
  /// Capabilities a store can advertise
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
  pub struct StoreTraits: u32 {
    const QUERY_AGGREGATION = 1 << 0;
    const INGEST_AGGREGATION = 1 << 1;
    const PRE_AGGREGATION_FILTERING = 1 << 2;
    const POST_AGGREGATION_FILTERING = 1 << 3;
    const POST_TRANSFORMATION_FILTERING = 1 << 4;
    const TRANSFORMATION = 1 << 5;
    const STORE_VALIDATION = 1 << 6;
    const ORDERED = 1 << 7;
    const MATCHED_VERTEX = 1 << 8;
    const VISIBILITY = 1 << 9;
  }
}

/// Trait query against a federated store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTraits {
  /// Target sub-stores; `None` targets every configured sub-store
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub graph_ids: Option<Vec<String>>,
  /// `true`: traits supported by any target; `false`: traits shared by all
  #[serde(default)]
  pub is_supported_traits: bool,
}

impl GetTraits {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn graph_ids<I, S>(mut self, ids: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.graph_ids = Some(ids.into_iter().map(Into::into).collect());
    self
  }

  pub fn supported_traits(mut self, value: bool) -> Self {
    self.is_supported_traits = value;
    self
  }
}

/// Registry of sub-stores and their advertised traits
#[derive(Debug, Default)]
pub struct FederatedStore {
  graphs: RwLock<IndexMap<String, StoreTraits>>,
}

impl FederatedStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_graph(&self, graph_id: &str, traits: StoreTraits) -> Result<()> {
    if graph_id.is_empty() {
      return Err(ColumnarError::InvalidArgument(
        "graph id must be set".to_string(),
      ));
    }
    let mut graphs = self.graphs.write();
    if graphs.contains_key(graph_id) {
      return Err(ColumnarError::AlreadyExists(format!("graph '{graph_id}'")));
    }
    debug!(graph_id, traits = ?traits, "added sub-store");
    graphs.insert(graph_id.to_string(), traits);
    Ok(())
  }

  pub fn remove_graph(&self, graph_id: &str) -> bool {
    self.graphs.write().shift_remove(graph_id).is_some()
  }

  pub fn graph_ids(&self) -> Vec<String> {
    self.graphs.read().keys().cloned().collect()
  }

  /// Union or intersection of the targets' traits; empty when there are no targets
  pub fn get_traits(&self, op: &GetTraits) -> Result<StoreTraits> {
    let graphs = self.graphs.read();

    let targets: Vec<StoreTraits> = match &op.graph_ids {
      Some(ids) => ids
        .iter()
        .map(|id| {
          graphs
            .get(id)
            .copied()
            .ok_or_else(|| ColumnarError::UnknownGraph(id.clone()))
        })
        .collect::<Result<_>>()?,
      None => graphs.values().copied().collect(),
    };

    let traits = if op.is_supported_traits {
      targets.into_iter().fold(StoreTraits::empty(), |acc, t| acc | t)
    } else {
      targets.into_iter().reduce(|acc, t| acc & t).unwrap_or_else(StoreTraits::empty)
    };
    Ok(traits)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store() -> FederatedStore {
    let store = FederatedStore::new();
    store
      .add_graph(
        "accumulo",
        StoreTraits::QUERY_AGGREGATION | StoreTraits::INGEST_AGGREGATION | StoreTraits::ORDERED,
      )
      .unwrap();
    store
      .add_graph(
        "map",
        StoreTraits::QUERY_AGGREGATION | StoreTraits::TRANSFORMATION,
      )
      .unwrap();
    store
  }

  #[test]
  fn test_intersection_by_default() {
    let traits = store().get_traits(&GetTraits::new()).unwrap();
    assert_eq!(traits, StoreTraits::QUERY_AGGREGATION);
  }

  #[test]
  fn test_union_when_supported() {
    let traits = store()
      .get_traits(&GetTraits::new().supported_traits(true))
      .unwrap();
    assert_eq!(
      traits,
      StoreTraits::QUERY_AGGREGATION
        | StoreTraits::INGEST_AGGREGATION
        | StoreTraits::ORDERED
        | StoreTraits::TRANSFORMATION
    );
  }

  #[test]
  fn test_targeted_graphs() {
    let store = store();
    let traits = store
      .get_traits(&GetTraits::new().graph_ids(["accumulo"]))
      .unwrap();
    assert!(traits.contains(StoreTraits::ORDERED));

    let err = store
      .get_traits(&GetTraits::new().graph_ids(["missing"]))
      .unwrap_err();
    assert!(matches!(err, ColumnarError::UnknownGraph(_)));
  }

  #[test]
  fn test_no_targets_is_empty() {
    let empty = FederatedStore::new();
    assert!(empty.get_traits(&GetTraits::new()).unwrap().is_empty());
    assert!(empty
      .get_traits(&GetTraits::new().supported_traits(true))
      .unwrap()
      .is_empty());
    assert!(store()
      .get_traits(&GetTraits::new().graph_ids(Vec::<String>::new()))
      .unwrap()
      .is_empty());
  }

  #[test]
  fn test_duplicate_graph_rejected() {
    let store = store();
    assert!(matches!(
      store.add_graph("map", StoreTraits::empty()),
      Err(ColumnarError::AlreadyExists(_))
    ));
    assert!(store.remove_graph("map"));
    assert_eq!(store.graph_ids(), vec!["accumulo"]);
  }

  #[test]
  fn test_get_traits_json() {
    let op: GetTraits =
      serde_json::from_str(r#"{"graph_ids": ["a", "b"], "is_supported_traits": true}"#).unwrap();
    assert_eq!(op, GetTraits::new().graph_ids(["a", "b"]).supported_traits(true));
    let default: GetTraits = serde_json::from_str("{}").unwrap();
    assert!(!default.is_supported_traits);
  }
}
