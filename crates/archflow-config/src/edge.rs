use serde::{Deserialize, Serialize};

/// A directed connection between two nodes.
///
/// Parallel edges between the same pair of nodes are legal; each one is
/// traversed on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
  pub id: String,
  pub source: String,
  pub target: String,
  /// Display-only label.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
}

impl Edge {
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      label: None,
    }
  }
}
