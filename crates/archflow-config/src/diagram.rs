use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::error::ConfigError;
use crate::node::Node;

/// A diagram as exported by the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exported_at: Option<String>,
  #[serde(default)]
  pub nodes: Vec<Node>,
  #[serde(default)]
  pub edges: Vec<Edge>,
}

impl Diagram {
  pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
    Self {
      nodes,
      edges,
      ..Self::default()
    }
  }

  pub fn from_json(content: &str) -> Result<Self, ConfigError> {
    Ok(serde_json::from_str(content)?)
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&content)
  }
}
