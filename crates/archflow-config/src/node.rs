use serde::{Deserialize, Serialize};

use crate::api::ApiConfig;

/// A component instance placed on the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id: String,
  /// Canvas position; irrelevant to simulation.
  #[serde(default)]
  pub position: Position,
  pub data: NodeData,
}

impl Node {
  /// Create a node with default data and the given label.
  pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      position: Position::default(),
      data: NodeData {
        label: label.into(),
        ..NodeData::default()
      },
    }
  }

  pub fn with_transformation(mut self, kind: TransformationType) -> Self {
    self.data.transformation_type = kind;
    self
  }

  pub fn with_dummy_data(mut self, dummy_data: impl Into<String>) -> Self {
    self.data.dummy_data = Some(dummy_data.into());
    self
  }

  pub fn with_api_config(mut self, api_config: ApiConfig) -> Self {
    self.data.api_config = Some(api_config);
    self
  }

  pub fn label(&self) -> &str {
    &self.data.label
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
  #[serde(default)]
  pub label: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub component: Option<ComponentDescriptor>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// JSON-encoded seed value, used only when the node has no incoming edges.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dummy_data: Option<String>,
  #[serde(default)]
  pub transformation_type: TransformationType,
  /// Only consulted when `transformation_type` is `api-call`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_config: Option<ApiConfig>,
}

/// Palette entry a node was created from. Opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub icon: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

/// How a node turns its input into its output.
///
/// Unrecognised names deserialize as [`TransformationType::Passthrough`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransformationType {
  #[default]
  Passthrough,
  AddTimestamp,
  Filter,
  Transform,
  Aggregate,
  ApiCall,
}

impl TransformationType {
  pub fn as_str(&self) -> &'static str {
    match self {
      TransformationType::Passthrough => "passthrough",
      TransformationType::AddTimestamp => "add-timestamp",
      TransformationType::Filter => "filter",
      TransformationType::Transform => "transform",
      TransformationType::Aggregate => "aggregate",
      TransformationType::ApiCall => "api-call",
    }
  }
}

impl From<String> for TransformationType {
  fn from(value: String) -> Self {
    match value.as_str() {
      "add-timestamp" => TransformationType::AddTimestamp,
      "filter" => TransformationType::Filter,
      "transform" => TransformationType::Transform,
      "aggregate" => TransformationType::Aggregate,
      "api-call" => TransformationType::ApiCall,
      _ => TransformationType::Passthrough,
    }
  }
}

impl From<TransformationType> for String {
  fn from(value: TransformationType) -> Self {
    value.as_str().to_string()
  }
}

impl std::fmt::Display for TransformationType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
