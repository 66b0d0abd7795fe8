use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Direction of an API call node.
///
/// Carried through from the editor but not consulted by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiCallType {
  #[default]
  Fetch,
  Send,
  Both,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
  #[default]
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl HttpMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      HttpMethod::Get => "GET",
      HttpMethod::Post => "POST",
      HttpMethod::Put => "PUT",
      HttpMethod::Patch => "PATCH",
      HttpMethod::Delete => "DELETE",
    }
  }

  /// Whether requests with this method carry a body.
  pub fn has_body(&self) -> bool {
    matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
  }
}

/// Settings for an `api-call` node.
///
/// `url` and `body` may contain `{{$input...}}` tokens which are resolved
/// against the node's input before the request is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
  #[serde(default)]
  pub enabled: bool,
  #[serde(default, rename = "type")]
  pub call_type: ApiCallType,
  #[serde(default)]
  pub method: HttpMethod,
  #[serde(default)]
  pub url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub headers: Option<HashMap<String, String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub body: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub response_mapping: Option<String>,
}
