use archflow_config::{ApiConfig, HttpMethod};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::interpolate::{interpolate, to_display_string};

/// Failures while building or sending a request. Never leaves this module;
/// callers see them as `_error` values.
#[derive(Debug, Error)]
enum ApiCallError {
  #[error("invalid URL '{url}': {source}")]
  InvalidUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },

  #[error("invalid header '{name}': {message}")]
  InvalidHeader { name: String, message: String },

  #[error("{0}")]
  Http(#[from] reqwest::Error),
}

/// HTTP client used by `api-call` nodes.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone, Default)]
pub struct ApiClient {
  client: Client,
}

impl ApiClient {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use a preconfigured reqwest client (proxies, timeouts, TLS settings).
  pub fn with_client(client: Client) -> Self {
    Self { client }
  }

  /// Perform the request described by `config` for the given input.
  ///
  /// Returns the input unchanged when the config is disabled or has no URL.
  /// Non-2xx responses yield `{_error, _status, _statusText, _input}`;
  /// transport failures yield `{_error, _message, _input}`.
  pub async fn execute(&self, config: &ApiConfig, input: &Value) -> Value {
    if !config.enabled || config.url.is_empty() {
      return input.clone();
    }

    match self.send(config, input).await {
      Ok(output) => output,
      Err(e) => {
        warn!(url = %config.url, method = config.method.as_str(), error = %e, "api_call_failed");
        json!({
          "_error": true,
          "_message": e.to_string(),
          "_input": input,
        })
      }
    }
  }

  async fn send(&self, config: &ApiConfig, input: &Value) -> Result<Value, ApiCallError> {
    let body_template = config.body.as_deref().filter(|b| !b.is_empty());
    let url = build_url(config, input, body_template.is_some())?;
    let headers = build_headers(config)?;

    let mut request = self
      .client
      .request(to_method(config.method), url.clone())
      .headers(headers);

    if config.method.has_body() {
      let body = match body_template {
        Some(template) => Some(interpolate(template, input)),
        None if is_falsy(input) => None,
        None => Some(input.to_string()),
      };
      if let Some(body) = body {
        request = request.body(body);
      }
    }

    debug!(method = config.method.as_str(), url = %url, "api_call_started");
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
      warn!(url = %url, status = status.as_u16(), "api_call_rejected");
      return Ok(json!({
        "_error": true,
        "_status": status.as_u16(),
        "_statusText": status.canonical_reason().unwrap_or(""),
        "_input": input,
      }));
    }

    let is_json = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|ct| ct.contains("application/json"));

    debug!(url = %url, status = status.as_u16(), json = is_json, "api_call_completed");

    if is_json {
      Ok(response.json::<Value>().await?)
    } else {
      let text = response.text().await?;
      Ok(json!({
        "_response": text,
        "_status": status.as_u16(),
      }))
    }
  }
}

/// Whether a node output represents a failed API call.
pub fn is_error_output(value: &Value) -> bool {
  value.get("_error").and_then(Value::as_bool) == Some(true)
}

fn build_url(config: &ApiConfig, input: &Value, has_body_template: bool) -> Result<Url, ApiCallError> {
  let raw = interpolate(&config.url, input);
  let mut url = Url::parse(&raw).map_err(|source| ApiCallError::InvalidUrl {
    url: raw.clone(),
    source,
  })?;

  // GET carries plain-object input as query parameters.
  if config.method == HttpMethod::Get && !has_body_template {
    if let Value::Object(fields) = input {
      let params: Vec<(&String, &Value)> = fields.iter().filter(|(_, v)| !v.is_null()).collect();
      if !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
          pairs.append_pair(key, &to_display_string(value));
        }
      }
    }
  }

  Ok(url)
}

fn build_headers(config: &ApiConfig) -> Result<HeaderMap, ApiCallError> {
  let mut headers = HeaderMap::new();
  headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

  for (name, value) in config.headers.iter().flatten() {
    let header_name =
      HeaderName::from_bytes(name.as_bytes()).map_err(|e| ApiCallError::InvalidHeader {
        name: name.clone(),
        message: e.to_string(),
      })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| ApiCallError::InvalidHeader {
      name: name.clone(),
      message: e.to_string(),
    })?;
    headers.insert(header_name, header_value);
  }

  Ok(headers)
}

fn to_method(method: HttpMethod) -> Method {
  match method {
    HttpMethod::Get => Method::GET,
    HttpMethod::Post => Method::POST,
    HttpMethod::Put => Method::PUT,
    HttpMethod::Patch => Method::PATCH,
    HttpMethod::Delete => Method::DELETE,
  }
}

fn is_falsy(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::Bool(b) => !b,
    Value::Number(n) => n.as_f64() == Some(0.0),
    Value::String(s) => s.is_empty(),
    Value::Array(_) | Value::Object(_) => false,
  }
}
