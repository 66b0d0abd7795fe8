use archflow_config::{ApiConfig, TransformationType};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::http::ApiClient;

/// Apply a node's transformation to its input.
///
/// Only `api-call` does I/O; every other kind is computed in place.
pub async fn transform(
  input: &Value,
  kind: TransformationType,
  api_config: Option<&ApiConfig>,
  client: &ApiClient,
) -> Value {
  match kind {
    TransformationType::Passthrough => input.clone(),
    TransformationType::AddTimestamp => add_timestamp(input),
    TransformationType::Filter => filter_empty(input),
    TransformationType::Transform => mark_transformed(input),
    TransformationType::Aggregate => aggregate(input),
    TransformationType::ApiCall => match api_config {
      Some(config) if config.enabled => client.execute(config, input).await,
      _ => input.clone(),
    },
  }
}

fn add_timestamp(input: &Value) -> Value {
  let mut fields = match input {
    Value::Object(map) => map.clone(),
    other => {
      let mut map = Map::new();
      map.insert("value".to_string(), other.clone());
      map
    }
  };

  let now = Utc::now();
  fields.insert(
    "timestamp".to_string(),
    Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
  );
  fields.insert("processedAt".to_string(), json!(now.timestamp_millis()));
  Value::Object(fields)
}

/// Drop keys holding `null` or `""`.
fn filter_empty(input: &Value) -> Value {
  match input {
    Value::Object(map) => Value::Object(
      map
        .iter()
        .filter(|(_, v)| !matches!(v, Value::Null) && v.as_str() != Some(""))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
    ),
    other => other.clone(),
  }
}

fn mark_transformed(input: &Value) -> Value {
  json!({
    "original": input,
    "transformed": true,
    "meta": { "version": "1.0", "engine": "archflow" },
  })
}

fn aggregate(input: &Value) -> Value {
  let data = match input {
    Value::Array(items) => items.clone(),
    other => vec![other.clone()],
  };
  let count = data.len();
  json!({
    "aggregated": true,
    "data": data,
    "count": count,
  })
}
