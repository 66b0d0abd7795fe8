//! `{{$input}}` token interpolation.
//!
//! ```text
//! "{{ $input }}"          -> whole input (JSON for objects/arrays)
//! "{{$input.user.name}}"  -> value at path, or the token text if missing
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\{\{\s*\$input((?:\.[^.\s{}]+)*)\s*\}\}").expect("token pattern is valid")
});

/// Replace every `{{$input...}}` token in `template` with data from `input`.
///
/// A dotted path walks object keys (and array indices). When any segment
/// cannot be resolved the whole token text is kept unchanged.
pub fn interpolate(template: &str, input: &Value) -> String {
  if template.is_empty() {
    return String::new();
  }

  TOKEN
    .replace_all(template, |caps: &Captures| {
      let path = caps.get(1).map(|m| m.as_str()).unwrap_or("");
      if path.is_empty() {
        return to_display_string(input);
      }

      match lookup(input, &path[1..]) {
        Some(value) => to_display_string(value),
        None => caps[0].to_string(),
      }
    })
    .into_owned()
}

fn lookup<'a>(input: &'a Value, path: &str) -> Option<&'a Value> {
  path.split('.').try_fold(input, |current, segment| match current {
    Value::Object(map) => map.get(segment),
    Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
    _ => None,
  })
}

/// Render a value the way it is substituted into text.
///
/// Objects and arrays become compact JSON, strings are inserted raw and
/// integral numbers lose any trailing `.0`.
pub fn to_display_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => "null".to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => {
      if n.is_i64() || n.is_u64() {
        return n.to_string();
      }
      match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
      }
    }
    Value::Array(_) | Value::Object(_) => value.to_string(),
  }
}
