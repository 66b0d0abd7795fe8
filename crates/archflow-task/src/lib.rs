//! Archflow Task
//!
//! Per-node work performed during a simulation:
//! - [`interpolate`] resolves `{{$input}}` / `{{$input.path}}` tokens
//! - [`transform`] maps a node's input to its output by transformation kind
//! - [`ApiClient`] performs the live request behind `api-call` nodes
//!
//! None of these fail. Unresolvable tokens are left in place and HTTP
//! failures are returned as values tagged with `_error: true`.

mod http;
mod interpolate;
mod transform;

pub use http::{ApiClient, is_error_output};
pub use interpolate::{interpolate, to_display_string};
pub use transform::transform;
