//! Archflow Config
//!
//! This crate contains the serializable diagram types for archflow: the nodes
//! and edges drawn on the canvas, together with the per-node transformation
//! settings the simulation engine reads.
//!
//! Diagrams can be loaded from:
//! - JSON export files (`{version, exportedAt, nodes, edges}`)
//! - A bare `{nodes, edges}` document
//!
//! Field names follow the camelCase wire format produced by the diagram editor.

mod api;
mod diagram;
mod edge;
mod error;
mod node;

pub use api::{ApiCallType, ApiConfig, HttpMethod};
pub use diagram::Diagram;
pub use edge::Edge;
pub use error::ConfigError;
pub use node::{ComponentDescriptor, Node, NodeData, Position, TransformationType};
