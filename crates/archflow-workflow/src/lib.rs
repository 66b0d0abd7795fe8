//! Archflow Workflow
//!
//! Graph analysis over a diagram snapshot: which nodes seed a simulation and
//! which edges leave a given node.
//!
//! Key properties:
//! - Start nodes are nodes whose id never appears as an edge target
//! - Outgoing edges keep the order of the supplied edge list
//! - Dangling edges are reported, never rejected

mod graph;

pub use graph::{Graph, find_start_nodes, outgoing_edges};
