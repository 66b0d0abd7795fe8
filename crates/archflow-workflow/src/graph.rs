use std::collections::{HashMap, HashSet};

use archflow_config::{Edge, Node};

/// Nodes with in-degree zero, in node list order.
///
/// A graph in which every node has an incoming edge (for example a single
/// cycle) has no start nodes.
pub fn find_start_nodes<'a>(nodes: &'a [Node], edges: &[Edge]) -> Vec<&'a Node> {
  let targets: HashSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();
  nodes
    .iter()
    .filter(|node| !targets.contains(node.id.as_str()))
    .collect()
}

/// All edges whose source is `node_id`, in edge list order.
pub fn outgoing_edges<'a>(node_id: &str, edges: &'a [Edge]) -> Vec<&'a Edge> {
  edges.iter().filter(|e| e.source == node_id).collect()
}

/// Indexed view over a diagram snapshot for traversal.
#[derive(Debug, Clone)]
pub struct Graph<'a> {
  nodes: HashMap<&'a str, &'a Node>,
  /// node_id -> outgoing edges, in edge list order.
  adjacency: HashMap<&'a str, Vec<&'a Edge>>,
  start_nodes: Vec<&'a Node>,
  /// Nodes with more than one incoming edge.
  join_points: HashSet<&'a str>,
  dangling: Vec<&'a Edge>,
}

impl<'a> Graph<'a> {
  pub fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
    // First occurrence wins for duplicate ids.
    let mut by_id: HashMap<&'a str, &'a Node> = HashMap::with_capacity(nodes.len());
    for node in nodes {
      by_id.entry(node.id.as_str()).or_insert(node);
    }

    let mut adjacency: HashMap<&'a str, Vec<&'a Edge>> = HashMap::new();
    let mut in_degree: HashMap<&'a str, usize> = HashMap::new();
    let mut dangling = Vec::new();

    for edge in edges {
      adjacency.entry(edge.source.as_str()).or_default().push(edge);
      *in_degree.entry(edge.target.as_str()).or_default() += 1;

      if !by_id.contains_key(edge.source.as_str()) || !by_id.contains_key(edge.target.as_str()) {
        dangling.push(edge);
      }
    }

    let join_points = in_degree
      .iter()
      .filter(|(_, count)| **count > 1)
      .map(|(id, _)| *id)
      .collect();

    Self {
      nodes: by_id,
      adjacency,
      start_nodes: find_start_nodes(nodes, edges),
      join_points,
      dangling,
    }
  }

  /// Nodes with no incoming edges.
  pub fn start_nodes(&self) -> &[&'a Node] {
    &self.start_nodes
  }

  /// Edges leaving `node_id`.
  pub fn outgoing(&self, node_id: &str) -> &[&'a Edge] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  pub fn node(&self, node_id: &str) -> Option<&'a Node> {
    self.nodes.get(node_id).copied()
  }

  pub fn is_join_point(&self, node_id: &str) -> bool {
    self.join_points.contains(node_id)
  }

  pub fn join_points(&self) -> &HashSet<&'a str> {
    &self.join_points
  }

  /// Edges whose source or target id matches no node.
  pub fn dangling_edges(&self) -> &[&'a Edge] {
    &self.dangling
  }
}
