//! Simulation runner.
//!
//! A `SimulationRunner` is created per simulation, run once, and may be
//! stopped early from another task through [`SimulationRunner::stop`] or a
//! [`StopHandle`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use archflow_config::{Edge, Node};
use archflow_task::{ApiClient, is_error_output, transform};
use archflow_workflow::Graph;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::events::{SimulationObserver, SimulationStep};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationOutcome {
  /// All start nodes were fully processed and `on_complete` fired.
  Completed { steps: usize },
  /// The run was stopped; `on_complete` did not fire.
  Stopped { steps: usize },
}

impl SimulationOutcome {
  pub fn steps(&self) -> usize {
    match self {
      SimulationOutcome::Completed { steps } | SimulationOutcome::Stopped { steps } => *steps,
    }
  }
}

/// Cloneable handle that stops a runner from elsewhere.
#[derive(Debug, Clone)]
pub struct StopHandle {
  token: CancellationToken,
}

impl StopHandle {
  pub fn stop(&self) {
    self.token.cancel();
  }

  pub fn is_stopped(&self) -> bool {
    self.token.is_cancelled()
  }
}

/// Propagates seed data through a diagram snapshot.
pub struct SimulationRunner {
  nodes: Vec<Node>,
  edges: Vec<Edge>,
  config: SimulationConfig,
  observer: Arc<dyn SimulationObserver>,
  client: ApiClient,
  stopped: CancellationToken,
  started: AtomicBool,
}

impl SimulationRunner {
  /// Create a runner over the given snapshot.
  ///
  /// # Arguments
  /// * `nodes`, `edges` - the diagram; never mutated
  /// * `speed_ms` - pacing delay before each node is transformed
  /// * `observer` - receives progress and answers pause/stop queries
  pub fn new(
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    speed_ms: u64,
    observer: Arc<dyn SimulationObserver>,
  ) -> Self {
    Self {
      nodes,
      edges,
      config: SimulationConfig::from_speed_ms(speed_ms),
      observer,
      client: ApiClient::new(),
      stopped: CancellationToken::new(),
      started: AtomicBool::new(false),
    }
  }

  pub fn with_config(mut self, config: SimulationConfig) -> Self {
    self.config = config;
    self
  }

  /// Use a specific HTTP client for `api-call` nodes.
  pub fn with_client(mut self, client: ApiClient) -> Self {
    self.client = client;
    self
  }

  pub fn config(&self) -> &SimulationConfig {
    &self.config
  }

  /// Request a stop. Work already in flight finishes, nothing after it starts.
  pub fn stop(&self) {
    info!("simulation_stop_requested");
    self.stopped.cancel();
  }

  pub fn stop_handle(&self) -> StopHandle {
    StopHandle {
      token: self.stopped.clone(),
    }
  }

  /// Run the simulation to completion or until stopped.
  ///
  /// Start nodes are processed one after another, each depth-first: a node's
  /// output becomes the input of every direct successor, and each branch is
  /// finished before the next sibling edge is followed.
  #[instrument(
    name = "simulation_run",
    skip(self),
    fields(nodes = self.nodes.len(), edges = self.edges.len())
  )]
  pub async fn run(&self) -> Result<SimulationOutcome, SimulationError> {
    if self.started.swap(true, Ordering::SeqCst) {
      return Err(SimulationError::AlreadyRun);
    }

    let graph = Graph::new(&self.nodes, &self.edges);
    let start_nodes = graph.start_nodes();
    let start_ids: Vec<&str> = start_nodes.iter().map(|n| n.id.as_str()).collect();

    info!(
      start_nodes = ?start_ids,
      speed_ms = self.config.speed.as_millis() as u64,
      "simulation_started"
    );

    if start_nodes.is_empty() && !self.nodes.is_empty() {
      warn!("every node has an incoming edge; nothing to simulate");
    }
    for edge in graph.dangling_edges() {
      debug!(edge_id = %edge.id, source = %edge.source, target = %edge.target, "dangling_edge");
    }

    let mut steps = 0;
    for &start in start_nodes {
      let seed = parse_seed(start.data.dummy_data.as_deref());
      if !self.propagate(&graph, start, seed, &mut steps).await {
        info!(steps, "simulation_stopped");
        return Ok(SimulationOutcome::Stopped { steps });
      }
    }

    if self.is_stopped() {
      info!(steps, "simulation_stopped");
      return Ok(SimulationOutcome::Stopped { steps });
    }

    self.observer.on_complete();
    info!(steps, "simulation_completed");
    Ok(SimulationOutcome::Completed { steps })
  }

  /// Depth-first pre-order walk from `start`. Returns `false` when stopped.
  async fn propagate<'g>(
    &self,
    graph: &Graph<'g>,
    start: &'g Node,
    seed: Value,
    steps: &mut usize,
  ) -> bool {
    let mut pending: Vec<(&'g Node, Value)> = vec![(start, seed)];

    while let Some((node, input)) = pending.pop() {
      if self.is_stopped() {
        return false;
      }

      self.observer.on_node_enter(&node.id);
      debug!(node_id = %node.id, node_name = %node.label(), "node_entered");

      if !self.pace().await {
        return false;
      }

      let output = transform(
        &input,
        node.data.transformation_type,
        node.data.api_config.as_ref(),
        &self.client,
      )
      .await;

      *steps += 1;
      if is_error_output(&output) {
        warn!(
          node_id = %node.id,
          node_name = %node.label(),
          step = *steps,
          output = %output,
          "node_processed_with_error"
        );
      } else {
        info!(
          node_id = %node.id,
          node_name = %node.label(),
          transformation = %node.data.transformation_type,
          step = *steps,
          "node_processed"
        );
      }

      let step = SimulationStep {
        node_id: node.id.clone(),
        node_name: node.label().to_string(),
        input_data: input,
        output_data: output,
        timestamp: chrono::Utc::now().timestamp_millis(),
      };
      self.observer.on_node_process(&step);

      // Reverse so the first outgoing edge is popped first.
      for edge in graph.outgoing(&node.id).iter().rev() {
        match graph.node(&edge.target) {
          Some(target) => pending.push((target, step.output_data.clone())),
          None => debug!(edge_id = %edge.id, target = %edge.target, "skipping edge to unknown node"),
        }
      }
    }

    true
  }

  /// Wait `speed`, then keep waiting while paused. Returns `false` when
  /// stopped during the wait.
  async fn pace(&self) -> bool {
    let tick = self.config.poll_interval.max(Duration::from_millis(1));
    let mut remaining = self.config.speed;

    if remaining.is_zero() {
      // Let a concurrent stop() run even when nothing else yields.
      tokio::task::yield_now().await;
    }

    while !remaining.is_zero() {
      let wait = remaining.min(tick);
      if !self.sleep(wait).await {
        return false;
      }
      remaining -= wait;
    }

    while self.observer.is_paused() {
      if !self.sleep(tick).await {
        return false;
      }
    }

    !self.is_stopped()
  }

  async fn sleep(&self, duration: Duration) -> bool {
    tokio::select! {
      _ = self.stopped.cancelled() => false,
      _ = tokio::time::sleep(duration) => !self.is_stopped(),
    }
  }

  fn is_stopped(&self) -> bool {
    self.stopped.is_cancelled() || self.observer.is_stopped()
  }
}

/// Seed value for a start node.
///
/// Parsed JSON when possible, `{raw: text}` for unparsable text and
/// `{_empty: true}` when there is no seed.
pub fn parse_seed(dummy_data: Option<&str>) -> Value {
  match dummy_data {
    None | Some("") => json!({ "_empty": true }),
    Some(text) => serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text })),
  }
}
