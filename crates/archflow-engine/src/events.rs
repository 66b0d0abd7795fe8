//! Simulation events and observers.
//!
//! The runner reports progress through a [`SimulationObserver`]. Observers
//! decide what to do with it: highlight the active node, append to a console
//! log, stream to a UI, or ignore it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::state::SimulationControl;

/// One node visit: what went in, what came out, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStep {
  pub node_id: String,
  pub node_name: String,
  pub input_data: serde_json::Value,
  pub output_data: serde_json::Value,
  /// Epoch milliseconds.
  pub timestamp: i64,
}

impl SimulationStep {
  /// Whether this step's output is a failed API call.
  pub fn is_error(&self) -> bool {
    archflow_task::is_error_output(&self.output_data)
  }
}

/// Events emitted during a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
  /// A node became the active node.
  NodeEntered { node_id: String },

  /// A node produced its output.
  NodeProcessed(SimulationStep),

  /// Every start node was fully processed without a stop.
  Completed,
}

/// Receives simulation progress and answers pause/stop queries.
///
/// `is_paused` and `is_stopped` are polled by the runner while it waits, so
/// callers can flip them from anywhere without calling into the runner.
pub trait SimulationObserver: Send + Sync {
  fn on_node_enter(&self, node_id: &str);

  fn on_node_process(&self, step: &SimulationStep);

  fn on_complete(&self);

  fn is_paused(&self) -> bool {
    false
  }

  fn is_stopped(&self) -> bool {
    false
  }
}

/// An observer that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopObserver;

impl SimulationObserver for NoopObserver {
  fn on_node_enter(&self, _node_id: &str) {}

  fn on_node_process(&self, _step: &SimulationStep) {}

  fn on_complete(&self) {}
}

/// An observer that forwards events to an unbounded channel.
///
/// Attach a [`SimulationControl`] to let whoever holds the receiving end
/// pause, resume or stop the run.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
  sender: mpsc::UnboundedSender<SimulationEvent>,
  control: Option<SimulationControl>,
}

impl ChannelObserver {
  pub fn new(sender: mpsc::UnboundedSender<SimulationEvent>) -> Self {
    Self {
      sender,
      control: None,
    }
  }

  pub fn with_control(mut self, control: SimulationControl) -> Self {
    self.control = Some(control);
    self
  }

  fn send(&self, event: SimulationEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

impl SimulationObserver for ChannelObserver {
  fn on_node_enter(&self, node_id: &str) {
    self.send(SimulationEvent::NodeEntered {
      node_id: node_id.to_string(),
    });
  }

  fn on_node_process(&self, step: &SimulationStep) {
    self.send(SimulationEvent::NodeProcessed(step.clone()));
  }

  fn on_complete(&self) {
    self.send(SimulationEvent::Completed);
  }

  fn is_paused(&self) -> bool {
    self.control.as_ref().is_some_and(|c| c.is_paused())
  }

  fn is_stopped(&self) -> bool {
    self.control.as_ref().is_some_and(|c| c.is_stopped())
  }
}
