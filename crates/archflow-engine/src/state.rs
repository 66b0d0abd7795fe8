//! Caller-side simulation state.
//!
//! The runner owns nothing but its stop flag. Running/paused flags, the active
//! node and the step log live here, on the caller's side, and reach the runner
//! only through the [`SimulationObserver`] predicates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::events::{SimulationObserver, SimulationStep};

/// Shared pause/stop flags.
#[derive(Debug, Clone, Default)]
pub struct SimulationControl {
  paused: Arc<AtomicBool>,
  stopped: Arc<AtomicBool>,
}

impl SimulationControl {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pause(&self) {
    self.paused.store(true, Ordering::SeqCst);
  }

  pub fn resume(&self) {
    self.paused.store(false, Ordering::SeqCst);
  }

  pub fn stop(&self) {
    self.stopped.store(true, Ordering::SeqCst);
  }

  pub fn is_paused(&self) -> bool {
    self.paused.load(Ordering::SeqCst)
  }

  pub fn is_stopped(&self) -> bool {
    self.stopped.load(Ordering::SeqCst)
  }
}

/// UI-facing view of a simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
  pub is_running: bool,
  pub is_paused: bool,
  pub current_node_id: Option<String>,
  pub steps: Vec<SimulationStep>,
  /// Pacing delay in milliseconds.
  pub speed: u64,
}

impl SimulationState {
  /// State for a simulation that is about to start.
  pub fn new(speed: u64) -> Self {
    Self {
      is_running: true,
      speed,
      ..Self::default()
    }
  }

  /// Steps whose output is a failed API call.
  pub fn error_steps(&self) -> impl Iterator<Item = &SimulationStep> {
    self.steps.iter().filter(|s| s.is_error())
  }
}

/// Observer that records into a shared [`SimulationState`].
///
/// `is_stopped` reports `true` once the state is no longer running, so
/// [`StateObserver::stop`] halts the runner on its next check.
#[derive(Debug, Clone, Default)]
pub struct StateObserver {
  state: Arc<Mutex<SimulationState>>,
}

impl StateObserver {
  pub fn new(state: SimulationState) -> Self {
    Self {
      state: Arc::new(Mutex::new(state)),
    }
  }

  pub fn snapshot(&self) -> SimulationState {
    self.lock().clone()
  }

  pub fn pause(&self) {
    self.lock().is_paused = true;
  }

  pub fn resume(&self) {
    self.lock().is_paused = false;
  }

  pub fn stop(&self) {
    let mut state = self.lock();
    state.is_running = false;
    state.is_paused = false;
    state.current_node_id = None;
  }

  fn lock(&self) -> MutexGuard<'_, SimulationState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl SimulationObserver for StateObserver {
  fn on_node_enter(&self, node_id: &str) {
    self.lock().current_node_id = Some(node_id.to_string());
  }

  fn on_node_process(&self, step: &SimulationStep) {
    self.lock().steps.push(step.clone());
  }

  fn on_complete(&self) {
    let mut state = self.lock();
    state.is_running = false;
    state.is_paused = false;
    state.current_node_id = None;
  }

  fn is_paused(&self) -> bool {
    self.lock().is_paused
  }

  fn is_stopped(&self) -> bool {
    !self.lock().is_running
  }
}
