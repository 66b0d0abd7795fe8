//! Simulation errors.

/// Errors returned by [`SimulationRunner::run`](crate::SimulationRunner::run).
///
/// Node-level failures never show up here; they travel through the graph as
/// `_error` tagged outputs.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
  /// The runner has already been run. Create a new runner per simulation.
  #[error("simulation runner has already been run")]
  AlreadyRun,
}
