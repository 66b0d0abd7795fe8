//! Archflow Simulation Engine
//!
//! Propagates synthetic data through an architecture diagram, one node at a
//! time, and reports every step to an observer as it happens.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SimulationRunner                        │
//! │  - run() walks every start node depth-first                 │
//! │  - stop() / StopHandle cancel cooperatively                 │
//! │  - paces each node by `speed`, waits while paused           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   archflow_task::transform                  │
//! │  - passthrough / add-timestamp / filter / transform /       │
//! │    aggregate / api-call (live HTTP via ApiClient)           │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SimulationObserver                       │
//! │  - on_node_enter / on_node_process / on_complete            │
//! │  - is_paused / is_stopped polled by the runner              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use archflow_engine::{SimulationRunner, SimulationState, StateObserver};
//!
//! let observer = Arc::new(StateObserver::new(SimulationState::new(500)));
//! let runner = SimulationRunner::new(diagram.nodes, diagram.edges, 500, observer.clone());
//!
//! let outcome = runner.run().await?;
//! for step in observer.snapshot().steps {
//!     println!("{} -> {}", step.node_name, step.output_data);
//! }
//! ```

mod config;
mod error;
mod events;
mod runner;
mod state;

pub use config::SimulationConfig;
pub use error::SimulationError;
pub use events::{
  ChannelObserver, NoopObserver, SimulationEvent, SimulationObserver, SimulationStep,
};
pub use runner::{SimulationOutcome, SimulationRunner, StopHandle, parse_seed};
pub use state::{SimulationControl, SimulationState, StateObserver};
