use std::time::Duration;

/// Pacing settings for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
  /// Delay before each node is transformed.
  pub speed: Duration,
  /// How often pause and stop predicates are re-checked while waiting.
  pub poll_interval: Duration,
}

impl SimulationConfig {
  pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

  pub fn from_speed_ms(speed_ms: u64) -> Self {
    Self {
      speed: Duration::from_millis(speed_ms),
      ..Self::default()
    }
  }

  pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
    self.poll_interval = poll_interval;
    self
  }
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      speed: Duration::from_millis(500),
      poll_interval: Self::DEFAULT_POLL_INTERVAL,
    }
  }
}
