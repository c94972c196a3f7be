//! Monitor configuration
//!
//! Defines all configurable parameters for a job lifecycle monitor:
//! the hard timeout, the polling backoff policy, and the liveness
//! reporting cadence.

use std::time::Duration;

/// Polling and timeout policy for one monitored run
///
/// All intervals are configurable to allow tuning for different backends
/// (fast dev instances vs. production queues with long waits).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Hard deadline for the whole polling loop
    pub timeout: Duration,

    /// First sleep between status polls
    pub initial_poll_interval: Duration,

    /// Ceiling the growing poll interval never exceeds
    pub max_poll_interval: Duration,

    /// Multiplier applied to the poll interval after every tick
    pub backoff_factor: f64,

    /// Emit a liveness event every N non-terminal ticks
    pub liveness_every: u32,
}

impl MonitorConfig {
    /// Creates configuration from environment variables, falling back to
    /// defaults for anything unset
    ///
    /// Recognized environment variables:
    /// - JOBGAUGE_JOB_TIMEOUT (seconds, default: 3600)
    /// - JOBGAUGE_POLL_INTERVAL (seconds, default: 5)
    /// - JOBGAUGE_MAX_POLL_INTERVAL (seconds, default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout = std::env::var("JOBGAUGE_JOB_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let initial_poll_interval = std::env::var("JOBGAUGE_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.initial_poll_interval);

        let max_poll_interval = std::env::var("JOBGAUGE_MAX_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.max_poll_interval);

        Self {
            timeout,
            initial_poll_interval,
            max_poll_interval,
            ..defaults
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout.is_zero() {
            anyhow::bail!("timeout must be greater than 0");
        }

        if self.initial_poll_interval.is_zero() {
            anyhow::bail!("initial_poll_interval must be greater than 0");
        }

        if self.max_poll_interval < self.initial_poll_interval {
            anyhow::bail!("max_poll_interval must be at least initial_poll_interval");
        }

        if self.backoff_factor < 1.0 {
            anyhow::bail!("backoff_factor must be at least 1.0");
        }

        if self.liveness_every == 0 {
            anyhow::bail!("liveness_every must be greater than 0");
        }

        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
            initial_poll_interval: Duration::from_secs(5),
            max_poll_interval: Duration::from_secs(30),
            backoff_factor: 1.5,
            liveness_every: 12,
        }
    }
}
