//! Store configuration.

use std::time::Duration;

/// Tuning for the reconciliation layer.
///
/// Derived views are recomputed on a poll, never pushed; both knobs here
/// are operational tuning and deliberately not hard-coded anywhere else.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// How long a cached derived view stays fresh, and the cadence of
    /// the background refresh loop.
    pub poll_interval: Duration,

    /// Advisory estimate of one full replication round between peers.
    /// Views from replicas that diverged less than this long ago may
    /// still disagree; that is the expected steady state, not an error.
    pub propagation_delay: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            // Matches the reference client's 4000 ms view poll
            poll_interval: Duration::from_secs(4),
            propagation_delay: Duration::from_secs(90),
        }
    }
}

impl StoreConfig {
    /// Create a config optimized for tests: near-instant refresh.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            propagation_delay: Duration::from_millis(50),
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the advisory propagation delay.
    #[must_use]
    pub fn with_propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }
}
