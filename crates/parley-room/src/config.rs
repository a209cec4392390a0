//! Lifecycle configuration.

use std::time::Duration;

/// Tunable settings for room lifecycle coordination.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Delay between detach attempts in the release settle loop. Fixed
    /// interval — not exponential, not jittered.
    pub release_retry_interval: Duration,

    /// Capacity of the room status change broadcast. Slow subscribers
    /// past this many buffered events observe a lag and fall back to the
    /// live status.
    pub status_event_capacity: usize,

    /// Capacity of the discontinuity event broadcast.
    pub discontinuity_event_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            release_retry_interval: Duration::from_millis(250),
            status_event_capacity: 32,
            discontinuity_event_capacity: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_config_default() {
        let config = LifecycleConfig::default();
        assert_eq!(config.release_retry_interval, Duration::from_millis(250));
        assert_eq!(config.status_event_capacity, 32);
        assert_eq!(config.discontinuity_event_capacity, 32);
    }
}
