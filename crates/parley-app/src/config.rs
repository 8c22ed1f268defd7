//! Runtime configuration.

use std::time::Duration;

use parley_client::ClientConfig;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Interval between timeout checks
    pub tick_interval: Duration,
    /// Capacity of the command channel between handles and the runtime
    pub command_capacity: usize,
    /// Capacity of the notification channel
    pub event_capacity: usize,
    /// Client state machine configuration
    pub client: ClientConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            command_capacity: 64,
            event_capacity: 256,
            client: ClientConfig::default(),
        }
    }
}
