//! Client configuration.

use std::time::Duration;

use parley_core::{ConnectionConfig, connection::DEFAULT_CONNECT_TIMEOUT};

/// Time a sent message may stay unacknowledged before it is marked failed.
pub const DEFAULT_SEND_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Time other acknowledged requests (room list, history, room creation) may
/// stay unanswered.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for a `send-message` acknowledgement
    pub send_ack_timeout: Duration,
    /// Timeout for `fetch-rooms`, `fetch-messages` and `create-room`
    pub request_timeout: Duration,
    /// Timeout for the transport to open
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            send_ack_timeout: DEFAULT_SEND_ACK_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub(crate) fn connection(&self) -> ConnectionConfig {
        ConnectionConfig { connect_timeout: self.connect_timeout }
    }
}
