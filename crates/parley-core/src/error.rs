//! Error types for the connection lifecycle.

use std::time::Duration;

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors that can occur during connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Operation requires an open connection
    #[error("not connected")]
    NotConnected,

    /// Transport did not open within the configured timeout
    #[error("connect timeout after {elapsed:?}")]
    ConnectTimeout {
        /// How long we waited
        elapsed: Duration,
    },

    /// Underlying transport error
    #[error("transport error: {0}")]
    Transport(String),
}

impl ConnectionError {
    /// Returns true if this error is transient and a manual retry may succeed.
    ///
    /// State machine misuse is never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. } | Self::Transport(_) | Self::NotConnected)
    }
}
