//! Connection lifecycle state machine.
//!
//! Tracks the socket session that carries the chat protocol. Uses the action
//! pattern: methods take time as input and return actions for the driver to
//! execute. The state machine never touches the transport itself.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect  ┌────────────┐  opened   ┌───────────┐
//! │ Disconnected │─────────>│ Connecting │──────────>│ Connected │
//! └──────────────┘          └────────────┘           └───────────┘
//!        ^   ^                    │ timeout                │ closed
//!        │   └────────────────────┘                        │
//!        └─────────────────────────────────────────────────┘
//! ```
//!
//! A session (the authenticated user ID) outlives individual transport
//! connections: after `closed` the transport may reopen on its own, and
//! `opened` from `Disconnected` is accepted while the session is alive. Only
//! [`Connection::disconnect`] ends the session.
//!
//! Every successful `opened` starts a new connection epoch. Responses are
//! tagged with the epoch they were requested in, so results from a previous
//! connection can be recognised and dropped.

use std::{ops::Sub, time::Duration};

use parley_proto::UserId;

use crate::error::ConnectionError;

/// Time allowed for the transport to open after `connect`.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a transport session carrying `user_id` as connection metadata.
    Open {
        /// Authenticated user
        user_id: UserId,
    },

    /// Close the transport session.
    Close {
        /// Reason for closing
        reason: String,
    },
}

/// Connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport session.
    Disconnected,
    /// Transport requested, waiting for it to open.
    Connecting,
    /// Transport open; requests may be sent.
    Connected,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for the transport to open
    pub connect_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { connect_timeout: DEFAULT_CONNECT_TIMEOUT }
    }
}

/// Connection state machine.
///
/// Generic over `Instant` to support both real time and virtual time.
#[derive(Debug, Clone)]
pub struct Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: ConnectionState,
    config: ConnectionConfig,
    /// Authenticated user of the current session. `None` after logout.
    user_id: Option<UserId>,
    /// Incremented on every successful open. Zero before the first open.
    epoch: u64,
    /// When the pending connect was requested.
    connecting_since: Option<I>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a connection in [`ConnectionState::Disconnected`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            user_id: None,
            epoch: 0,
            connecting_since: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether requests may be sent.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Current connection epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// User of the live session. `None` if logged out.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Start a session for `user_id`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if a session is already connecting or
    ///   connected
    pub fn connect(
        &mut self,
        user_id: UserId,
        now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "connect" });
        }

        tracing::debug!(%user_id, "connecting");

        self.state = ConnectionState::Connecting;
        self.connecting_since = Some(now);
        self.user_id = Some(user_id.clone());

        Ok(vec![ConnectionAction::Open { user_id }])
    }

    /// Transport reported "open". Returns the new epoch.
    ///
    /// Accepted while connecting, and while disconnected with a live session
    /// (transport-level reconnection).
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if already connected or logged out
    pub fn opened(&mut self) -> Result<u64, ConnectionError> {
        match (self.state, &self.user_id) {
            (ConnectionState::Connecting, _) | (ConnectionState::Disconnected, Some(_)) => {
                self.state = ConnectionState::Connected;
                self.connecting_since = None;
                self.epoch += 1;
                tracing::info!(epoch = self.epoch, "connected");
                Ok(self.epoch)
            },
            (state, _) => Err(ConnectionError::InvalidState { state, operation: "open" }),
        }
    }

    /// Transport reported "close" or an error. Never an error itself.
    ///
    /// Returns `true` if the connection was open.
    pub fn closed(&mut self) -> bool {
        let was_connected = self.is_connected();
        if self.state != ConnectionState::Disconnected {
            tracing::info!(epoch = self.epoch, "disconnected");
        }
        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;
        was_connected
    }

    /// End the session (logout or teardown). Idempotent.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        let had_session = self.user_id.take().is_some();
        let had_transport = self.state != ConnectionState::Disconnected;

        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;

        if had_session || had_transport {
            vec![ConnectionAction::Close { reason: "disconnect requested".to_string() }]
        } else {
            vec![]
        }
    }

    /// Elapsed time since `connect`, if the connect timeout is exceeded.
    #[must_use]
    pub fn check_timeout(&self, now: I) -> Option<Duration> {
        let since = self.connecting_since?;
        let elapsed = now - since;
        (elapsed > self.config.connect_timeout).then_some(elapsed)
    }

    /// Periodic maintenance: fails a connect that did not open in time.
    ///
    /// The session survives a timeout so a manual retry can reuse it.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        let Some(elapsed) = self.check_timeout(now) else {
            return vec![];
        };

        tracing::warn!(?elapsed, "connect timed out");
        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;

        vec![ConnectionAction::Close {
            reason: ConnectionError::ConnectTimeout { elapsed }.to_string(),
        }]
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn connection() -> Connection<Instant> {
        Connection::new(ConnectionConfig::default())
    }

    #[test]
    fn connection_lifecycle() {
        let t0 = Instant::now();
        let mut conn = connection();

        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.epoch(), 0);

        let actions = conn.connect("u1".to_string(), t0).unwrap();
        assert_eq!(actions, vec![ConnectionAction::Open { user_id: "u1".to_string() }]);
        assert_eq!(conn.state(), ConnectionState::Connecting);

        assert_eq!(conn.opened(), Ok(1));
        assert!(conn.is_connected());

        assert!(conn.closed());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.user_id(), Some("u1"));
    }

    #[test]
    fn connect_twice_is_rejected() {
        let t0 = Instant::now();
        let mut conn = connection();
        conn.connect("u1".to_string(), t0).unwrap();

        assert!(matches!(
            conn.connect("u1".to_string(), t0),
            Err(ConnectionError::InvalidState { state: ConnectionState::Connecting, .. })
        ));
    }

    #[test]
    fn transport_reconnect_starts_new_epoch() {
        let t0 = Instant::now();
        let mut conn = connection();
        conn.connect("u1".to_string(), t0).unwrap();
        conn.opened().unwrap();
        conn.closed();

        assert_eq!(conn.opened(), Ok(2));
    }

    #[test]
    fn open_without_session_is_rejected() {
        let mut conn = connection();
        assert!(conn.opened().is_err());

        conn.connect("u1".to_string(), Instant::now()).unwrap();
        conn.opened().unwrap();
        assert!(conn.opened().is_err());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut conn = connection();
        assert!(conn.disconnect().is_empty());

        conn.connect("u1".to_string(), Instant::now()).unwrap();
        conn.opened().unwrap();

        assert_eq!(conn.disconnect().len(), 1);
        assert!(conn.disconnect().is_empty());
        assert_eq!(conn.user_id(), None);

        // Logged out: a late transport open must not resurrect the session
        assert!(conn.opened().is_err());
    }

    #[test]
    fn closed_is_silent_when_already_down() {
        let mut conn = connection();
        assert!(!conn.closed());
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn connect_timeout_closes() {
        let t0 = Instant::now();
        let mut conn = connection();
        conn.connect("u1".to_string(), t0).unwrap();

        assert!(conn.tick(t0 + Duration::from_secs(5)).is_empty());

        let actions = conn.tick(t0 + DEFAULT_CONNECT_TIMEOUT + Duration::from_secs(1));
        assert!(matches!(actions.as_slice(), [ConnectionAction::Close { .. }]));
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        // Session is kept for a manual retry
        assert_eq!(conn.user_id(), Some("u1"));
    }
}
