//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the WebSocket driver but talks
//! to a [`MockServer`](crate::MockServer) in memory. It implements [`Driver`]
//! so the same [`parley_app::Runtime`] orchestration code runs in both
//! production and simulation.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::sync::Arc;

use parley_app::{ChatHandle, Driver, Runtime, RuntimeConfig};
use parley_core::env::{
    Environment,
    test_utils::{MockEnv, VirtualInstant},
};
use parley_proto::Envelope;
use tokio::sync::Notify;

use crate::sim_server::{SessionId, SharedServer, lock};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Outcome of polling a session outbox.
enum Poll {
    Ready(Envelope),
    Empty,
    Closed,
}

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    server: SharedServer,
    env: MockEnv,
    notify: Arc<Notify>,
    session: Option<SessionId>,
}

impl SimDriver {
    /// Create a driver bound to `server`.
    pub fn new(server: SharedServer, env: MockEnv) -> Self {
        let notify = lock(&server).notifier();
        Self { server, env, notify, session: None }
    }

    /// Server-side session currently in use.
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    fn poll(&self) -> Poll {
        let Some(session) = self.session else {
            return Poll::Closed;
        };
        let mut server = lock(&self.server);
        match server.next_envelope(session) {
            Some(envelope) => Poll::Ready(envelope),
            None if server.is_open(session) => Poll::Empty,
            None => Poll::Closed,
        }
    }

    fn open(&mut self, user_id: &str) -> Result<(), SimDriverError> {
        let session = lock(&self.server).open_session(user_id).map_err(SimDriverError)?;
        self.session = Some(session);
        Ok(())
    }

    fn deliver(&self, envelope: &Envelope) -> Result<(), SimDriverError> {
        let session = self.session.ok_or_else(|| SimDriverError("not connected".into()))?;
        lock(&self.server).receive(session, envelope).map_err(SimDriverError)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = VirtualInstant;

    async fn connect(&mut self, user_id: &str) -> Result<(), Self::Error> {
        self.stop();
        self.open(user_id)
    }

    async fn send_envelope(&mut self, envelope: Envelope) -> Result<(), Self::Error> {
        self.deliver(&envelope)
    }

    async fn recv_envelope(&mut self) -> Option<Envelope> {
        let notify = Arc::clone(&self.notify);
        loop {
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.poll() {
                Poll::Ready(envelope) => return Some(envelope),
                Poll::Closed => {
                    self.session = None;
                    return None;
                },
                Poll::Empty => notified.await,
            }
        }
    }

    /// Like a socket, a server-side close is only noticed by the next read.
    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            lock(&self.server).close_session(session);
        }
    }
}

/// Build a runtime for one simulated user against `server`.
pub fn sim_runtime(server: SharedServer, env: MockEnv) -> (Runtime<SimDriver, MockEnv>, ChatHandle) {
    let driver = SimDriver::new(server, env.clone());
    Runtime::new(driver, env, RuntimeConfig::default())
}

#[cfg(test)]
mod tests {
    use parley_proto::{EventKind, Payload, UserIdentity};

    use super::*;
    use crate::create_shared_server;

    fn server_with_room() -> (SharedServer, MockEnv) {
        let env = MockEnv::new();
        let server = create_shared_server(env.clone());
        {
            let mut s = lock(&server);
            s.register_user(UserIdentity::new("alice", "Alice"));
            s.add_room("general", &["alice", "bob"]);
        }
        (server, env)
    }

    #[tokio::test]
    async fn connect_opens_server_session() {
        let (server, env) = server_with_room();
        let mut driver = SimDriver::new(server.clone(), env);

        driver.connect("alice").await.unwrap();

        assert!(driver.is_connected());
        assert_eq!(lock(&server).session_count(), 1);
    }

    #[tokio::test]
    async fn offline_server_refuses_connect() {
        let (server, env) = server_with_room();
        lock(&server).set_online(false);
        let mut driver = SimDriver::new(server, env);

        assert!(driver.connect("alice").await.is_err());
        assert!(!driver.is_connected());
    }

    #[tokio::test]
    async fn request_is_acknowledged() {
        let (server, env) = server_with_room();
        let mut driver = SimDriver::new(server, env);
        driver.connect("alice").await.unwrap();

        driver.send_envelope(Payload::FetchRooms.into_envelope(Some(1)).unwrap()).await.unwrap();

        let reply = driver.recv_envelope().await.unwrap();
        assert_eq!(reply.kind(), Some(EventKind::Ack));
        assert_eq!(reply.ack, Some(1));
    }

    #[tokio::test]
    async fn killed_session_yields_none() {
        let (server, env) = server_with_room();
        let mut driver = SimDriver::new(server.clone(), env);
        driver.connect("alice").await.unwrap();

        lock(&server).kill_sessions_of("alice");

        assert!(driver.recv_envelope().await.is_none());
        assert!(!driver.is_connected());
    }

    #[tokio::test]
    async fn stop_closes_session() {
        let (server, env) = server_with_room();
        let mut driver = SimDriver::new(server.clone(), env);
        driver.connect("alice").await.unwrap();

        driver.stop();

        assert!(!driver.is_connected());
        assert_eq!(lock(&server).session_count(), 0);
    }
}
