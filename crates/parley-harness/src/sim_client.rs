//! Synchronous wiring of a sans-IO [`Client`] to a [`MockServer`].
//!
//! No runtime and no channels: actions are applied to the server as soon as
//! the client emits them, and [`SimClient::pump`] feeds queued server traffic
//! back until both sides are quiet. Every envelope crossing the wire is
//! appended to a transcript so tests can assert on the exact exchange.

use std::collections::VecDeque;

use parley_app::ChatSnapshot;
use parley_client::{Client, ClientAction, ClientConfig, ClientError, ClientEvent};
use parley_core::env::{Environment, test_utils::MockEnv};
use parley_proto::{Envelope, UserIdentity};

use crate::{
    invariants::ClientSnapshot,
    sim_server::{MockServer, SessionId},
};

/// Upper bound on envelopes handled by one [`SimClient::pump`] call.
const MAX_PUMP_STEPS: usize = 10_000;

/// Direction of a recorded envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to server.
    Sent,
    /// Server to client.
    Received,
}

/// One envelope that crossed the simulated socket.
#[derive(Debug, Clone)]
pub struct WireRecord {
    /// Which way it travelled.
    pub direction: Direction,
    /// The envelope itself.
    pub envelope: Envelope,
}

impl std::fmt::Display for WireRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arrow = match self.direction {
            Direction::Sent => "->",
            Direction::Received => "<-",
        };
        write!(f, "{arrow} {}", self.envelope.event)?;
        if let Some(ack) = self.envelope.ack {
            write!(f, " #{ack}")?;
        }
        Ok(())
    }
}

/// Client driven in lockstep with a [`MockServer`].
pub struct SimClient {
    identity: UserIdentity,
    env: MockEnv,
    client: Client<MockEnv>,
    session: Option<SessionId>,
    transcript: Vec<WireRecord>,
    /// Non-transport actions emitted so far.
    emitted: Vec<ClientAction>,
}

impl SimClient {
    /// Create a disconnected client for `identity`.
    pub fn new(identity: UserIdentity, env: MockEnv) -> Self {
        let client = Client::new(env.clone(), ClientConfig::default());
        Self {
            identity,
            env,
            client,
            session: None,
            transcript: Vec::new(),
            emitted: Vec::new(),
        }
    }

    /// The wrapped client.
    pub fn client(&self) -> &Client<MockEnv> {
        &self.client
    }

    /// User ID of this client.
    pub fn user_id(&self) -> &str {
        &self.identity.id
    }

    /// Observable state as the runtime would publish it.
    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot::capture(&self.client)
    }

    /// Observable state for invariant checks.
    pub fn invariant_snapshot(&self) -> ClientSnapshot {
        ClientSnapshot::from_chat(self.identity.id.clone(), &self.snapshot())
    }

    /// Drain the recorded wire traffic.
    pub fn take_transcript(&mut self) -> Vec<WireRecord> {
        std::mem::take(&mut self.transcript)
    }

    /// Drain actions that were not transport actions.
    pub fn take_emitted(&mut self) -> Vec<ClientAction> {
        std::mem::take(&mut self.emitted)
    }

    /// Feed one event to the client and apply the resulting actions.
    ///
    /// # Errors
    ///
    /// Returns the client's error if it rejects the event.
    pub fn handle(
        &mut self,
        server: &mut MockServer,
        event: ClientEvent<<MockEnv as Environment>::Instant>,
    ) -> Result<(), ClientError> {
        let actions = self.client.handle(event)?;
        self.apply(server, actions);
        Ok(())
    }

    /// Connect and synchronize.
    ///
    /// # Errors
    ///
    /// Returns the client's error if a session is already active.
    pub fn connect(&mut self, server: &mut MockServer) -> Result<(), ClientError> {
        let identity = self.identity.clone();
        self.handle(server, ClientEvent::Connect { identity })?;
        self.pump(server);
        Ok(())
    }

    /// Deliver a clock tick at the environment's current time.
    pub fn tick(&mut self, server: &mut MockServer) {
        let now = self.env.now();
        let _ = self.handle(server, ClientEvent::Tick { now });
    }

    /// Exchange queued traffic until neither side has anything to deliver.
    pub fn pump(&mut self, server: &mut MockServer) {
        for _ in 0..MAX_PUMP_STEPS {
            let Some(session) = self.session else {
                return;
            };

            if !server.is_open(session) {
                self.session = None;
                let _ = self.handle(server, ClientEvent::TransportClosed {
                    reason: "connection closed".into(),
                });
                return;
            }

            let Some(envelope) = server.next_envelope(session) else {
                return;
            };
            self.transcript
                .push(WireRecord { direction: Direction::Received, envelope: envelope.clone() });
            let _ = self.handle(server, ClientEvent::EnvelopeReceived(envelope));
        }
        tracing::warn!(user_id = %self.identity.id, "pump did not settle");
    }

    fn apply(&mut self, server: &mut MockServer, actions: Vec<ClientAction>) {
        let mut queue: VecDeque<ClientAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            match action {
                ClientAction::Open { user_id } => match server.open_session(&user_id) {
                    Ok(session) => {
                        self.session = Some(session);
                        if let Ok(more) = self.client.handle(ClientEvent::TransportOpened) {
                            queue.extend(more);
                        }
                    },
                    Err(reason) => {
                        if let Ok(more) =
                            self.client.handle(ClientEvent::TransportClosed { reason })
                        {
                            queue.extend(more);
                        }
                    },
                },
                ClientAction::Close { .. } => {
                    if let Some(session) = self.session.take() {
                        server.close_session(session);
                    }
                },
                ClientAction::Send(envelope) => {
                    let Some(session) = self.session else {
                        continue;
                    };
                    self.transcript
                        .push(WireRecord { direction: Direction::Sent, envelope: envelope.clone() });
                    if let Err(reason) = server.receive(session, &envelope) {
                        tracing::debug!(reason, "server refused envelope");
                    }
                },
                other => self.emitted.push(other),
            }
        }
    }
}
