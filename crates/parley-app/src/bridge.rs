//! Protocol-to-Application translation layer.
//!
//! The [`Bridge`] wraps the Sans-IO [`parley_client::Client`] and adapts it to
//! the runtime.
//!
//! # Responsibilities
//!
//! - Feeds client events and interprets the resulting actions.
//! - Accumulates outgoing [`parley_proto::Envelope`]s to be sent by the driver
//!   in the next I/O cycle.
//! - Collects transport intents (open, close) for the runtime to execute.
//! - Converts client notifications into [`crate::AppEvent`]s.

use parley_client::{Client, ClientAction, ClientConfig, ClientError, ClientEvent, Environment};
use parley_proto::{Envelope, UserId};

use crate::AppEvent;

/// Transport operation requested by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportIntent {
    /// Open a session for `user_id`.
    Open {
        /// Authenticated user.
        user_id: UserId,
    },
    /// Close the session.
    Close {
        /// Reason for closing.
        reason: String,
    },
}

/// Bridge between the runtime and the client state machine.
///
/// Generic over Environment to support both production and simulation.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    outgoing: Vec<Envelope>,
    transport: Vec<TransportIntent>,
}

impl<E: Environment> Bridge<E> {
    /// Create a bridge around a fresh client.
    pub fn new(env: E, config: ClientConfig) -> Self {
        Self { client: Client::new(env, config), outgoing: Vec::new(), transport: Vec::new() }
    }

    /// The wrapped client.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Feed a caller-initiated event.
    ///
    /// # Errors
    ///
    /// Returns the client's rejection unchanged.
    pub fn handle(&mut self, event: ClientEvent<E::Instant>) -> Result<Vec<AppEvent>, ClientError> {
        let actions = self.client.handle(event)?;
        Ok(self.process_client_actions(actions))
    }

    /// Handle an envelope from the server.
    pub fn handle_envelope(&mut self, envelope: Envelope) -> Vec<AppEvent> {
        self.handle_infallible(ClientEvent::EnvelopeReceived(envelope))
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: E::Instant) -> Vec<AppEvent> {
        self.handle_infallible(ClientEvent::Tick { now })
    }

    /// The transport opened.
    pub fn transport_opened(&mut self) -> Vec<AppEvent> {
        let mut events = self.handle_infallible(ClientEvent::TransportOpened);
        if self.client.is_connected() {
            events.insert(0, AppEvent::Connected);
        }
        events
    }

    /// The transport closed or could not be opened.
    pub fn transport_closed(&mut self, reason: &str) -> Vec<AppEvent> {
        let mut events =
            self.handle_infallible(ClientEvent::TransportClosed { reason: reason.to_string() });
        events.insert(0, AppEvent::Disconnected { reason: reason.to_string() });
        events
    }

    /// Take pending outgoing envelopes.
    pub fn take_outgoing(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outgoing)
    }

    /// Take pending transport intents.
    pub fn take_transport(&mut self) -> Vec<TransportIntent> {
        std::mem::take(&mut self.transport)
    }

    fn handle_infallible(&mut self, event: ClientEvent<E::Instant>) -> Vec<AppEvent> {
        match self.client.handle(event) {
            Ok(actions) => self.process_client_actions(actions),
            Err(e) => {
                tracing::warn!(error = %e, "client rejected event");
                vec![]
            },
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ClientAction::Send(envelope) => self.outgoing.push(envelope),
                ClientAction::Open { user_id } => {
                    self.transport.push(TransportIntent::Open { user_id });
                },
                ClientAction::Close { reason } => {
                    self.transport.push(TransportIntent::Close { reason });
                },
                ClientAction::MessagePending { room_id, message_id } => {
                    events.push(AppEvent::MessagePending { room_id, message_id });
                },
                ClientAction::MessageConfirmed { message_id, confirmed_id } => {
                    events.push(AppEvent::MessageConfirmed { message_id, confirmed_id });
                },
                ClientAction::MessageFailed { message_id, reason } => {
                    events.push(AppEvent::MessageFailed { message_id, reason });
                },
                ClientAction::RoomCreated { ticket, result } => {
                    events.push(AppEvent::RoomCreated { ticket, result });
                },
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use parley_client::UserIdentity;
    use parley_core::env::test_utils::MockEnv;
    use parley_proto::EventKind;

    use super::*;

    fn connected_bridge() -> Bridge<MockEnv> {
        let mut bridge = Bridge::new(MockEnv::new(), ClientConfig::default());
        bridge.handle(ClientEvent::Connect { identity: UserIdentity::new("me", "Me") }).unwrap();
        bridge.take_transport();
        bridge.transport_opened();
        bridge
    }

    #[test]
    fn connect_requests_transport_open() {
        let mut bridge = Bridge::new(MockEnv::new(), ClientConfig::default());

        let events =
            bridge.handle(ClientEvent::Connect { identity: UserIdentity::new("me", "Me") }).unwrap();

        assert!(events.is_empty());
        assert_eq!(bridge.take_transport(), vec![TransportIntent::Open { user_id: "me".into() }]);
    }

    #[test]
    fn open_reports_connected_and_queues_room_fetch() {
        let mut bridge = Bridge::new(MockEnv::new(), ClientConfig::default());
        bridge.handle(ClientEvent::Connect { identity: UserIdentity::new("me", "Me") }).unwrap();

        let events = bridge.transport_opened();

        assert_eq!(events, vec![AppEvent::Connected]);
        let outgoing = bridge.take_outgoing();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].kind(), Some(EventKind::FetchRooms));
        assert!(bridge.take_outgoing().is_empty());
    }

    #[test]
    fn send_message_produces_pending_event_and_envelope() {
        let mut bridge = connected_bridge();
        bridge.take_outgoing();
        bridge.handle(ClientEvent::SetActiveRoom { room_id: Some("r1".into()) }).unwrap();
        bridge.take_outgoing();

        let events = bridge.handle(ClientEvent::SendMessage { text: "hello".into() }).unwrap();

        assert!(matches!(&events[..], [AppEvent::MessagePending { room_id, .. }] if room_id == "r1"));
        assert_eq!(bridge.take_outgoing()[0].kind(), Some(EventKind::SendMessage));
    }

    #[test]
    fn send_without_room_is_rejected() {
        let mut bridge = connected_bridge();

        let err = bridge.handle(ClientEvent::SendMessage { text: "hello".into() }).unwrap_err();

        assert_eq!(err, ClientError::NoActiveRoom);
    }

    #[test]
    fn close_fails_pending_room_creation() {
        let mut bridge = connected_bridge();
        bridge
            .handle(ClientEvent::CreateRoom { ticket: 3, participant_ids: vec![], name: None })
            .unwrap();

        let events = bridge.transport_closed("reset");

        assert_eq!(events[0], AppEvent::Disconnected { reason: "reset".into() });
        assert!(events.contains(&AppEvent::RoomCreated {
            ticket: 3,
            result: Err("connection closed".into()),
        }));
    }

    #[test]
    fn disconnect_requests_transport_close() {
        let mut bridge = connected_bridge();

        bridge.handle(ClientEvent::Disconnect).unwrap();

        assert!(matches!(bridge.take_transport()[..], [TransportIntent::Close { .. }]));
        assert!(bridge.client().identity().is_none());
    }
}
