//! Client state machine.
//!
//! The `Client` is the top-level state machine that owns the connection
//! lifecycle, the room directory, the active room's timeline and the table of
//! requests awaiting acknowledgement.

use std::collections::HashSet;

use parley_core::{Connection, ConnectionAction, ConnectionState, env::Environment};
use parley_proto::{
    ChatMessage, ChatRoom, Envelope, MessageId, MessageState, Payload, RoomId, UserId,
    UserIdentity,
    payloads::room::{CreateRoomReply, CreateRoomRequest, RoomRef, SendMessageRequest},
};

use crate::{
    config::ClientConfig,
    directory::RoomDirectory,
    error::ClientError,
    event::{ClientAction, ClientEvent},
    requests::{PendingRequests, RequestKind},
    timeline::{ReceiveOutcome, Timeline},
};

/// Failure reason for requests outstanding when the transport closes.
const REASON_CONNECTION_CLOSED: &str = "connection closed";

/// Failure reason for requests outstanding at logout.
const REASON_DISCONNECTED: &str = "disconnected";

/// Failure reason for a send whose acknowledgement did not arrive in time.
const REASON_SEND_TIMEOUT: &str = "send timed out";

/// Failure reason for other requests that were not answered in time.
const REASON_REQUEST_TIMEOUT: &str = "request timed out";

/// Chat synchronization client.
///
/// All state is mutated through [`Client::handle`]; accessors expose
/// read-only views for rendering.
pub struct Client<E: Environment> {
    env: E,
    config: ClientConfig,

    /// Authenticated user. `None` before connect and after logout.
    identity: Option<UserIdentity>,

    connection: Connection<E::Instant>,
    directory: RoomDirectory,
    timeline: Timeline,
    active_room: Option<RoomId>,
    requests: PendingRequests<E::Instant>,

    /// Counter for temporary message IDs.
    next_local_id: u64,
}

impl<E: Environment> Client<E> {
    /// Create a disconnected client.
    pub fn new(env: E, config: ClientConfig) -> Self {
        let connection = Connection::new(config.connection());
        Self {
            env,
            config,
            identity: None,
            connection,
            directory: RoomDirectory::new(),
            timeline: Timeline::new(),
            active_room: None,
            requests: PendingRequests::new(),
            next_local_id: 0,
        }
    }

    /// Authenticated user, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// Connection phase.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Current connection epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.connection.epoch()
    }

    /// Room list.
    #[must_use]
    pub fn rooms(&self) -> &RoomDirectory {
        &self.directory
    }

    /// Timeline of the active room.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Selected room.
    #[must_use]
    pub fn active_room(&self) -> Option<&str> {
        self.active_room.as_deref()
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Process an event and return the actions to execute.
    ///
    /// # Errors
    ///
    /// Only caller-initiated events fail (connect, send, retry, create room).
    /// Inbound traffic that cannot be applied is logged and dropped.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Connect { identity } => self.handle_connect(identity),
            ClientEvent::TransportOpened => self.handle_transport_opened(),
            ClientEvent::TransportClosed { reason } => Ok(self.handle_transport_closed(&reason)),
            ClientEvent::Disconnect => Ok(self.handle_disconnect()),
            ClientEvent::EnvelopeReceived(envelope) => self.handle_envelope(&envelope),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
            ClientEvent::SetActiveRoom { room_id } => self.handle_set_active_room(room_id),
            ClientEvent::SendMessage { text } => self.handle_send_message(&text),
            ClientEvent::RetryMessage { message_id } => self.handle_retry_message(&message_id),
            ClientEvent::MarkRoomRead { room_id } => self.handle_mark_room_read(&room_id),
            ClientEvent::CreateRoom { ticket, participant_ids, name } => {
                self.handle_create_room(ticket, participant_ids, name)
            },
        }
    }

    fn handle_connect(&mut self, identity: UserIdentity) -> Result<Vec<ClientAction>, ClientError> {
        let actions = self.connection.connect(identity.id.clone(), self.env.now())?;
        self.identity = Some(identity);
        Ok(lift(actions))
    }

    /// Reload the directory and resynchronize the active room.
    fn handle_transport_opened(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let epoch = match self.connection.opened() {
            Ok(epoch) => epoch,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring transport open");
                return Ok(vec![]);
            },
        };

        let mut actions = Vec::new();

        self.directory.begin_loading();
        actions.push(self.request(
            Payload::FetchRooms,
            RequestKind::FetchRooms,
            self.config.request_timeout,
        )?);

        if let Some(room_id) = self.active_room.clone() {
            tracing::debug!(epoch, %room_id, "rejoining active room");
            actions.extend(self.enter_room(&room_id)?);
            actions.push(notify(Payload::MarkRead(RoomRef::new(room_id)))?);
        }

        Ok(actions)
    }

    fn handle_transport_closed(&mut self, reason: &str) -> Vec<ClientAction> {
        if self.connection.closed() {
            tracing::info!(reason, "transport closed");
        }
        self.fail_outstanding(REASON_CONNECTION_CLOSED)
    }

    /// Logout: end the session and forget everything tied to the user.
    fn handle_disconnect(&mut self) -> Vec<ClientAction> {
        let mut actions = lift(self.connection.disconnect());
        actions.extend(self.fail_outstanding(REASON_DISCONNECTED));

        self.identity = None;
        self.active_room = None;
        self.timeline.reset(None);
        self.directory.clear();

        actions
    }

    fn handle_envelope(&mut self, envelope: &Envelope) -> Result<Vec<ClientAction>, ClientError> {
        if envelope.is_ack() {
            return self.handle_ack(envelope);
        }

        let payload = match Payload::from_envelope(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(event = %envelope.event, error = %e, "dropping envelope");
                return Ok(vec![]);
            },
        };

        if !self.is_connected() {
            tracing::debug!(event = %envelope.event, "dropping push while disconnected");
            return Ok(vec![]);
        }

        match payload {
            Payload::NewMessage(message) => self.handle_new_message(message),
            Payload::RoomUpdated(room) | Payload::NewRoom(room) => {
                self.handle_room_update(room);
                Ok(vec![])
            },
            other => {
                tracing::warn!(event = %other.kind(), "dropping client event sent by server");
                Ok(vec![])
            },
        }
    }

    fn handle_ack(&mut self, envelope: &Envelope) -> Result<Vec<ClientAction>, ClientError> {
        let Some(ack) = envelope.ack else {
            tracing::warn!("dropping ack without number");
            return Ok(vec![]);
        };

        let Some(request) = self.requests.take(ack) else {
            tracing::warn!(ack, "dropping ack for unknown request");
            return Ok(vec![]);
        };

        if request.epoch != self.connection.epoch() {
            tracing::debug!(ack, epoch = request.epoch, "dropping ack from previous connection");
            return Ok(vec![]);
        }

        match request.kind {
            RequestKind::FetchRooms => {
                self.apply_room_list(envelope);
                Ok(vec![])
            },
            RequestKind::FetchMessages { room_id } => {
                self.apply_history(&room_id, envelope);
                Ok(vec![])
            },
            RequestKind::SendMessage { message_id, room_id } => {
                Ok(self.apply_send_ack(message_id, &room_id, envelope))
            },
            RequestKind::CreateRoom { ticket } => {
                let result = envelope
                    .ack_data::<CreateRoomReply>()
                    .map_err(|e| e.to_string())
                    .and_then(CreateRoomReply::into_result);

                match &result {
                    Ok(room_id) => tracing::info!(ticket, %room_id, "room created"),
                    Err(reason) => tracing::warn!(ticket, reason, "room creation rejected"),
                }

                Ok(vec![ClientAction::RoomCreated { ticket, result }])
            },
        }
    }

    fn apply_room_list(&mut self, envelope: &Envelope) {
        match envelope.ack_data::<Vec<ChatRoom>>() {
            Ok(rooms) => {
                tracing::debug!(count = rooms.len(), "room list loaded");
                self.directory.load(rooms, self.active_room.as_deref());
            },
            Err(e) => {
                tracing::warn!(error = %e, "malformed room list");
                self.directory.finish_loading();
            },
        }
    }

    fn apply_history(&mut self, room_id: &str, envelope: &Envelope) {
        if self.active_room.as_deref() != Some(room_id) {
            tracing::debug!(room_id, "dropping history for inactive room");
            return;
        }

        match envelope.ack_data::<Vec<ChatMessage>>() {
            Ok(mut messages) => {
                for message in &mut messages {
                    if message.room_id.is_empty() {
                        message.room_id = room_id.to_string();
                    }
                    settle_state(message);
                }
                tracing::debug!(room_id, count = messages.len(), "history loaded");
                self.timeline.load_history(messages);
            },
            Err(e) => {
                tracing::warn!(room_id, error = %e, "malformed history");
                self.timeline.finish_loading();
            },
        }
    }

    fn apply_send_ack(
        &mut self,
        message_id: MessageId,
        room_id: &str,
        envelope: &Envelope,
    ) -> Vec<ClientAction> {
        let mut confirmed = match envelope.ack_data::<ChatMessage>() {
            Ok(confirmed) => confirmed,
            Err(e) => {
                tracing::warn!(%message_id, error = %e, "malformed send acknowledgement");
                return self.fail_send(message_id, "malformed acknowledgement").into_iter().collect();
            },
        };

        if confirmed.room_id.is_empty() {
            confirmed.room_id = room_id.to_string();
        }
        confirmed.state = MessageState::Confirmed;

        if !self.timeline.confirm(&message_id, &confirmed) {
            tracing::debug!(%message_id, "confirmed message no longer in timeline");
        }
        if let Err(e) = self.directory.record_sent(&confirmed) {
            tracing::warn!(error = %e, "confirmed message for unknown room");
        }

        vec![ClientAction::MessageConfirmed { message_id, confirmed_id: confirmed.id }]
    }

    fn handle_new_message(
        &mut self,
        mut message: ChatMessage,
    ) -> Result<Vec<ClientAction>, ClientError> {
        settle_state(&mut message);
        let mut actions = Vec::new();
        let is_active = self.active_room.as_deref() == Some(message.room_id.as_str());

        if is_active {
            let own_id = self.identity.as_ref().map(|i| i.id.as_str());
            match self.timeline.receive(message.clone(), own_id) {
                ReceiveOutcome::Duplicate => {
                    tracing::trace!(message_id = %message.id, "duplicate message");
                },
                ReceiveOutcome::Adopted { temp_id } => {
                    tracing::debug!(%temp_id, message_id = %message.id, "echo adopted pending message");
                },
                ReceiveOutcome::Inserted => {
                    actions.push(notify(Payload::MarkRead(RoomRef::new(message.room_id.clone())))?);
                },
            }
        }

        let own = self.identity.as_ref().is_some_and(|i| i.id == message.sender.id);
        let applied = if own {
            self.directory.record_sent(&message)
        } else {
            self.directory.apply_incoming_message(&message, self.active_room.as_deref())
        };
        if let Err(e) = applied {
            tracing::warn!(message_id = %message.id, error = %e, "dropping message");
        }

        Ok(actions)
    }

    fn handle_room_update(&mut self, room: ChatRoom) {
        let room_id = room.id.clone();
        if self.directory.apply_room_update(room, self.active_room.as_deref()) {
            tracing::info!(%room_id, "room added");
        }
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let mut actions = lift(self.connection.tick(now));

        for request in self.requests.expire(now) {
            let reason = match request.kind {
                RequestKind::SendMessage { .. } => REASON_SEND_TIMEOUT,
                _ => REASON_REQUEST_TIMEOUT,
            };
            tracing::warn!(event = %request.kind.event(), reason, "request expired");
            actions.extend(self.fail_request(request.kind, reason));
        }

        actions
    }

    fn handle_set_active_room(
        &mut self,
        room_id: Option<RoomId>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if room_id == self.active_room {
            return Ok(vec![]);
        }

        let mut actions = Vec::new();
        let connected = self.is_connected();

        if let Some(previous) = self.active_room.take()
            && connected
        {
            actions.push(notify(Payload::LeaveRoom(RoomRef::new(previous)))?);
        }

        self.timeline.reset(room_id.clone());
        self.active_room.clone_from(&room_id);

        if let Some(room_id) = room_id {
            tracing::debug!(%room_id, "room activated");
            self.directory.mark_read(&room_id);
            if connected {
                actions.extend(self.enter_room(&room_id)?);
                actions.push(notify(Payload::MarkRead(RoomRef::new(room_id)))?);
            }
        }

        Ok(actions)
    }

    fn handle_send_message(&mut self, text: &str) -> Result<Vec<ClientAction>, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let room_id = self.active_room.clone().ok_or(ClientError::NoActiveRoom)?;
        let sender = match &self.identity {
            Some(identity) if self.is_connected() => identity.clone(),
            _ => return Err(ClientError::NotConnected),
        };

        let created_at = self.env.wall_clock();
        let message_id = format!("local-{}-{}", created_at.timestamp_millis(), self.next_local_id);
        self.next_local_id += 1;

        let send = self.send_request(&message_id, &room_id, text)?;

        self.timeline.push_local(ChatMessage {
            id: message_id.clone(),
            text: text.to_string(),
            created_at,
            sender,
            room_id: room_id.clone(),
            state: MessageState::Pending,
        });

        Ok(vec![send, ClientAction::MessagePending { room_id, message_id }])
    }

    fn handle_retry_message(
        &mut self,
        message_id: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let message = self
            .timeline
            .get(message_id)
            .ok_or_else(|| ClientError::UnknownMessage(message_id.to_string()))?;
        if message.state != MessageState::Failed {
            return Err(ClientError::NotRetryable(message_id.to_string()));
        }

        let room_id = message.room_id.clone();
        let text = message.text.clone();
        let send = self.send_request(message_id, &room_id, &text)?;
        self.timeline.set_pending(message_id);

        tracing::debug!(message_id, "retrying send");

        Ok(vec![send, ClientAction::MessagePending { room_id, message_id: message_id.to_string() }])
    }

    /// Zero the counter locally; the receipt is best effort.
    fn handle_mark_room_read(&mut self, room_id: &str) -> Result<Vec<ClientAction>, ClientError> {
        if !self.directory.mark_read(room_id) {
            tracing::debug!(room_id, "marking unknown room read");
        }

        if self.is_connected() {
            Ok(vec![notify(Payload::MarkRead(RoomRef::new(room_id)))?])
        } else {
            Ok(vec![])
        }
    }

    fn handle_create_room(
        &mut self,
        ticket: u64,
        participant_ids: Vec<UserId>,
        name: Option<String>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let own_id = match &self.identity {
            Some(identity) if self.is_connected() => identity.id.clone(),
            _ => return Err(ClientError::NotConnected),
        };

        let mut seen = HashSet::new();
        let mut participant_ids: Vec<UserId> =
            participant_ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
        if !seen.contains(&own_id) {
            participant_ids.push(own_id);
        }

        let request = CreateRoomRequest { participant_ids, name: name.unwrap_or_default() };
        tracing::debug!(ticket, participants = request.participant_ids.len(), "creating room");

        let send = self.request(
            Payload::CreateRoom(request),
            RequestKind::CreateRoom { ticket },
            self.config.request_timeout,
        )?;
        Ok(vec![send])
    }

    /// Join `room_id` and fetch its history.
    fn enter_room(&mut self, room_id: &str) -> Result<Vec<ClientAction>, ClientError> {
        let join = notify(Payload::JoinRoom(RoomRef::new(room_id)))?;

        self.timeline.begin_loading();
        let fetch = self.request(
            Payload::FetchMessages(RoomRef::new(room_id)),
            RequestKind::FetchMessages { room_id: room_id.to_string() },
            self.config.request_timeout,
        )?;

        Ok(vec![join, fetch])
    }

    fn send_request(
        &mut self,
        message_id: &str,
        room_id: &str,
        text: &str,
    ) -> Result<ClientAction, ClientError> {
        self.request(
            Payload::SendMessage(SendMessageRequest {
                text: text.to_string(),
                room_id: room_id.to_string(),
            }),
            RequestKind::SendMessage {
                message_id: message_id.to_string(),
                room_id: room_id.to_string(),
            },
            self.config.send_ack_timeout,
        )
    }

    /// Register an acknowledged request and build its envelope.
    fn request(
        &mut self,
        payload: Payload,
        kind: RequestKind,
        timeout: std::time::Duration,
    ) -> Result<ClientAction, ClientError> {
        let ack = self.requests.insert(kind, self.connection.epoch(), self.env.now(), timeout);
        match payload.into_envelope(Some(ack)) {
            Ok(envelope) => Ok(ClientAction::Send(envelope)),
            Err(e) => {
                self.requests.take(ack);
                Err(e.into())
            },
        }
    }

    fn fail_outstanding(&mut self, reason: &str) -> Vec<ClientAction> {
        let drained = self.requests.drain();
        drained.into_iter().filter_map(|request| self.fail_request(request.kind, reason)).collect()
    }

    fn fail_request(&mut self, kind: RequestKind, reason: &str) -> Option<ClientAction> {
        match kind {
            RequestKind::FetchRooms => {
                self.directory.finish_loading();
                None
            },
            RequestKind::FetchMessages { room_id } => {
                if self.active_room.as_deref() == Some(room_id.as_str()) {
                    self.timeline.finish_loading();
                }
                None
            },
            RequestKind::SendMessage { message_id, .. } => self.fail_send(message_id, reason),
            RequestKind::CreateRoom { ticket } => {
                Some(ClientAction::RoomCreated { ticket, result: Err(reason.to_string()) })
            },
        }
    }

    fn fail_send(&mut self, message_id: MessageId, reason: &str) -> Option<ClientAction> {
        if !self.timeline.mark_failed(&message_id) {
            return None;
        }
        tracing::warn!(%message_id, reason, "send failed");
        Some(ClientAction::MessageFailed { message_id, reason: reason.to_string() })
    }
}

/// Messages from the server are either system messages or confirmed.
/// Pending and failed only exist for local sends.
fn settle_state(message: &mut ChatMessage) {
    if message.state != MessageState::System {
        message.state = MessageState::Confirmed;
    }
}

/// Build an envelope for a request that expects no acknowledgement.
fn notify(payload: Payload) -> Result<ClientAction, ClientError> {
    Ok(ClientAction::Send(payload.into_envelope(None)?))
}

fn lift(actions: Vec<ConnectionAction>) -> Vec<ClientAction> {
    actions
        .into_iter()
        .map(|action| match action {
            ConnectionAction::Open { user_id } => ClientAction::Open { user_id },
            ConnectionAction::Close { reason } => ClientAction::Close { reason },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parley_core::env::test_utils::MockEnv;
    use parley_proto::EventKind;
    use serde_json::json;

    use super::*;

    fn connected_client() -> (MockEnv, Client<MockEnv>) {
        let env = MockEnv::new();
        let mut client = Client::new(env.clone(), ClientConfig::default());
        client
            .handle(ClientEvent::Connect { identity: UserIdentity::new("me", "Me") })
            .unwrap();
        client.handle(ClientEvent::TransportOpened).unwrap();
        (env, client)
    }

    fn sent(actions: &[ClientAction]) -> Vec<&Envelope> {
        actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::Send(envelope) => Some(envelope),
                _ => None,
            })
            .collect()
    }

    fn sent_kinds(actions: &[ClientAction]) -> Vec<EventKind> {
        sent(actions).iter().filter_map(|e| e.kind()).collect()
    }

    fn ack_of(actions: &[ClientAction], kind: EventKind) -> u64 {
        sent(actions).into_iter().find(|e| e.kind() == Some(kind)).and_then(|e| e.ack).unwrap()
    }

    #[test]
    fn connect_emits_open_with_user_id() {
        let env = MockEnv::new();
        let mut client = Client::new(env, ClientConfig::default());

        let actions =
            client.handle(ClientEvent::Connect { identity: UserIdentity::new("u1", "Al") }).unwrap();

        assert_eq!(actions, vec![ClientAction::Open { user_id: "u1".into() }]);
        assert_eq!(client.connection_state(), ConnectionState::Connecting);
    }

    #[test]
    fn open_fetches_room_list() {
        let env = MockEnv::new();
        let mut client = Client::new(env, ClientConfig::default());
        client.handle(ClientEvent::Connect { identity: UserIdentity::new("u1", "Al") }).unwrap();

        let actions = client.handle(ClientEvent::TransportOpened).unwrap();

        assert_eq!(sent_kinds(&actions), vec![EventKind::FetchRooms]);
        assert!(client.is_connected());
        assert!(client.rooms().is_loading());
    }

    #[test]
    fn send_requires_active_room_and_text() {
        let (_env, mut client) = connected_client();

        let err = client.handle(ClientEvent::SendMessage { text: "   ".into() }).unwrap_err();
        assert_eq!(err, ClientError::EmptyMessage);

        let err = client.handle(ClientEvent::SendMessage { text: "hi".into() }).unwrap_err();
        assert_eq!(err, ClientError::NoActiveRoom);
    }

    #[test]
    fn send_while_disconnected_fails() {
        let env = MockEnv::new();
        let mut client = Client::new(env, ClientConfig::default());
        client.handle(ClientEvent::SetActiveRoom { room_id: Some("r1".into()) }).unwrap();

        let err = client.handle(ClientEvent::SendMessage { text: "hi".into() }).unwrap_err();
        assert_eq!(err, ClientError::NotConnected);
    }

    #[test]
    fn temporary_ids_are_unique() {
        let (_env, mut client) = connected_client();
        client.handle(ClientEvent::SetActiveRoom { room_id: Some("r1".into()) }).unwrap();

        client.handle(ClientEvent::SendMessage { text: "a".into() }).unwrap();
        client.handle(ClientEvent::SendMessage { text: "b".into() }).unwrap();

        let ids: HashSet<_> = client.timeline().iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.iter().all(|id| id.starts_with("local-")));
    }

    #[test]
    fn send_ack_confirms_in_place() {
        let (_env, mut client) = connected_client();
        let actions =
            client.handle(ClientEvent::SetActiveRoom { room_id: Some("r1".into()) }).unwrap();
        let history_ack = ack_of(&actions, EventKind::FetchMessages);
        client
            .handle(ClientEvent::EnvelopeReceived(
                Envelope::ack(
                    history_ack,
                    &json!([{
                        "id": "m1",
                        "text": "earlier",
                        "createdAt": "2023-12-31T00:00:00Z",
                        "sender": { "id": "u2", "displayName": "Bob" },
                    }]),
                )
                .unwrap(),
            ))
            .unwrap();

        let actions = client.handle(ClientEvent::SendMessage { text: "hello".into() }).unwrap();
        let ack = ack_of(&actions, EventKind::SendMessage);
        let temp_id = client.timeline().newest().unwrap().id.clone();

        let reply = json!({
            "id": "m2",
            "text": "hello",
            "createdAt": "2024-01-01T00:00:01Z",
            "sender": { "id": "me", "displayName": "Me" },
            "roomId": "r1",
        });
        let actions = client
            .handle(ClientEvent::EnvelopeReceived(Envelope::ack(ack, &reply).unwrap()))
            .unwrap();

        assert_eq!(
            actions,
            vec![ClientAction::MessageConfirmed { message_id: temp_id, confirmed_id: "m2".into() }]
        );
        let ids: Vec<_> = client.timeline().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m2", "m1"]);
        assert_eq!(client.timeline().get("m2").unwrap().state, MessageState::Confirmed);
    }

    #[test]
    fn unknown_ack_is_dropped() {
        let (_env, mut client) = connected_client();

        let actions = client
            .handle(ClientEvent::EnvelopeReceived(Envelope::ack(999, &json!({})).unwrap()))
            .unwrap();

        assert!(actions.is_empty());
    }

    #[test]
    fn unknown_event_is_dropped() {
        let (_env, mut client) = connected_client();
        let envelope = Envelope::decode(r#"{"event":"typing","data":{}}"#).unwrap();

        let actions = client.handle(ClientEvent::EnvelopeReceived(envelope)).unwrap();

        assert!(actions.is_empty());
    }

    #[test]
    fn send_times_out_and_retry_resends() {
        let (env, mut client) = connected_client();
        client.handle(ClientEvent::SetActiveRoom { room_id: Some("r1".into()) }).unwrap();
        client.handle(ClientEvent::SendMessage { text: "hello".into() }).unwrap();
        let temp_id = client.timeline().newest().unwrap().id.clone();

        env.advance(Duration::from_secs(10));
        let actions = client.handle(ClientEvent::Tick { now: env.now() }).unwrap();

        assert!(actions.contains(&ClientAction::MessageFailed {
            message_id: temp_id.clone(),
            reason: "send timed out".into(),
        }));
        assert_eq!(client.timeline().get(&temp_id).unwrap().state, MessageState::Failed);

        let actions =
            client.handle(ClientEvent::RetryMessage { message_id: temp_id.clone() }).unwrap();
        assert_eq!(sent_kinds(&actions), vec![EventKind::SendMessage]);
        assert_eq!(client.timeline().get(&temp_id).unwrap().state, MessageState::Pending);

        let err = client.handle(ClientEvent::RetryMessage { message_id: temp_id }).unwrap_err();
        assert!(matches!(err, ClientError::NotRetryable(_)));
    }

    #[test]
    fn transport_close_fails_outstanding_requests() {
        let (_env, mut client) = connected_client();
        client.handle(ClientEvent::SetActiveRoom { room_id: Some("r1".into()) }).unwrap();
        client.handle(ClientEvent::SendMessage { text: "hello".into() }).unwrap();
        client
            .handle(ClientEvent::CreateRoom { ticket: 4, participant_ids: vec![], name: None })
            .unwrap();

        let actions =
            client.handle(ClientEvent::TransportClosed { reason: "reset".into() }).unwrap();

        assert!(!client.is_connected());
        assert!(actions.iter().any(|a| matches!(a, ClientAction::MessageFailed { .. })));
        assert!(actions.contains(&ClientAction::RoomCreated {
            ticket: 4,
            result: Err("connection closed".into()),
        }));
        assert!(!client.timeline().is_loading());
        assert!(!client.rooms().is_loading());
    }

    #[test]
    fn create_room_adds_own_id_once() {
        let (_env, mut client) = connected_client();

        let actions = client
            .handle(ClientEvent::CreateRoom {
                ticket: 1,
                participant_ids: vec!["u2".into(), "me".into(), "u2".into()],
                name: Some("Bob".into()),
            })
            .unwrap();

        let envelope = sent(&actions)[0];
        assert_eq!(envelope.data, json!({ "participantIds": ["u2", "me"], "name": "Bob" }));

        let actions = client
            .handle(ClientEvent::CreateRoom { ticket: 2, participant_ids: vec!["u2".into()], name: None })
            .unwrap();
        assert_eq!(sent(&actions)[0].data, json!({ "participantIds": ["u2", "me"], "name": "" }));
    }

    #[test]
    fn create_room_reports_server_error() {
        let (_env, mut client) = connected_client();
        let actions = client
            .handle(ClientEvent::CreateRoom { ticket: 7, participant_ids: vec![], name: None })
            .unwrap();
        let ack = ack_of(&actions, EventKind::CreateRoom);

        let reply = Envelope::ack(ack, &CreateRoomReply::failed("name taken")).unwrap();
        let actions = client.handle(ClientEvent::EnvelopeReceived(reply)).unwrap();

        assert_eq!(
            actions,
            vec![ClientAction::RoomCreated { ticket: 7, result: Err("name taken".into()) }]
        );
        assert_eq!(client.rooms().len(), 0);
    }

    #[test]
    fn create_room_offline_is_rejected() {
        let env = MockEnv::new();
        let mut client = Client::new(env, ClientConfig::default());

        let err = client
            .handle(ClientEvent::CreateRoom { ticket: 1, participant_ids: vec![], name: None })
            .unwrap_err();

        assert_eq!(err, ClientError::NotConnected);
    }

    #[test]
    fn ack_from_previous_connection_is_dropped() {
        let (_env, mut client) = connected_client();
        let actions = client
            .handle(ClientEvent::CreateRoom { ticket: 1, participant_ids: vec![], name: None })
            .unwrap();
        let ack = ack_of(&actions, EventKind::CreateRoom);

        client.handle(ClientEvent::TransportClosed { reason: "reset".into() }).unwrap();
        client.handle(ClientEvent::TransportOpened).unwrap();

        let reply = Envelope::ack(ack, &CreateRoomReply::created("r9")).unwrap();
        let actions = client.handle(ClientEvent::EnvelopeReceived(reply)).unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn reopen_rejoins_active_room() {
        let (_env, mut client) = connected_client();
        client.handle(ClientEvent::SetActiveRoom { room_id: Some("r1".into()) }).unwrap();
        client.handle(ClientEvent::TransportClosed { reason: "reset".into() }).unwrap();

        let actions = client.handle(ClientEvent::TransportOpened).unwrap();

        assert_eq!(
            sent_kinds(&actions),
            vec![
                EventKind::FetchRooms,
                EventKind::JoinRoom,
                EventKind::FetchMessages,
                EventKind::MarkRead
            ]
        );
        assert_eq!(client.epoch(), 2);
    }

    #[test]
    fn disconnect_clears_user_state() {
        let (_env, mut client) = connected_client();
        client.handle(ClientEvent::SetActiveRoom { room_id: Some("r1".into()) }).unwrap();

        let actions = client.handle(ClientEvent::Disconnect).unwrap();

        assert!(matches!(actions[0], ClientAction::Close { .. }));
        assert!(client.identity().is_none());
        assert!(client.active_room().is_none());
        assert!(client.timeline().is_empty());
        assert!(client.rooms().is_empty());

        assert!(client.handle(ClientEvent::Disconnect).unwrap().is_empty());
    }

    #[test]
    fn switching_rooms_leaves_previous() {
        let (_env, mut client) = connected_client();
        client.handle(ClientEvent::SetActiveRoom { room_id: Some("a".into()) }).unwrap();

        let actions =
            client.handle(ClientEvent::SetActiveRoom { room_id: Some("b".into()) }).unwrap();

        assert_eq!(
            sent_kinds(&actions),
            vec![
                EventKind::LeaveRoom,
                EventKind::JoinRoom,
                EventKind::FetchMessages,
                EventKind::MarkRead
            ]
        );
        assert!(client.handle(ClientEvent::SetActiveRoom { room_id: Some("b".into()) }).unwrap().is_empty());
    }

    #[test]
    fn connect_timeout_closes_transport() {
        let env = MockEnv::new();
        let mut client = Client::new(env.clone(), ClientConfig::default());
        client.handle(ClientEvent::Connect { identity: UserIdentity::new("u1", "Al") }).unwrap();

        env.advance(Duration::from_secs(11));
        let actions = client.handle(ClientEvent::Tick { now: env.now() }).unwrap();

        assert!(matches!(actions[0], ClientAction::Close { .. }));
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    }
}
