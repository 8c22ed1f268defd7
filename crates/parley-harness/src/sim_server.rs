//! In-memory twin of the chat socket server.
//!
//! `MockServer` answers the client protocol the way the production server
//! does: acknowledged requests get an `ack` envelope with the same number,
//! messages and new rooms are pushed to every open session of the
//! participants, and unread counters are kept per user.
//!
//! Tests drive it explicitly. Each session has an outbox that a
//! [`crate::SimDriver`] drains; a shared [`Notify`] wakes drivers waiting for
//! traffic.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use parley_core::env::{Environment, test_utils::MockEnv};
use parley_proto::{
    ChatMessage, ChatRoom, Envelope, EventKind, LastMessage, MessageState, Payload, RoomId,
    UserId, UserIdentity,
    payloads::room::{CreateRoomReply, CreateRoomRequest, RoomRef, SendMessageRequest},
};
use tokio::sync::Notify;

/// Server-side connection identifier.
pub type SessionId = u64;

/// Server shared between drivers and the test.
pub type SharedServer = Arc<Mutex<MockServer>>;

/// Create a server wrapped for sharing.
pub fn create_shared_server(env: MockEnv) -> SharedServer {
    Arc::new(Mutex::new(MockServer::new(env)))
}

/// Lock a shared server, ignoring poisoning from a panicked test thread.
pub(crate) fn lock(server: &SharedServer) -> std::sync::MutexGuard<'_, MockServer> {
    server.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ServerRoom {
    room: ChatRoom,
    messages: Vec<ChatMessage>,
    unread: HashMap<UserId, u32>,
}

struct Session {
    user_id: UserId,
    open: bool,
    joined: HashSet<RoomId>,
    outbox: VecDeque<Envelope>,
}

/// In-memory chat server.
pub struct MockServer {
    env: MockEnv,
    users: HashMap<UserId, UserIdentity>,
    /// Creation order.
    rooms: Vec<ServerRoom>,
    sessions: HashMap<SessionId, Session>,
    next_session: SessionId,
    next_message: u64,
    next_room: u64,
    online: bool,
    /// Request kinds that are swallowed without effect or acknowledgement.
    silenced: HashSet<EventKind>,
    /// Forced answer for every `create-room`.
    create_error: Option<String>,
    notify: Arc<Notify>,
}

impl MockServer {
    /// Create an empty, reachable server.
    pub fn new(env: MockEnv) -> Self {
        Self {
            env,
            users: HashMap::new(),
            rooms: Vec::new(),
            sessions: HashMap::new(),
            next_session: 1,
            next_message: 1,
            next_room: 1,
            online: true,
            silenced: HashSet::new(),
            create_error: None,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Notifier signalled whenever an outbox receives an envelope or a
    /// session closes.
    pub fn notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }

    /// Register a user so their display name can be attached to messages.
    pub fn register_user(&mut self, identity: UserIdentity) {
        self.users.insert(identity.id.clone(), identity);
    }

    /// Create a room directly, without notifying anyone.
    pub fn add_room(&mut self, name: &str, participants: &[&str]) -> RoomId {
        let room_id = self.allocate_room_id();
        let mut room = ChatRoom::new(room_id.clone(), name);
        room.participant_ids = participants.iter().map(|p| (*p).to_string()).collect();
        self.rooms.push(ServerRoom { room, messages: Vec::new(), unread: HashMap::new() });
        room_id
    }

    /// Make the server reachable or unreachable for new sessions.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Swallow every request of `kind` from now on.
    pub fn silence(&mut self, kind: EventKind) {
        self.silenced.insert(kind);
    }

    /// Stop swallowing requests of `kind`.
    pub fn unsilence(&mut self, kind: EventKind) {
        self.silenced.remove(&kind);
    }

    /// Answer every `create-room` with `error` (or normally with `None`).
    pub fn reject_room_creation(&mut self, error: Option<String>) {
        self.create_error = error;
    }

    /// Open a session for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a reason if the server is unreachable.
    pub fn open_session(&mut self, user_id: &str) -> Result<SessionId, String> {
        if !self.online {
            return Err("server unreachable".to_string());
        }

        let session_id = self.next_session;
        self.next_session += 1;
        self.sessions.insert(
            session_id,
            Session {
                user_id: user_id.to_string(),
                open: true,
                joined: HashSet::new(),
                outbox: VecDeque::new(),
            },
        );
        tracing::debug!(session_id, user_id, "session opened");
        Ok(session_id)
    }

    /// Client closed the session.
    pub fn close_session(&mut self, session_id: SessionId) {
        if self.sessions.remove(&session_id).is_some() {
            tracing::debug!(session_id, "session closed by client");
        }
    }

    /// Server drops the session; the client observes a close.
    pub fn kill_session(&mut self, session_id: SessionId) {
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.open = false;
            session.outbox.clear();
            self.notify.notify_waiters();
        }
    }

    /// Drop every open session of `user_id`.
    pub fn kill_sessions_of(&mut self, user_id: &str) {
        let ids: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.user_id == user_id && s.open)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.kill_session(id);
        }
    }

    /// Whether the session exists and is open.
    pub fn is_open(&self, session_id: SessionId) -> bool {
        self.sessions.get(&session_id).is_some_and(|s| s.open)
    }

    /// Open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.values().filter(|s| s.open).count()
    }

    /// Rooms the session has joined.
    pub fn joined_rooms(&self, session_id: SessionId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .sessions
            .get(&session_id)
            .map(|s| s.joined.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// Next envelope queued for the session.
    pub fn next_envelope(&mut self, session_id: SessionId) -> Option<Envelope> {
        self.sessions.get_mut(&session_id).and_then(|s| s.outbox.pop_front())
    }

    /// Room metadata as stored on the server.
    pub fn room(&self, room_id: &str) -> Option<&ChatRoom> {
        self.find_room(room_id).map(|r| &r.room)
    }

    /// Number of rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Stored messages of a room, oldest first.
    pub fn messages(&self, room_id: &str) -> &[ChatMessage] {
        self.find_room(room_id).map(|r| r.messages.as_slice()).unwrap_or_default()
    }

    /// Server-side unread counter of `user_id` in `room_id`.
    pub fn unread(&self, user_id: &str, room_id: &str) -> u32 {
        self.find_room(room_id).and_then(|r| r.unread.get(user_id).copied()).unwrap_or(0)
    }

    /// Post a message as `user_id`, as if sent from another device.
    ///
    /// Returns `None` if the room does not exist.
    pub fn post_as(&mut self, user_id: &str, room_id: &str, text: &str) -> Option<ChatMessage> {
        let message = self.store_message(user_id, room_id, text)?;
        self.push_message(&message, None);
        Some(message)
    }

    /// Rename a room and push `room-updated` to its participants.
    pub fn rename_room(&mut self, room_id: &str, name: &str) {
        let Some(index) = self.room_index(room_id) else {
            return;
        };
        self.rooms[index].room.name = name.to_string();
        let participants = self.rooms[index].room.participant_ids.clone();
        for user_id in participants {
            let room = self.room_view(index, &user_id);
            self.push_to_user(&user_id, None, Payload::RoomUpdated(room));
        }
    }

    /// Process an envelope sent by a session.
    ///
    /// # Errors
    ///
    /// Returns a reason if the session is not open.
    pub fn receive(&mut self, session_id: SessionId, envelope: &Envelope) -> Result<(), String> {
        let user_id = match self.sessions.get(&session_id) {
            Some(session) if session.open => session.user_id.clone(),
            _ => return Err("session closed".to_string()),
        };

        let payload = match Payload::from_envelope(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(session_id, error = %e, "server dropping envelope");
                return Ok(());
            },
        };

        if self.silenced.contains(&payload.kind()) {
            tracing::debug!(session_id, event = %payload.kind(), "request swallowed");
            return Ok(());
        }

        match payload {
            Payload::JoinRoom(RoomRef { room_id }) => {
                if let Some(session) = self.sessions.get_mut(&session_id) {
                    session.joined.insert(room_id);
                }
            },
            Payload::LeaveRoom(RoomRef { room_id }) => {
                if let Some(session) = self.sessions.get_mut(&session_id) {
                    session.joined.remove(&room_id);
                }
            },
            Payload::FetchRooms => {
                let rooms: Vec<ChatRoom> = (0..self.rooms.len())
                    .filter(|&i| self.rooms[i].room.participant_ids.contains(&user_id))
                    .map(|i| self.room_view(i, &user_id))
                    .collect();
                self.reply(session_id, envelope.ack, |ack| Envelope::ack(ack, &rooms));
            },
            Payload::FetchMessages(RoomRef { room_id }) => {
                let messages = match self.find_room(&room_id) {
                    Some(room) if room.room.participant_ids.contains(&user_id) => {
                        room.messages.clone()
                    },
                    _ => Vec::new(),
                };
                self.reply(session_id, envelope.ack, |ack| Envelope::ack(ack, &messages));
            },
            Payload::SendMessage(SendMessageRequest { text, room_id }) => {
                let is_participant = self
                    .find_room(&room_id)
                    .is_some_and(|r| r.room.participant_ids.contains(&user_id));
                if !is_participant {
                    tracing::warn!(session_id, %room_id, "send to foreign room dropped");
                    return Ok(());
                }
                if let Some(message) = self.store_message(&user_id, &room_id, &text) {
                    self.reply(session_id, envelope.ack, |ack| Envelope::ack(ack, &message));
                    self.push_message(&message, Some(session_id));
                }
            },
            Payload::MarkRead(RoomRef { room_id }) => {
                if let Some(index) = self.room_index(&room_id) {
                    self.rooms[index].unread.insert(user_id, 0);
                }
            },
            Payload::CreateRoom(request) => {
                let reply = self.create_room(&user_id, request);
                self.reply(session_id, envelope.ack, |ack| Envelope::ack(ack, &reply));
            },
            Payload::NewMessage(_) | Payload::RoomUpdated(_) | Payload::NewRoom(_) => {
                tracing::warn!(session_id, "server event sent by client");
            },
        }

        Ok(())
    }

    fn create_room(&mut self, user_id: &str, request: CreateRoomRequest) -> CreateRoomReply {
        if let Some(error) = &self.create_error {
            return CreateRoomReply::failed(error.clone());
        }

        let mut participants: Vec<UserId> = Vec::new();
        for id in request.participant_ids {
            if !participants.contains(&id) {
                participants.push(id);
            }
        }
        if !participants.iter().any(|p| p == user_id) || participants.len() < 2 {
            return CreateRoomReply::failed("a room needs at least two participants");
        }

        let room_id = self.allocate_room_id();
        let mut room = ChatRoom::new(room_id.clone(), request.name);
        room.participant_ids.clone_from(&participants);
        self.rooms.push(ServerRoom { room, messages: Vec::new(), unread: HashMap::new() });

        let index = self.rooms.len() - 1;
        for participant in participants {
            let view = self.room_view(index, &participant);
            self.push_to_user(&participant, None, Payload::NewRoom(view));
        }

        CreateRoomReply::created(room_id)
    }

    fn store_message(&mut self, user_id: &str, room_id: &str, text: &str) -> Option<ChatMessage> {
        let index = self.room_index(room_id)?;

        let sequence = self.next_message;
        self.next_message += 1;

        let sender = self
            .users
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserIdentity::new(user_id, user_id));
        let message = ChatMessage {
            id: format!("m{sequence}"),
            text: text.to_string(),
            created_at: self.env.wall_clock() + Duration::from_millis(sequence),
            sender,
            room_id: room_id.to_string(),
            state: MessageState::Confirmed,
        };

        let room = &mut self.rooms[index];
        room.room.last_message = Some(LastMessage::from(&message));
        for participant in &room.room.participant_ids {
            if participant != user_id {
                *room.unread.entry(participant.clone()).or_default() += 1;
            }
        }
        room.messages.push(message.clone());

        Some(message)
    }

    fn push_message(&mut self, message: &ChatMessage, except: Option<SessionId>) {
        let participants = self
            .find_room(&message.room_id)
            .map(|r| r.room.participant_ids.clone())
            .unwrap_or_default();
        for user_id in participants {
            self.push_to_user(&user_id, except, Payload::NewMessage(message.clone()));
        }
    }

    fn push_to_user(&mut self, user_id: &str, except: Option<SessionId>, payload: Payload) {
        let envelope = match payload.into_envelope(None) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode push");
                return;
            },
        };

        for (id, session) in &mut self.sessions {
            if session.open && session.user_id == user_id && Some(*id) != except {
                session.outbox.push_back(envelope.clone());
            }
        }
        self.notify.notify_waiters();
    }

    fn reply(
        &mut self,
        session_id: SessionId,
        ack: Option<u64>,
        encode: impl FnOnce(u64) -> parley_proto::Result<Envelope>,
    ) {
        let Some(ack) = ack else {
            return;
        };
        match encode(ack) {
            Ok(envelope) => {
                if let Some(session) = self.sessions.get_mut(&session_id) {
                    session.outbox.push_back(envelope);
                    self.notify.notify_waiters();
                }
            },
            Err(e) => tracing::warn!(error = %e, "failed to encode ack"),
        }
    }

    /// Room as seen by `user_id` (with their unread counter).
    fn room_view(&self, index: usize, user_id: &str) -> ChatRoom {
        let stored = &self.rooms[index];
        ChatRoom {
            unread_count: stored.unread.get(user_id).copied().unwrap_or(0),
            ..stored.room.clone()
        }
    }

    fn allocate_room_id(&mut self) -> RoomId {
        let id = format!("r{}", self.next_room);
        self.next_room += 1;
        id
    }

    fn room_index(&self, room_id: &str) -> Option<usize> {
        self.rooms.iter().position(|r| r.room.id == room_id)
    }

    fn find_room(&self, room_id: &str) -> Option<&ServerRoom> {
        self.rooms.iter().find(|r| r.room.id == room_id)
    }
}
