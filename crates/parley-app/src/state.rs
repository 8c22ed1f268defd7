//! Observable chat state.
//!
//! [`ChatSnapshot`] is the view model handed to renderers. It is captured
//! from the client after every change and published through a `watch`
//! channel, so readers never touch the state owned by the runtime.

use parley_client::{ChatMessage, ChatRoom, Client, Environment, UserIdentity};
use parley_core::ConnectionState;
use parley_proto::RoomId;

/// Read-only view of the chat state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    /// Connection phase.
    pub connection: ConnectionState,
    /// Authenticated user.
    pub user: Option<UserIdentity>,
    /// Rooms in directory order.
    pub rooms: Vec<ChatRoom>,
    /// Whether the room list is being fetched.
    pub rooms_loading: bool,
    /// Selected room.
    pub active_room: Option<RoomId>,
    /// Messages of the active room, newest first.
    pub messages: Vec<ChatMessage>,
    /// Whether the active room's history is being fetched.
    pub messages_loading: bool,
}

impl Default for ChatSnapshot {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            user: None,
            rooms: Vec::new(),
            rooms_loading: false,
            active_room: None,
            messages: Vec::new(),
            messages_loading: false,
        }
    }
}

impl ChatSnapshot {
    /// Capture the current state of `client`.
    pub fn capture<E: Environment>(client: &Client<E>) -> Self {
        Self {
            connection: client.connection_state(),
            user: client.identity().cloned(),
            rooms: client.rooms().iter().cloned().collect(),
            rooms_loading: client.rooms().is_loading(),
            active_room: client.active_room().map(str::to_string),
            messages: client.timeline().iter().cloned().collect(),
            messages_loading: client.timeline().is_loading(),
        }
    }

    /// Whether the transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Room by ID.
    #[must_use]
    pub fn room(&self, room_id: &str) -> Option<&ChatRoom> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    /// Sum of unread counters.
    #[must_use]
    pub fn total_unread(&self) -> u64 {
        self.rooms.iter().map(|r| u64::from(r.unread_count)).sum()
    }
}
