//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state so every check in
//! a pass sees the same data.

use parley_app::ChatSnapshot;
use parley_proto::{ChatMessage, ChatRoom, RoomId};

/// Snapshot of the entire system state.
///
/// Contains observable state from one or more clients for invariant checking.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients }
    }

    /// Add a client snapshot.
    pub fn add_client(&mut self, client: ClientSnapshot) {
        self.clients.push(client);
    }
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone, Default)]
pub struct ClientSnapshot {
    /// Client label used in violation messages.
    pub id: String,
    /// Currently selected room.
    pub active_room: Option<RoomId>,
    /// Room directory in display order.
    pub rooms: Vec<ChatRoom>,
    /// Timeline of the active room, newest first.
    pub messages: Vec<ChatMessage>,
}

impl ClientSnapshot {
    /// Create an empty client snapshot.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    /// Extract the observable parts of a runtime snapshot.
    pub fn from_chat(id: impl Into<String>, chat: &ChatSnapshot) -> Self {
        Self {
            id: id.into(),
            active_room: chat.active_room.clone(),
            rooms: chat.rooms.clone(),
            messages: chat.messages.clone(),
        }
    }

    /// Set active room.
    #[must_use]
    pub fn with_active_room(mut self, room_id: Option<&str>) -> Self {
        self.active_room = room_id.map(str::to_string);
        self
    }

    /// Add a room to the directory.
    #[must_use]
    pub fn with_room(mut self, room: ChatRoom) -> Self {
        self.rooms.push(room);
        self
    }

    /// Add a message to the timeline (appended at the oldest end).
    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_chat_copies_observable_state() {
        let chat = ChatSnapshot {
            active_room: Some("r1".into()),
            rooms: vec![ChatRoom::new("r1", "general")],
            ..ChatSnapshot::default()
        };

        let client = ClientSnapshot::from_chat("alice", &chat);

        assert_eq!(client.id, "alice");
        assert_eq!(client.active_room.as_deref(), Some("r1"));
        assert_eq!(client.rooms.len(), 1);
        assert!(client.messages.is_empty());
    }

    #[test]
    fn system_snapshot_collects_clients() {
        let mut system = SystemSnapshot::single(ClientSnapshot::new("alice"));
        system.add_client(ClientSnapshot::new("bob"));

        assert_eq!(system.clients.len(), 2);
    }
}
