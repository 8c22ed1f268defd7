//! Protocol event names.
//!
//! Each event name maps to exactly one [`EventKind`]. Client requests and
//! server pushes share one namespace; acknowledgements use the reserved `ack`
//! name.

use std::fmt;

/// Every event name the protocol understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Client -> server
    /// Subscribe to a room's pushes.
    JoinRoom,
    /// Unsubscribe from a room's pushes.
    LeaveRoom,
    /// Request the full room list (acknowledged).
    FetchRooms,
    /// Request a room's message history (acknowledged).
    FetchMessages,
    /// Send a message to a room (acknowledged).
    SendMessage,
    /// Read-receipt for a room.
    MarkRead,
    /// Create a room (acknowledged).
    CreateRoom,

    // Server -> client
    /// Response to an acknowledged request.
    Ack,
    /// A message was posted to a room the user participates in.
    NewMessage,
    /// A room's metadata changed.
    RoomUpdated,
    /// The user was added to a new room.
    NewRoom,
}

impl EventKind {
    /// All event kinds, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::JoinRoom,
        Self::LeaveRoom,
        Self::FetchRooms,
        Self::FetchMessages,
        Self::SendMessage,
        Self::MarkRead,
        Self::CreateRoom,
        Self::Ack,
        Self::NewMessage,
        Self::RoomUpdated,
        Self::NewRoom,
    ];

    /// Wire name of this event.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JoinRoom => "join-room",
            Self::LeaveRoom => "leave-room",
            Self::FetchRooms => "fetch-rooms",
            Self::FetchMessages => "fetch-messages",
            Self::SendMessage => "send-message",
            Self::MarkRead => "mark-read",
            Self::CreateRoom => "create-room",
            Self::Ack => "ack",
            Self::NewMessage => "new-message",
            Self::RoomUpdated => "room-updated",
            Self::NewRoom => "new-room",
        }
    }

    /// Parse a wire name. `None` for names outside the protocol.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether the server answers this request with an `ack` envelope.
    #[must_use]
    pub const fn expects_ack(self) -> bool {
        matches!(self, Self::FetchRooms | Self::FetchMessages | Self::SendMessage | Self::CreateRoom)
    }

    /// Whether this event is pushed by the server.
    #[must_use]
    pub const fn is_server_event(self) -> bool {
        matches!(self, Self::Ack | Self::NewMessage | Self::RoomUpdated | Self::NewRoom)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_are_unique_and_parse_back() {
        let names: HashSet<_> = EventKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), EventKind::ALL.len());

        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(EventKind::from_name("typing"), None);
        assert_eq!(EventKind::from_name("JOIN-ROOM"), None);
    }

    #[test]
    fn only_requests_expect_ack() {
        for kind in EventKind::ALL {
            if kind.expects_ack() {
                assert!(!kind.is_server_event(), "{kind} is both request and push");
            }
        }
        assert!(!EventKind::MarkRead.expects_ack());
        assert!(!EventKind::JoinRoom.expects_ack());
    }
}
