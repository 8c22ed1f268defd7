//! Notifications published by the runtime.

use parley_proto::{MessageId, RoomId};

/// Events broadcast to [`crate::ChatHandle::events`] subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Transport opened.
    Connected,

    /// Transport closed or failed to open.
    Disconnected {
        /// Why the transport closed.
        reason: String,
    },

    /// Optimistic message added to the timeline.
    MessagePending {
        /// Target room.
        room_id: RoomId,
        /// Temporary message ID.
        message_id: MessageId,
    },

    /// Sent message acknowledged by the server.
    MessageConfirmed {
        /// Temporary message ID.
        message_id: MessageId,
        /// Canonical message ID.
        confirmed_id: MessageId,
    },

    /// Sent message was not acknowledged.
    MessageFailed {
        /// Temporary message ID.
        message_id: MessageId,
        /// Failure reason.
        reason: String,
    },

    /// Room creation completed.
    RoomCreated {
        /// Ticket the runtime assigned to the request.
        ticket: u64,
        /// New room ID, or the failure reason.
        result: Result<RoomId, String>,
    },
}
