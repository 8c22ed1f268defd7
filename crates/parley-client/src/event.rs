//! Client events and actions.

use parley_proto::{Envelope, MessageId, RoomId, UserId, UserIdentity};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Reporting transport lifecycle (opened, closed)
/// - Receiving envelopes from the network
/// - Driving time forward via ticks
/// - Forwarding user intents (select room, send, create room)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (virtual) time.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// User authenticated; open a session.
    Connect {
        /// Identity supplied by the authentication store.
        identity: UserIdentity,
    },

    /// Transport reported "open".
    TransportOpened,

    /// Transport reported "close" or failed.
    TransportClosed {
        /// Transport-provided reason.
        reason: String,
    },

    /// User logged out or the owning scope is torn down.
    Disconnect,

    /// Envelope received from the server.
    EnvelopeReceived(Envelope),

    /// Time tick for timeout processing.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// User selected a room, or closed the open one (`None`).
    SetActiveRoom {
        /// Room to activate.
        room_id: Option<RoomId>,
    },

    /// User sends a message to the active room.
    SendMessage {
        /// Message body.
        text: String,
    },

    /// User retries a failed message.
    RetryMessage {
        /// Temporary ID of the failed message.
        message_id: MessageId,
    },

    /// Mark a room as read.
    MarkRoomRead {
        /// Room to mark.
        room_id: RoomId,
    },

    /// Create a room with the given participants.
    ///
    /// The caller's own ID is added automatically.
    CreateRoom {
        /// Caller-chosen number echoed in [`ClientAction::RoomCreated`].
        ticket: u64,
        /// Other participants.
        participant_ids: Vec<UserId>,
        /// Room name.
        name: Option<String>,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Open a transport session carrying `user_id` as metadata.
    Open {
        /// Authenticated user.
        user_id: UserId,
    },

    /// Close the transport session.
    Close {
        /// Reason for closing.
        reason: String,
    },

    /// Send an envelope to the server.
    Send(Envelope),

    /// An optimistic message was added to the timeline.
    MessagePending {
        /// Room the message was sent to.
        room_id: RoomId,
        /// Temporary message ID.
        message_id: MessageId,
    },

    /// The server acknowledged a sent message.
    MessageConfirmed {
        /// Temporary message ID.
        message_id: MessageId,
        /// Canonical ID assigned by the server.
        confirmed_id: MessageId,
    },

    /// A sent message was not acknowledged.
    MessageFailed {
        /// Temporary message ID.
        message_id: MessageId,
        /// Why the send failed.
        reason: String,
    },

    /// A room creation request completed.
    RoomCreated {
        /// Ticket from [`ClientEvent::CreateRoom`].
        ticket: u64,
        /// New room ID, or the server-provided error.
        result: Result<RoomId, String>,
    },
}
