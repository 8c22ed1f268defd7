//! Commands sent from handles to the runtime.
//!
//! Each command carries a oneshot sender for its reply, so the caller can
//! await the outcome while the runtime stays the single owner of the state.

use parley_proto::{MessageId, RoomId, UserId, UserIdentity};
use tokio::sync::oneshot;

use crate::AppError;

/// Reply channel for a command.
pub type Reply<T> = oneshot::Sender<Result<T, AppError>>;

/// Commands processed by the [`crate::Runtime`].
#[derive(Debug)]
pub enum AppAction {
    /// Open a session for the authenticated user.
    Connect {
        /// Authenticated user.
        identity: UserIdentity,
        /// Resolves once the transport is open or failed.
        reply: Reply<()>,
    },

    /// Logout: close the session and clear user state.
    Disconnect {
        /// Resolves once the session is closed.
        reply: Reply<()>,
    },

    /// Select a room, or close the open one.
    SetActiveRoom {
        /// Room to activate.
        room_id: Option<RoomId>,
        /// Resolves once the switch is applied.
        reply: Reply<()>,
    },

    /// Send a message to the active room.
    SendMessage {
        /// Message body.
        text: String,
        /// Resolves with the temporary ID of the optimistic message.
        reply: Reply<MessageId>,
    },

    /// Retry a failed message.
    RetryMessage {
        /// Temporary ID of the failed message.
        message_id: MessageId,
        /// Resolves once the send is re-issued.
        reply: Reply<()>,
    },

    /// Mark a room as read. Fire-and-forget.
    MarkRoomRead {
        /// Room to mark.
        room_id: RoomId,
    },

    /// Create a room.
    CreateRoom {
        /// Other participants.
        participant_ids: Vec<UserId>,
        /// Room name.
        name: Option<String>,
        /// Resolves with the new room ID once the server answers.
        reply: Reply<RoomId>,
    },
}
