//! Client error types.

use parley_core::ConnectionError;
use parley_proto::{MessageId, ProtocolError, RoomId};
use thiserror::Error;

/// Errors returned to the caller of [`crate::Client::handle`].
///
/// Only caller-initiated operations fail. Problems with inbound traffic
/// (unknown rooms, malformed payloads, unmatched acknowledgements) are logged
/// and dropped instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The operation needs an open connection.
    #[error("not connected")]
    NotConnected,

    /// Sending needs an active room.
    #[error("no active room")]
    NoActiveRoom,

    /// Message text is empty after trimming.
    #[error("message text is empty")]
    EmptyMessage,

    /// No message with this ID in the active timeline.
    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),

    /// Only failed messages can be retried.
    #[error("message {0} has not failed")]
    NotRetryable(MessageId),

    /// Room is not in the directory.
    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),

    /// Connection state machine rejected the operation.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Outgoing payload could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
