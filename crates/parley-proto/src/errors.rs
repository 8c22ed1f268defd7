//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding envelopes and payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Encoded envelope exceeds the maximum accepted size.
    #[error("envelope too large: {size} bytes (max {max})")]
    EnvelopeTooLarge {
        /// Size of the rejected envelope
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// JSON serialization failed.
    #[error("json encode failed: {0}")]
    JsonEncode(String),

    /// JSON deserialization failed.
    #[error("json decode failed: {0}")]
    JsonDecode(String),

    /// Event name is not part of the protocol.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Event data does not match the shape expected for the event.
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event name
        event: &'static str,
        /// Decoder message
        reason: String,
    },

    /// Acknowledgements carry untyped data and have no payload variant.
    #[error("ack envelopes have no typed payload")]
    AckWithoutPayload,
}
