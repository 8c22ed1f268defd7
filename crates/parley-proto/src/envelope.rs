//! Transport-level envelope.
//!
//! An `Envelope` is what travels in one text frame of the duplex channel:
//!
//! ```text
//! {"event":"send-message","ack":7,"data":{"text":"hi","roomId":"r1"}}
//! ```
//!
//! The envelope holds raw JSON data, NOT the [`crate::Payload`] enum, so that
//! acknowledgements (whose shape depends on the request they answer) and
//! events from newer servers can be carried without decoding. For typed
//! access see [`crate::Payload::from_envelope`] and [`Envelope::ack_data`].

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    EventKind,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame.
///
/// # Invariants
///
/// - Size Limit: the encoded form never exceeds [`Envelope::MAX_SIZE`].
///   Enforced by [`Envelope::encode`] and checked before parsing in
///   [`Envelope::decode`].
/// - Ack Pairing: a request with `ack: Some(n)` is answered by exactly one
///   envelope with `event == "ack"` and the same `n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name (see [`EventKind`]).
    pub event: String,

    /// Acknowledgement number. Present on requests that expect a response and
    /// on the response itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,

    /// Event-specific data.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// Maximum encoded envelope size (1 MiB).
    pub const MAX_SIZE: usize = 1024 * 1024;

    /// Create an envelope for a known event.
    #[must_use]
    pub fn new(kind: EventKind, ack: Option<u64>, data: serde_json::Value) -> Self {
        Self { event: kind.as_str().to_string(), ack, data }
    }

    /// Build the acknowledgement for request `ack` carrying `data`.
    pub fn ack<T: Serialize>(ack: u64, data: &T) -> Result<Self> {
        let data = serde_json::to_value(data).map_err(|e| ProtocolError::JsonEncode(e.to_string()))?;
        Ok(Self::new(EventKind::Ack, Some(ack), data))
    }

    /// Event kind. `None` if the event name is not part of the protocol.
    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_name(&self.event)
    }

    /// Whether this envelope answers an acknowledged request.
    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.kind() == Some(EventKind::Ack)
    }

    /// Decode the data of an acknowledgement into the expected response type.
    ///
    /// The caller knows the response type from the request it sent.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidPayload` if the data does not match `T`
    pub fn ack_data<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.data).map_err(|e| ProtocolError::InvalidPayload {
            event: EventKind::Ack.as_str(),
            reason: e.to_string(),
        })
    }

    /// Encode to the JSON text sent on the wire.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::JsonEncode` if serialization fails
    /// - `ProtocolError::EnvelopeTooLarge` if the result exceeds `MAX_SIZE`
    pub fn encode(&self) -> Result<String> {
        let text = serde_json::to_string(self).map_err(|e| ProtocolError::JsonEncode(e.to_string()))?;

        if text.len() > Self::MAX_SIZE {
            return Err(ProtocolError::EnvelopeTooLarge { size: text.len(), max: Self::MAX_SIZE });
        }

        Ok(text)
    }

    /// Decode an envelope from wire text.
    ///
    /// The size check happens before JSON parsing. Unknown event names are
    /// NOT rejected here; the caller decides whether to drop them.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EnvelopeTooLarge` if `text` exceeds `MAX_SIZE`
    /// - `ProtocolError::JsonDecode` if `text` is not an envelope
    pub fn decode(text: &str) -> Result<Self> {
        if text.len() > Self::MAX_SIZE {
            return Err(ProtocolError::EnvelopeTooLarge { size: text.len(), max: Self::MAX_SIZE });
        }

        serde_json::from_str(text).map_err(|e| ProtocolError::JsonDecode(e.to_string()))
    }
}
