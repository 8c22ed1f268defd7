//! Parley Protocol
//!
//! Wire model and event protocol between the chat client and the socket
//! server.
//!
//! Every transport frame carries exactly one JSON [`Envelope`]: an event name,
//! an optional acknowledgement number, and an event-specific `data` value.
//! The event name selects the payload type ([`EventKind`]), and typed payloads
//! are converted to and from envelopes through [`Payload`].
//!
//! # Components
//!
//! - [`Envelope`]: Transport-level frame (event name + ack + raw JSON data)
//! - [`EventKind`]: Fixed table of protocol event names
//! - [`Payload`]: Typed request and push payloads
//! - [`ChatMessage`], [`ChatRoom`], [`UserIdentity`]: Shared data model

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod envelope;
pub mod errors;
mod event;
pub mod payloads;

pub use envelope::Envelope;
pub use errors::{ProtocolError, Result};
pub use event::EventKind;
pub use payloads::{
    Payload,
    chat::{
        ChatMessage, ChatRoom, LastMessage, MessageId, MessageState, RoomId, UserId, UserIdentity,
    },
};
