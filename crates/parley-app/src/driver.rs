//! Driver trait for abstracting transport I/O.
//!
//! The [`Driver`] trait decouples the runtime from a specific transport. Each
//! frontend implements the trait, while the generic [`crate::Runtime`]
//! handles all orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use parley_proto::Envelope;

/// Abstracts transport operations for the runtime.
///
/// # Implementations
///
/// - **CLI**: WebSocket session via `tokio-tungstenite`
/// - **Simulation**: In-memory server with a virtual clock
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Open a socket session carrying `user_id` as connection metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be opened.
    fn connect(&mut self, user_id: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send an envelope to the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the send fails.
    fn send_envelope(
        &mut self,
        envelope: Envelope,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next envelope from the server.
    ///
    /// Returns `None` once the connection is closed.
    fn recv_envelope(&mut self) -> impl Future<Output = Option<Envelope>> + Send;

    /// Check if a session is open.
    fn is_connected(&self) -> bool;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Close the session and clean up resources.
    fn stop(&mut self);
}
