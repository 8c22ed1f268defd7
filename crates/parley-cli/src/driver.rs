//! WebSocket driver for the line client.
//!
//! Implements the [`Driver`] trait on top of the `tokio-tungstenite` session
//! in [`parley_client::transport`].

use std::time::Instant;

use parley_app::Driver;
use parley_client::transport::{self, ConnectedClient};
use parley_proto::Envelope;

use crate::CliError;

/// Socket driver implementing the [`Driver`] trait.
pub struct WsDriver {
    base_url: String,
    connection: Option<ConnectedClient>,
}

impl WsDriver {
    /// Create a driver for the socket endpoint at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), connection: None }
    }
}

impl Driver for WsDriver {
    type Error = CliError;
    type Instant = Instant;

    async fn connect(&mut self, user_id: &str) -> Result<(), Self::Error> {
        self.stop();
        let url = transport::session_url(&self.base_url, user_id)?;
        tracing::info!(%url, "connecting");
        let client = transport::connect(&url).await?;
        self.connection = Some(client);
        Ok(())
    }

    async fn send_envelope(&mut self, envelope: Envelope) -> Result<(), Self::Error> {
        let conn = self.connection.as_ref().ok_or(CliError::ChannelClosed)?;
        conn.to_server.send(envelope).await.map_err(|_| CliError::ChannelClosed)
    }

    async fn recv_envelope(&mut self) -> Option<Envelope> {
        match self.connection.as_mut() {
            Some(conn) => conn.from_server.recv().await,
            None => None,
        }
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn stop(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.stop();
        }
    }
}

impl Drop for WsDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
