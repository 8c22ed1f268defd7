//! WebSocket transport for the client.
//!
//! Provides [`ConnectedClient`] which handles WebSocket I/O for envelope
//! transport. This is a thin layer that just sends/receives envelopes -
//! protocol logic remains in the Sans-IO [`crate::Client`].

use futures::{SinkExt, StreamExt};
use parley_proto::Envelope;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

/// Capacity of the envelope channels in each direction.
const CHANNEL_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Handle to an open socket session.
///
/// Envelopes are sent/received via the channels, and an internal task handles
/// the WebSocket I/O. `from_server` yields `None` once the socket is closed.
pub struct ConnectedClient {
    /// Send envelopes to the server.
    pub to_server: mpsc::Sender<Envelope>,
    /// Receive envelopes from the server.
    pub from_server: mpsc::Receiver<Envelope>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Socket URL for `user_id`: the base URL with a `userId` query parameter.
///
/// # Errors
///
/// - `TransportError::Connection` if `base` is not a valid `ws`/`wss` URL
pub fn session_url(base: &str, user_id: &str) -> Result<Url, TransportError> {
    let mut url =
        Url::parse(base).map_err(|e| TransportError::Connection(format!("invalid url: {e}")))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(TransportError::Connection(format!("unsupported scheme: {}", url.scheme())));
    }

    url.query_pairs_mut().append_pair("userId", user_id);
    Ok(url)
}

/// Open a socket session.
///
/// Returns a [`ConnectedClient`] with channels for envelope transport.
///
/// # Errors
///
/// - `TransportError::Connection` if the handshake fails
pub async fn connect(url: &Url) -> Result<ConnectedClient, TransportError> {
    let (stream, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Connection(format!("handshake failed: {e}")))?;

    tracing::debug!(host = url.host_str().unwrap_or_default(), "socket open");

    let (to_server_tx, to_server_rx) = mpsc::channel::<Envelope>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<Envelope>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(async move {
        if let Err(e) = run_connection(stream, to_server_rx, from_server_tx).await {
            tracing::warn!(error = %e, "socket closed with error");
        }
    });

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the connection, bridging between channels and the socket.
///
/// Returns when either side closes. Dropping `from_server` signals the close
/// to the receiver.
async fn run_connection<S>(
    stream: S,
    mut to_server: mpsc::Receiver<Envelope>,
    from_server: mpsc::Sender<Envelope>,
) -> Result<(), TransportError>
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin,
{
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(envelope) = outgoing else {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                };
                let text = envelope
                    .encode()
                    .map_err(|e| TransportError::Protocol(format!("encode failed: {e}")))?;
                sink.send(Message::Text(text))
                    .await
                    .map_err(|e| TransportError::Stream(format!("write failed: {e}")))?;
            },
            incoming = source.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => return Err(TransportError::Stream(format!("read failed: {e}"))),
                    None => return Ok(()),
                };

                match message {
                    Message::Text(text) => match Envelope::decode(&text) {
                        Ok(envelope) => {
                            if from_server.send(envelope).await.is_err() {
                                return Ok(());
                            }
                        },
                        Err(e) => tracing::warn!(error = %e, "dropping undecodable frame"),
                    },
                    Message::Close(_) => return Ok(()),
                    Message::Binary(_) => tracing::warn!("dropping binary frame"),
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {},
                }
            },
        }
    }
}
