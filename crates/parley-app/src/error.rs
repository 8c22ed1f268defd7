//! Service-level errors.

use parley_client::ClientError;
use thiserror::Error;

/// Errors returned by [`crate::ChatHandle`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The client rejected the operation.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The transport could not be opened.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request was rejected by the server or did not complete.
    #[error("{0}")]
    Rejected(String),

    /// The runtime has stopped.
    #[error("chat runtime has shut down")]
    Shutdown,
}
