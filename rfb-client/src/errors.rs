//! Error types for the RFB client.

use crate::transport::TransportError;
use rfb_protocol::SessionError;
use thiserror::Error;

/// Errors surfaced at the client API boundary.
///
/// Session progress itself is reported through the sticky error slot (see
/// [`VncClient::error_code`](crate::VncClient::error_code)); this type covers
/// configuration loading and the blocking helpers layered on top.
#[derive(Debug, Error)]
pub enum RfbClientError {
    /// Transport-level failure (resolution, connect, socket I/O).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol or authentication failure reported by the state machine.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The session did not become ready in time.
    #[error("Connection timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl RfbClientError {
    /// Returns true if this error is potentially retryable.
    ///
    /// Transport failures and timeouts may succeed on a fresh connection.
    /// Protocol, authentication and configuration errors will not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }

    /// Returns true if this is a fatal error that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}
