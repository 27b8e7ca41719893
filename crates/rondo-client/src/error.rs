//! Error types for the client crate.

/// Errors that can occur while connecting or serving method requests.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level failure (connect, send, recv).
    #[error(transparent)]
    Transport(#[from] rondo_transport::TransportError),

    /// The server's first message was not a `HANDSHAKE`.
    #[error("handshake failed: expected HANDSHAKE, got {got}")]
    UnexpectedHandshake { got: &'static str },
}
