use rondo_protocol::{ClientId, ProtocolError};
use rondo_transport::TransportError;

use crate::rpc::RpcError;

/// Top-level error type for server-side operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("unknown client {0}")]
    UnknownClient(ClientId),

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("server stopped")]
    Stopped,
}
