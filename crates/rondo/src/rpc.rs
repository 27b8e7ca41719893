//! Server-initiated RPC over a registered connection.
//!
//! Requests carry no correlation id: the protocol pairs each reply with the
//! request positionally, so the server keeps at most one call in flight per
//! connection. [`Server::call`] takes `&mut self`, which makes overlapping
//! calls to the same server impossible at compile time. A reply that lands
//! after its call timed out stays buffered and is read back by the next call
//! on that connection.

use std::time::{Duration, Instant};

use rondo_protocol::{ClientId, Message};
use rondo_transport::TransportError;
use serde_json::Value;

use crate::server::Server;

/// Why an RPC call failed.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("unknown client {0}")]
    UnknownClient(ClientId),

    #[error("rpc timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("method {method} not implemented by the client")]
    NotImplemented { method: String },

    #[error("method {method} failed on the client: {error}")]
    RemoteException { method: String, error: String },

    #[error("result of {method} rejected by the validator")]
    Validation { method: String },

    #[error("unexpected reply to {method}: {kind}")]
    UnexpectedReply {
        method: String,
        kind: &'static str,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Inspects every RPC result before it is handed to the application.
///
/// Rejected results surface as [`RpcError::Validation`]; the connection
/// itself is left alone.
pub trait RpcValidator: Send + Sync + 'static {
    fn validate(&self, method: &str, result: &Value) -> bool;
}

/// Default validator, accepts everything.
pub struct AcceptAll;

impl RpcValidator for AcceptAll {
    fn validate(&self, _method: &str, _result: &Value) -> bool {
        true
    }
}

impl Server {
    /// Invokes `method` on the given client and waits for the reply.
    ///
    /// The wait is bounded by the configured `rpc_timeout`. A transport
    /// failure during the call removes the connection from the registry.
    pub async fn call(
        &mut self,
        id: &ClientId,
        method: &str,
        params: Option<Vec<Value>>,
    ) -> Result<Value, RpcError> {
        let rpc_timeout = self.config().rpc_timeout;
        let started = Instant::now();

        let outcome = {
            let Some(conn) = self.connections.get_mut(id) else {
                return Err(RpcError::UnknownClient(id.clone()));
            };
            tracing::debug!(client_id = %id, %method, ?params, "rpc request");
            let request = Message::MethodRequest {
                method: method.to_string(),
                params,
            };
            match conn.channel.send(&request).await {
                Err(error) => Err(RpcError::Transport(error)),
                Ok(()) => {
                    match tokio::time::timeout(rpc_timeout, conn.channel.recv()).await {
                        Err(_) => Err(RpcError::Timeout {
                            elapsed: started.elapsed(),
                        }),
                        Ok(Err(error)) => Err(RpcError::Transport(error)),
                        Ok(Ok(reply)) => Ok(reply),
                    }
                }
            }
        };

        let reply = match outcome {
            Ok(reply) => reply,
            Err(RpcError::Transport(error)) => {
                tracing::warn!(client_id = %id, %method, %error, "connection lost during rpc");
                self.drop_client(id);
                return Err(RpcError::Transport(error));
            }
            Err(error) => {
                tracing::warn!(client_id = %id, %method, %error, "rpc failed");
                return Err(error);
            }
        };

        match reply {
            Message::MethodResult { result } => {
                if self.validator.validate(method, &result) {
                    tracing::debug!(
                        client_id = %id,
                        %method,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "rpc reply received"
                    );
                    Ok(result)
                } else {
                    tracing::warn!(client_id = %id, %method, "rpc reply rejected by validator");
                    Err(RpcError::Validation {
                        method: method.to_string(),
                    })
                }
            }
            Message::ErrorMethodNotImplemented { method: reported } => {
                tracing::warn!(client_id = %id, method = %reported, "method not implemented");
                Err(RpcError::NotImplemented { method: reported })
            }
            Message::ErrorMethodException {
                method: reported,
                error,
            } => {
                tracing::warn!(client_id = %id, method = %reported, %error, "method raised");
                Err(RpcError::RemoteException {
                    method: reported,
                    error,
                })
            }
            other => Err(RpcError::UnexpectedReply {
                method: method.to_string(),
                kind: message_kind(&other),
            }),
        }
    }
}

fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Handshake { .. } => "HANDSHAKE",
        Message::HandshakeAck { .. } => "HANDSHAKE_ACK",
        Message::MethodRequest { .. } => "METHOD_REQUEST",
        Message::MethodResult { .. } => "METHOD_RESULT",
        Message::ErrorMethodNotImplemented { .. } => "ERROR_METHOD_NOT_IMPLEMENTED",
        Message::ErrorMethodException { .. } => "ERROR_METHOD_EXCEPTION",
        Message::End => "END",
    }
}
