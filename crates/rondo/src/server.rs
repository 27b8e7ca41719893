//! Listener, handshake, and connection registry.
//!
//! [`Server::start`] spawns an accept loop that greets every incoming TCP
//! connection with a `HANDSHAKE` and waits for the matching `HANDSHAKE_ACK`
//! on a per-connection task. Only connections that complete the handshake
//! reach the registry; the application admits them one at a time through
//! [`Server::next_client`] or [`Server::poll_clients`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rondo_protocol::{ClientId, Message};
use rondo_transport::{FramedChannel, TcpTransport};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rpc::{AcceptAll, RpcValidator};

/// How long a freshly accepted connection has to answer the handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A client that has completed the handshake and joined the registry.
pub struct ClientConnection {
    pub id: ClientId,
    pub remote_addr: SocketAddr,
    pub(crate) channel: FramedChannel,
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}

/// RPC server owning the listener and the set of live connections.
pub struct Server {
    config: ServerConfig,
    local_addr: Option<SocketAddr>,
    incoming: Option<mpsc::Receiver<ClientConnection>>,
    accept_task: Option<JoinHandle<()>>,
    pub(crate) connections: HashMap<ClientId, ClientConnection>,
    pub(crate) validator: Arc<dyn RpcValidator>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            local_addr: None,
            incoming: None,
            accept_task: None,
            connections: HashMap::new(),
            validator: Arc::new(AcceptAll),
        }
    }

    /// Replaces the result validator applied to every RPC reply.
    pub fn with_validator(mut self, validator: impl RpcValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub(crate) fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address the listener is bound on, once [`start`](Self::start) has run.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Binds the listener and spawns the accept loop.
    ///
    /// Calling `start` on an already running server is a no-op.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        if self.accept_task.is_some() {
            return Ok(());
        }
        let transport = TcpTransport::bind(
            &self.config.host,
            self.config.port,
            self.config.backlog,
            self.config.delimiter,
        )
        .await?;
        self.local_addr = transport.local_addr().ok();
        tracing::info!(addr = ?self.local_addr, "server listening");

        let (tx, rx) = mpsc::channel(self.config.backlog.max(1) as usize);
        self.incoming = Some(rx);
        self.accept_task = Some(tokio::spawn(accept_loop(transport, tx)));
        Ok(())
    }

    /// Stops accepting new connections. Registered clients stay connected.
    pub fn stop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
            self.incoming = None;
            tracing::info!("server stopped accepting connections");
        }
    }

    /// Waits for the next handshaken connection and registers it.
    ///
    /// Returns `None` once the server has been stopped and the pending queue
    /// is drained.
    pub async fn next_client(&mut self) -> Option<ClientId> {
        let incoming = self.incoming.as_mut()?;
        let conn = incoming.recv().await?;
        Some(self.register(conn))
    }

    /// Registers every connection currently waiting, without blocking.
    pub fn poll_clients(&mut self) -> Vec<ClientId> {
        let mut registered = Vec::new();
        let Some(incoming) = self.incoming.as_mut() else {
            return registered;
        };
        while let Ok(conn) = incoming.try_recv() {
            let id = conn.id.clone();
            tracing::info!(client_id = %id, addr = %conn.remote_addr, "client registered");
            self.connections.insert(id.clone(), conn);
            registered.push(id);
        }
        registered
    }

    fn register(&mut self, conn: ClientConnection) -> ClientId {
        let id = conn.id.clone();
        tracing::info!(client_id = %id, addr = %conn.remote_addr, "client registered");
        self.connections.insert(id.clone(), conn);
        id
    }

    pub fn is_connected(&self, id: &ClientId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn client_count(&self) -> usize {
        self.connections.len()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.connections.keys().cloned().collect()
    }

    pub fn remote_addr(&self, id: &ClientId) -> Option<SocketAddr> {
        self.connections.get(id).map(|c| c.remote_addr)
    }

    /// Sends `END` to the client and removes it from the registry.
    ///
    /// The send is best effort: a client that already vanished is still
    /// removed, and only an unknown id is an error.
    pub async fn close_client(&mut self, id: &ClientId) -> Result<(), ServerError> {
        let mut conn = self
            .connections
            .remove(id)
            .ok_or_else(|| ServerError::UnknownClient(id.clone()))?;
        if let Err(error) = conn.channel.send(&Message::End).await {
            tracing::debug!(client_id = %id, %error, "failed to send END");
        }
        let _ = conn.channel.shutdown().await;
        tracing::info!(client_id = %id, "client closed");
        Ok(())
    }

    /// Drops a connection without the END exchange. Used when the transport
    /// has already failed underneath it.
    pub(crate) fn drop_client(&mut self, id: &ClientId) {
        if self.connections.remove(id).is_some() {
            tracing::warn!(client_id = %id, "connection dropped");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

// --- accept path -----------------------------------------------------------

async fn accept_loop(transport: TcpTransport, tx: mpsc::Sender<ClientConnection>) {
    let mut connection_number: u64 = 0;
    loop {
        match transport.accept().await {
            Ok((channel, addr)) => {
                connection_number += 1;
                let id = generate_client_id(connection_number);
                tracing::debug!(client_id = %id, %addr, "connection accepted");
                let tx = tx.clone();
                tokio::spawn(async move {
                    match handshake(channel, id.clone(), addr).await {
                        Ok(conn) => {
                            if tx.send(conn).await.is_err() {
                                tracing::debug!(client_id = %id, "server gone, discarding connection");
                            }
                        }
                        Err(error) => {
                            tracing::warn!(client_id = %id, %addr, %error, "handshake failed");
                        }
                    }
                });
            }
            Err(error) => {
                tracing::warn!(%error, "accept failed");
            }
        }
    }
}

/// Greets a new connection and waits for the matching ack.
///
/// Any other reply, an id mismatch, or silence past [`HANDSHAKE_TIMEOUT`]
/// fails the handshake; dropping the channel closes the socket.
async fn handshake(
    mut channel: FramedChannel,
    id: ClientId,
    addr: SocketAddr,
) -> Result<ClientConnection, ServerError> {
    channel.send(&Message::Handshake { id: id.clone() }).await?;
    let reply = tokio::time::timeout(HANDSHAKE_TIMEOUT, channel.recv())
        .await
        .map_err(|_| ServerError::HandshakeFailed("timed out waiting for ack".to_string()))??;
    match reply {
        Message::HandshakeAck { id: ack_id } if ack_id == id => {
            tracing::info!(client_id = %id, %addr, "handshake complete");
            Ok(ClientConnection {
                id,
                remote_addr: addr,
                channel,
            })
        }
        Message::HandshakeAck { id: ack_id } => Err(ServerError::HandshakeFailed(format!(
            "ack id mismatch: assigned {id}, got {ack_id}"
        ))),
        other => Err(ServerError::HandshakeFailed(format!(
            "expected HANDSHAKE_ACK, got {other:?}"
        ))),
    }
}

/// Ids are `<connection number>:<random hex>`; the counter keeps them unique
/// per server, the suffix keeps them hard to guess across restarts.
fn generate_client_id(connection_number: u64) -> ClientId {
    let suffix: u32 = rand::rng().random();
    ClientId(format!("{connection_number}:{suffix:08x}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_client_id_embeds_connection_number() {
        let id = generate_client_id(7);
        let (number, suffix) = id.as_str().split_once(':').unwrap();
        assert_eq!(number, "7");
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn test_generate_client_id_suffixes_differ() {
        let a = generate_client_id(1);
        let b = generate_client_id(1);
        assert_ne!(a, b);
    }
}
