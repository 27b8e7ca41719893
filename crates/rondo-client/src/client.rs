//! Connection handling and the method dispatch loop.

use rondo_protocol::{ClientId, Message, DEFAULT_DELIMITER};
use rondo_transport::FramedChannel;

use crate::{ClientError, MethodTable};

/// Connection settings for a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host to connect to.
    pub host: String,
    /// Port to connect to.
    pub port: u16,
    /// Framing delimiter; must match the server's.
    pub delimiter: u8,
}

impl ClientConfig {
    /// Creates a config with the default framing delimiter.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// A connected client: identity assigned, ready to serve method requests.
pub struct Client {
    channel: FramedChannel,
    id: ClientId,
}

impl Client {
    /// Connects to the server and completes the handshake.
    ///
    /// The server speaks first: it sends `HANDSHAKE{id}`, we store the id
    /// as our identity for this session and confirm with
    /// `HANDSHAKE_ACK{id}`. No other traffic happens before this.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut channel = FramedChannel::connect(
            (config.host.as_str(), config.port),
            config.delimiter,
        )
        .await?;

        let id = match channel.recv().await? {
            Message::Handshake { id } => id,
            other => {
                return Err(ClientError::UnexpectedHandshake {
                    got: message_kind(&other),
                });
            }
        };
        channel
            .send(&Message::HandshakeAck { id: id.clone() })
            .await?;

        tracing::info!(client_id = %id, "connected");
        Ok(Self { channel, id })
    }

    /// The identity assigned by the server during the handshake.
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Runs the dispatch loop until the server sends `END`.
    ///
    /// For each `METHOD_REQUEST`: look the method up in `methods`; reply
    /// `ERROR_METHOD_NOT_IMPLEMENTED` if absent, otherwise invoke it and
    /// reply `METHOD_RESULT` on success or `ERROR_METHOD_EXCEPTION` on
    /// failure. A failing handler never escapes the loop; it always
    /// becomes a protocol-level reply, keeping the connection live.
    pub async fn serve(&mut self, methods: &MethodTable) -> Result<(), ClientError> {
        loop {
            let (method, params) = match self.channel.recv().await? {
                Message::End => {
                    tracing::info!(client_id = %self.id, "server ended session");
                    return Ok(());
                }
                Message::MethodRequest { method, params } => (method, params),
                other => {
                    tracing::debug!(
                        client_id = %self.id,
                        kind = message_kind(&other),
                        "ignoring unexpected message"
                    );
                    continue;
                }
            };

            let reply = match methods.get(&method) {
                None => {
                    tracing::warn!(client_id = %self.id, %method, "method not implemented");
                    Message::ErrorMethodNotImplemented { method }
                }
                Some(handler) => {
                    match handler(params.unwrap_or_default()).await {
                        Ok(result) => {
                            tracing::debug!(client_id = %self.id, %method, "method ok");
                            Message::MethodResult { result }
                        }
                        Err(error) => {
                            tracing::warn!(
                                client_id = %self.id,
                                %method,
                                %error,
                                "method implementation failed"
                            );
                            Message::ErrorMethodException { method, error }
                        }
                    }
                }
            };
            self.channel.send(&reply).await?;
        }
    }

    /// Closes the connection gracefully.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.channel.shutdown().await?;
        Ok(())
    }

    /// Discards any received-but-unread messages on the channel.
    pub fn reset(&mut self) {
        self.channel.reset();
    }
}

fn message_kind(msg: &Message) -> &'static str {
    match msg {
        Message::Handshake { .. } => "HANDSHAKE",
        Message::HandshakeAck { .. } => "HANDSHAKE_ACK",
        Message::MethodRequest { .. } => "METHOD_REQUEST",
        Message::MethodResult { .. } => "METHOD_RESULT",
        Message::ErrorMethodNotImplemented { .. } => "ERROR_METHOD_NOT_IMPLEMENTED",
        Message::ErrorMethodException { .. } => "ERROR_METHOD_EXCEPTION",
        Message::End => "END",
    }
}
