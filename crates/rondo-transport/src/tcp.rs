//! TCP listener wrapper producing framed channels.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket, lookup_host};

use crate::{FramedChannel, TransportError};

/// The listening half of the transport: accepts TCP connections and
/// wraps each in a [`FramedChannel`].
pub struct TcpTransport {
    listener: TcpListener,
    delimiter: u8,
}

impl TcpTransport {
    /// Binds to `host:port` with the given accept backlog.
    ///
    /// Goes through [`TcpSocket`] rather than [`TcpListener::bind`] so
    /// the backlog is honored.
    ///
    /// # Errors
    /// Returns [`TransportError::AcceptFailed`] if the address does not
    /// resolve or the bind/listen fails.
    pub async fn bind(
        host: &str,
        port: u16,
        backlog: u32,
        delimiter: u8,
    ) -> Result<Self, TransportError> {
        let addr = lookup_host((host, port))
            .await
            .map_err(TransportError::AcceptFailed)?
            .next()
            .ok_or_else(|| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("{host} did not resolve"),
                ))
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(TransportError::AcceptFailed)?;
        socket.bind(addr).map_err(TransportError::AcceptFailed)?;
        let listener = socket
            .listen(backlog)
            .map_err(TransportError::AcceptFailed)?;

        tracing::info!(%addr, "TCP transport listening");
        Ok(Self {
            listener,
            delimiter,
        })
    }

    /// Waits for and accepts the next incoming connection.
    pub async fn accept(
        &self,
    ) -> Result<(FramedChannel, SocketAddr), TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::debug!(%addr, "accepted TCP connection");
        Ok((
            FramedChannel::with_delimiter(stream, self.delimiter),
            addr,
        ))
    }

    /// The local address the listener is bound to (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
