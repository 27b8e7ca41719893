//! The framed message channel over a TCP stream.

use std::collections::VecDeque;
use std::net::SocketAddr;

use rondo_protocol::{encode_frame, FrameDecoder, Message, DEFAULT_DELIMITER};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::TransportError;

/// Turns a raw byte stream into a sequence of discrete protocol messages.
///
/// Frames already decoded but not yet read wait in an internal queue, so
/// [`recv`](Self::recv) resolves immediately when one is available and
/// several frames arriving in a single read are delivered one by one, in
/// order.
///
/// # Cancel safety
///
/// `recv`'s only await point is the socket read; every completed read is
/// decoded synchronously before the next await. Dropping a pending `recv`
/// (e.g. when it loses a timeout race) therefore never tears a frame;
/// partial bytes stay buffered and the frame is delivered to whoever
/// calls `recv` next.
#[derive(Debug)]
pub struct FramedChannel {
    stream: TcpStream,
    delimiter: u8,
    decoder: FrameDecoder,
    queue: VecDeque<Value>,
}

impl FramedChannel {
    /// Wraps an established stream using the default `#` delimiter.
    pub fn new(stream: TcpStream) -> Self {
        Self::with_delimiter(stream, DEFAULT_DELIMITER)
    }

    /// Wraps an established stream using a custom framing delimiter.
    pub fn with_delimiter(stream: TcpStream, delimiter: u8) -> Self {
        Self {
            stream,
            delimiter,
            decoder: FrameDecoder::new(delimiter),
            queue: VecDeque::new(),
        }
    }

    /// Connects to a remote address and wraps the resulting stream.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        delimiter: u8,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        Ok(Self::with_delimiter(stream, delimiter))
    }

    /// Sends one message as a single frame.
    ///
    /// Completes only once the underlying write has been handed to the
    /// OS in full.
    pub async fn send(&mut self, msg: &Message) -> Result<(), TransportError> {
        let frame = encode_frame(msg, self.delimiter)?;
        self.stream
            .write_all(&frame)
            .await
            .map_err(TransportError::SendFailed)
    }

    /// Returns the next fully-buffered message, reading from the socket
    /// as needed.
    ///
    /// A frame whose payload is valid JSON but not a protocol [`Message`]
    /// is dropped with a warning and the read continues; malformed
    /// traffic never closes the connection by itself.
    ///
    /// # Errors
    /// - [`TransportError::ConnectionClosed`] on EOF.
    /// - [`TransportError::ReceiveFailed`] on socket errors.
    /// - [`TransportError::Protocol`] if the stream violates framing
    ///   beyond recovery (oversized length prefix).
    pub async fn recv(&mut self) -> Result<Message, TransportError> {
        loop {
            while let Some(value) = self.queue.pop_front() {
                match serde_json::from_value::<Message>(value) {
                    Ok(msg) => return Ok(msg),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "dropping frame that is not a protocol message"
                        );
                    }
                }
            }

            let mut chunk = [0u8; 4096];
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                return Err(TransportError::ConnectionClosed);
            }
            self.queue.extend(self.decoder.feed(&chunk[..n])?);
        }
    }

    /// Discards any decoded-but-unread messages.
    ///
    /// Recovers the read queue without closing the channel, the escape
    /// hatch for a stale reply left behind by a timed-out call. Partial
    /// raw bytes of an incomplete frame are kept.
    pub fn reset(&mut self) {
        let dropped = self.queue.len();
        self.queue.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "reset channel read queue");
        }
    }

    /// Number of decoded messages waiting to be read.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The remote peer's address.
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Shuts down the write half, signalling EOF to the peer.
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.stream
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }
}
