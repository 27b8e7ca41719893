//! TCP transport layer for Rondo.
//!
//! Provides [`FramedChannel`], a raw bidirectional byte stream turned
//! into a sequence of discrete protocol messages using length-prefixed
//! framing, and [`TcpTransport`], the listening half that accepts
//! connections and wraps them.
//!
//! No identity, no RPC semantics: those live above this crate. The
//! channel just moves [`Message`]s in both directions.

mod channel;
mod error;
mod tcp;

pub use channel::FramedChannel;
pub use error::TransportError;
pub use tcp::TcpTransport;
