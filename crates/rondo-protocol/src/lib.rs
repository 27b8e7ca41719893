//! Wire protocol for Rondo.
//!
//! This crate defines the "language" that servers and clients speak:
//!
//! - **Types** ([`Message`], [`ClientId`]): the message structures that
//!   travel on the wire.
//! - **Framing** ([`encode_frame`], [`FrameDecoder`]): how messages are
//!   delimited on a raw byte stream.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding
//!   or decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the RPC
//! layer (calls and replies). It doesn't know about sockets or sessions;
//! it only knows how to turn messages into frames and back.
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → RPC (call outcome)
//! ```

mod frame;
mod error;
mod types;

pub use error::ProtocolError;
pub use frame::{encode_frame, FrameDecoder, DEFAULT_DELIMITER, MAX_FRAME_LEN};
pub use types::{ClientId, Message};
