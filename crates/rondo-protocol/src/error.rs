//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a message into JSON bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed (turning JSON bytes into a message).
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A frame announced a payload larger than [`MAX_FRAME_LEN`].
    ///
    /// A hostile or corrupted length prefix must not force the receiver
    /// to buffer without bound, so decoding stops here.
    ///
    /// [`MAX_FRAME_LEN`]: crate::MAX_FRAME_LEN
    #[error("frame length {length} exceeds maximum {max}")]
    FrameTooLarge { length: usize, max: usize },
}
