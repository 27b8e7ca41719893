//! Length-prefixed message framing.
//!
//! Each frame on the wire is `<decimalLength><delimiter><jsonPayload>`,
//! where `decimalLength` is the UTF-8 **byte** length of the payload and
//! the delimiter is a single configurable byte (`#` by default). Frames
//! may arrive concatenated back-to-back in one read or split at any byte
//! boundary across reads; [`FrameDecoder`] handles both by buffering.

use serde::Serialize;
use serde_json::Value;

use crate::ProtocolError;

/// Default framing delimiter between the length prefix and the payload.
pub const DEFAULT_DELIMITER: u8 = b'#';

/// Maximum accepted payload length (16 MiB).
///
/// A length prefix above this is treated as a protocol violation rather
/// than an invitation to buffer gigabytes.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Serializes `value` into a single wire frame.
pub fn encode_frame<T: Serialize>(
    value: &T,
    delimiter: u8,
) -> Result<Vec<u8>, ProtocolError> {
    let payload = serde_json::to_vec(value).map_err(ProtocolError::Encode)?;
    let prefix = payload.len().to_string();

    let mut frame = Vec::with_capacity(prefix.len() + 1 + payload.len());
    frame.extend_from_slice(prefix.as_bytes());
    frame.push(delimiter);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Incremental decoder for length-prefixed frames.
///
/// Feed it raw bytes as they arrive; it returns every frame completed so
/// far, in order. Incomplete trailing bytes stay buffered for the next
/// [`feed`](Self::feed).
///
/// Two kinds of bad input are handled without giving up on the stream:
///
/// - A payload that is not valid JSON is dropped and decoding continues
///   with the next frame. Inherited from the source protocol: the sender
///   gets no signal, so this is a silent-data-loss point.
/// - A non-numeric length prefix makes the frame boundary unknowable, so
///   the decoder discards buffered bytes through the delimiter and tries
///   to resynchronize on the next one.
#[derive(Debug)]
pub struct FrameDecoder {
    delimiter: u8,
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Creates a decoder using the given framing delimiter.
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            buffer: Vec::new(),
        }
    }

    /// Appends `bytes` to the internal buffer and decodes every frame
    /// that is now complete.
    ///
    /// # Errors
    /// Returns [`ProtocolError::FrameTooLarge`] if a frame announces a
    /// payload above [`MAX_FRAME_LEN`]; the stream cannot be trusted past
    /// that point and should be closed.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Value>, ProtocolError> {
        self.buffer.extend_from_slice(bytes);
        let mut decoded = Vec::new();

        while let Some(delim_idx) =
            self.buffer.iter().position(|&b| b == self.delimiter)
        {
            let length = match parse_length(&self.buffer[..delim_idx]) {
                Some(n) => n,
                None => {
                    tracing::warn!(
                        prefix = %String::from_utf8_lossy(&self.buffer[..delim_idx]),
                        "bad frame length prefix, resynchronizing"
                    );
                    self.buffer.drain(..=delim_idx);
                    continue;
                }
            };

            if length > MAX_FRAME_LEN {
                return Err(ProtocolError::FrameTooLarge {
                    length,
                    max: MAX_FRAME_LEN,
                });
            }

            let start = delim_idx + 1;
            let end = start + length;
            if self.buffer.len() < end {
                // Payload not fully arrived yet; wait for more bytes.
                break;
            }

            match serde_json::from_slice::<Value>(&self.buffer[start..end]) {
                Ok(value) => decoded.push(value),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        length,
                        "dropping frame with undecodable payload"
                    );
                }
            }
            self.buffer.drain(..end);
        }

        Ok(decoded)
    }

    /// Number of raw bytes currently buffered (incomplete frame data).
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

/// Parses the decimal length prefix. `None` if empty or non-numeric.
fn parse_length(prefix: &[u8]) -> Option<usize> {
    if prefix.is_empty() {
        return None;
    }
    std::str::from_utf8(prefix).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(v: &Value) -> Vec<u8> {
        encode_frame(v, DEFAULT_DELIMITER).unwrap()
    }

    #[test]
    fn test_encode_frame_has_length_prefix_and_delimiter() {
        let frame = encode(&json!({"a": 1}));
        assert_eq!(frame, b"7#{\"a\":1}");
    }

    #[test]
    fn test_feed_single_frame_round_trips() {
        let value = json!({ "type": "END" });
        let mut dec = FrameDecoder::default();
        let out = dec.feed(&encode(&value)).unwrap();
        assert_eq!(out, vec![value]);
        assert_eq!(dec.buffered_len(), 0);
    }

    #[test]
    fn test_feed_byte_by_byte_round_trips() {
        // Frames may be split at *any* byte boundary across reads.
        let value = json!({ "method": "roll", "params": [1, 2, 3] });
        let frame = encode(&value);

        let mut dec = FrameDecoder::default();
        let mut out = Vec::new();
        for b in frame {
            out.extend(dec.feed(&[b]).unwrap());
        }
        assert_eq!(out, vec![value]);
    }

    #[test]
    fn test_feed_two_frames_in_one_delivery_yields_both_in_order() {
        let v1 = json!({ "n": 1 });
        let v2 = json!({ "n": 2 });
        let mut delivery = encode(&v1);
        delivery.extend(encode(&v2));

        let mut dec = FrameDecoder::default();
        let out = dec.feed(&delivery).unwrap();
        assert_eq!(out, vec![v1, v2]);
    }

    #[test]
    fn test_feed_split_across_chunk_boundaries() {
        let v1 = json!("hello");
        let v2 = json!([true, null]);
        let mut bytes = encode(&v1);
        bytes.extend(encode(&v2));

        // Split the two concatenated frames at every possible point.
        for split in 0..=bytes.len() {
            let mut dec = FrameDecoder::default();
            let mut out = dec.feed(&bytes[..split]).unwrap();
            out.extend(dec.feed(&bytes[split..]).unwrap());
            assert_eq!(out, vec![v1.clone(), v2.clone()], "split at {split}");
        }
    }

    #[test]
    fn test_length_counts_bytes_not_chars() {
        // "héllo" is 5 chars but 6 UTF-8 bytes (plus quotes).
        let value = json!("héllo");
        let frame = encode(&value);
        assert!(frame.starts_with(b"8#"));

        let mut dec = FrameDecoder::default();
        assert_eq!(dec.feed(&frame).unwrap(), vec![value]);
    }

    #[test]
    fn test_undecodable_payload_is_dropped_and_stream_continues() {
        let good = json!({ "ok": true });
        let mut bytes = b"8#not-json".to_vec();
        bytes.extend(encode(&good));

        let mut dec = FrameDecoder::default();
        let out = dec.feed(&bytes).unwrap();
        assert_eq!(out, vec![good]);
    }

    #[test]
    fn test_bad_length_prefix_resynchronizes_on_next_delimiter() {
        let good = json!(42);
        let mut bytes = b"oops".to_vec();
        bytes.push(DEFAULT_DELIMITER);
        bytes.extend(encode(&good));

        let mut dec = FrameDecoder::default();
        let out = dec.feed(&bytes).unwrap();
        assert_eq!(out, vec![good]);
    }

    #[test]
    fn test_oversized_length_prefix_returns_error() {
        let mut dec = FrameDecoder::default();
        let bytes = format!("{}#", MAX_FRAME_LEN + 1);
        let result = dec.feed(bytes.as_bytes());
        assert!(matches!(
            result,
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_incomplete_frame_stays_buffered() {
        let frame = encode(&json!([1, 2, 3]));
        let mut dec = FrameDecoder::default();

        let out = dec.feed(&frame[..frame.len() - 1]).unwrap();
        assert!(out.is_empty());
        assert!(dec.buffered_len() > 0);

        let out = dec.feed(&frame[frame.len() - 1..]).unwrap();
        assert_eq!(out, vec![json!([1, 2, 3])]);
    }

    #[test]
    fn test_custom_delimiter() {
        let value = json!("x");
        let frame = encode_frame(&value, b'|').unwrap();
        assert_eq!(frame, b"3|\"x\"");

        let mut dec = FrameDecoder::new(b'|');
        assert_eq!(dec.feed(&frame).unwrap(), vec![value]);
    }
}
