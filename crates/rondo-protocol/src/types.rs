//! Core protocol types for Rondo's wire format.
//!
//! Every message on the wire is a JSON object with a string `type`
//! discriminator, carried inside one length-prefixed frame (see
//! [`crate::frame`]). The set of message kinds is closed: a handshake
//! pair that fixes the connection's identity, the request/reply shapes
//! of the RPC call protocol, and `END` to terminate a connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque identity of one connection, assigned by the server during the
/// handshake.
///
/// A newtype over `String` so a client id can't be confused with a method
/// name or any other string floating around the call sites.
/// `#[serde(transparent)]` keeps the JSON representation a plain string.
///
/// Ids are unique among *live* connections only; the server builds them
/// from a monotonic counter plus a random suffix, and an id may in
/// principle reappear long after its connection is gone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One protocol message.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, and
/// `rename_all = "SCREAMING_SNAKE_CASE"` gives the exact wire tags:
///
/// ```text
/// { "type": "METHOD_REQUEST", "method": "roll", "params": [2] }
/// ```
///
/// On a given connection at most one `MethodRequest` may be awaiting its
/// terminal reply (`MethodResult`, `ErrorMethodNotImplemented` or
/// `ErrorMethodException`) at any time. There are no request ids:
/// correlation is positional: the next inbound message on the
/// connection *is* the reply to the last request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Server → client: "your identity on this connection is `id`".
    /// First message on every connection.
    Handshake { id: ClientId },

    /// Client → server: confirms the assigned identity. The id must match
    /// the one just received or the server closes the connection.
    HandshakeAck { id: ClientId },

    /// Server → client: invoke the named method with the given
    /// positional parameters.
    MethodRequest {
        method: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Vec<Value>>,
    },

    /// Client → server: successful method invocation result.
    MethodResult { result: Value },

    /// Client → server: no such method in the client's table.
    ErrorMethodNotImplemented { method: String },

    /// Client → server: the method implementation failed; `error` is its
    /// stringified error.
    ErrorMethodException { method: String, error: String },

    /// Server → client: no more traffic follows; terminate the dispatch
    /// loop and close.
    End,
}

#[cfg(test)]
mod tests {
    //! The wire format fixes exact JSON shapes; a mismatch means a peer
    //! written against the original protocol can't talk to us. These
    //! tests pin the serde attributes to those shapes.

    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ClientId::from("3:abc123")).unwrap();
        assert_eq!(json, "\"3:abc123\"");
    }

    #[test]
    fn test_handshake_json_format() {
        let msg = Message::Handshake {
            id: ClientId::from("1:deadbeef"),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v, json!({ "type": "HANDSHAKE", "id": "1:deadbeef" }));
    }

    #[test]
    fn test_handshake_ack_json_format() {
        let msg = Message::HandshakeAck {
            id: ClientId::from("1:deadbeef"),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "HANDSHAKE_ACK");
        assert_eq!(v["id"], "1:deadbeef");
    }

    #[test]
    fn test_method_request_with_params_json_format() {
        let msg = Message::MethodRequest {
            method: "roll".into(),
            params: Some(vec![json!(2), json!("d6")]),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({
                "type": "METHOD_REQUEST",
                "method": "roll",
                "params": [2, "d6"],
            })
        );
    }

    #[test]
    fn test_method_request_without_params_omits_field() {
        let msg = Message::MethodRequest {
            method: "getTime".into(),
            params: None,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "METHOD_REQUEST");
        assert!(v.get("params").is_none());
    }

    #[test]
    fn test_method_request_missing_params_deserializes_as_none() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"METHOD_REQUEST","method":"x"}"#)
                .unwrap();
        assert_eq!(
            msg,
            Message::MethodRequest {
                method: "x".into(),
                params: None,
            }
        );
    }

    #[test]
    fn test_method_result_round_trip() {
        let msg = Message::MethodResult {
            result: json!({ "hp": 10, "items": ["sword"] }),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: Message = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_error_not_implemented_json_format() {
        let msg = Message::ErrorMethodNotImplemented {
            method: "fly".into(),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "ERROR_METHOD_NOT_IMPLEMENTED");
        assert_eq!(v["method"], "fly");
    }

    #[test]
    fn test_error_exception_json_format() {
        let msg = Message::ErrorMethodException {
            method: "roll".into(),
            error: "dice on fire".into(),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "ERROR_METHOD_EXCEPTION");
        assert_eq!(v["error"], "dice on fire");
    }

    #[test]
    fn test_end_json_format() {
        let v = serde_json::to_value(&Message::End).unwrap();
        assert_eq!(v, json!({ "type": "END" }));
    }

    #[test]
    fn test_unknown_type_tag_returns_error() {
        let result: Result<Message, _> =
            serde_json::from_str(r#"{"type":"FLY_TO_MOON"}"#);
        assert!(result.is_err());
    }
}
