//! Wire format of event stream frames.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::TransportResult;

/// One event inside a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Event type name, e.g. "WebcastChatMessage".
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque event payload.
    #[serde(default)]
    pub data: Value,
}

/// A batch of events delivered in a single WebSocket frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMessageBundle {
    pub messages: Vec<ClientMessage>,
}

/// Parse a text frame.
pub fn parse_bundle(text: &str) -> TransportResult<ClientMessageBundle> {
    Ok(serde_json::from_str(text)?)
}

/// Decode a binary frame carrying the same JSON document.
pub fn decode_frame(payload: &Bytes) -> TransportResult<ClientMessageBundle> {
    let text = std::str::from_utf8(payload)?;
    parse_bundle(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_preserves_order() {
        let bundle = parse_bundle(
            r#"{"messages":[{"type":"Chat","data":{"text":"hi"}},{"type":"Like","data":{"count":3}}]}"#,
        )
        .unwrap();

        let kinds: Vec<_> = bundle.messages.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, ["Chat", "Like"]);
        assert_eq!(bundle.messages[0].data, json!({"text": "hi"}));
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(parse_bundle("not json").is_err());
        assert!(parse_bundle(r#"{"messages": 5}"#).is_err());
        assert!(decode_frame(&Bytes::from_static(&[0xff, 0xfe])).is_err());
    }

    #[test]
    fn test_binary_frame() {
        let payload = Bytes::from_static(br#"{"messages":[{"type":"roomInfo"}]}"#);
        let bundle = decode_frame(&payload).unwrap();

        assert_eq!(bundle.messages.len(), 1);
        assert_eq!(bundle.messages[0].data, Value::Null);
    }
}
