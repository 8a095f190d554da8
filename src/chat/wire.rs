//! Wire message types.
//!
//! These types define what actually gets sent over the network. Everything
//! is one JSON object per UDP datagram:
//!
//! - presence broadcast: `{"username": "<name>"}`
//! - session key offer:  `{"from": "<name>", "key": "<base64 sealed key>"}`
//! - chat envelope:      `{"from": "<name>", "message": "<base64 payload>"}`

use serde::{Deserialize, Serialize};

/// A presence announcement, broadcast periodically by every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMessage {
    /// Display name of the announcing node.
    pub username: String,
}

impl PresenceMessage {
    /// Create a new presence announcement.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Serialize to bytes for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// A sealed session key, unicast to a peer when a session is first
/// established so the peer can decrypt subsequent envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOffer {
    /// Username of the sender (who minted the key).
    pub from: String,
    /// Base64 of the sealed session key.
    pub key: String,
}

impl KeyOffer {
    /// Create a new key offer.
    pub fn new(from: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            key: key.into(),
        }
    }

    /// Serialize to bytes for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// An encrypted chat message, unicast to one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    /// Username of the sender.
    pub from: String,
    /// Base64 of `nonce || ciphertext` under the pair's session key.
    pub message: String,
}

impl ChatEnvelope {
    /// Create a new chat envelope.
    pub fn new(from: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            message: message.into(),
        }
    }

    /// Serialize to bytes for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Any datagram a listener can receive on the shared port.
///
/// Variants are tried in declaration order; the field sets are disjoint, so
/// each well-formed frame matches exactly one shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    /// `{"from", "message"}`
    Chat(ChatEnvelope),
    /// `{"from", "key"}`
    KeyOffer(KeyOffer),
    /// `{"username"}`
    Presence(PresenceMessage),
}

/// Parses a received datagram into one of the wire shapes.
pub fn decode_frame(bytes: &[u8]) -> Result<InboundFrame, serde_json::Error> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_presence_wire_shape() {
        let bytes = PresenceMessage::new("alice").to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value, json!({"username": "alice"}));
    }

    #[test]
    fn test_envelope_wire_shape() {
        let bytes = ChatEnvelope::new("alice", "c2VjcmV0").to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value, json!({"from": "alice", "message": "c2VjcmV0"}));
    }

    #[test]
    fn test_key_offer_wire_shape() {
        let bytes = KeyOffer::new("alice", "a2V5").to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value, json!({"from": "alice", "key": "a2V5"}));
    }

    #[test]
    fn test_decode_presence() {
        let frame = decode_frame(br#"{"username": "bob"}"#).unwrap();

        match frame {
            InboundFrame::Presence(p) => assert_eq!(p.username, "bob"),
            other => panic!("expected presence, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_chat_envelope() {
        let frame = decode_frame(br#"{"from": "bob", "message": "YWJj"}"#).unwrap();

        match frame {
            InboundFrame::Chat(env) => {
                assert_eq!(env.from, "bob");
                assert_eq!(env.message, "YWJj");
            }
            other => panic!("expected chat envelope, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_key_offer() {
        let frame = decode_frame(br#"{"from": "bob", "key": "YWJj"}"#).unwrap();

        match frame {
            InboundFrame::KeyOffer(offer) => {
                assert_eq!(offer.from, "bob");
                assert_eq!(offer.key, "YWJj");
            }
            other => panic!("expected key offer, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(decode_frame(b"definitely not json").is_err());
    }

    #[test]
    fn test_decode_rejects_json_of_wrong_shape() {
        assert!(decode_frame(br#"{"unrelated": 42}"#).is_err());
        assert!(decode_frame(br#"[1, 2, 3]"#).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(decode_frame(&[0xff, 0xfe, 0x80]).is_err());
    }

    #[test]
    fn test_envelope_roundtrip() {
        let env = ChatEnvelope::new("carol", "bm9uY2U=");
        let bytes = env.to_bytes().unwrap();
        let decoded: ChatEnvelope = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(env, decoded);
    }
}
