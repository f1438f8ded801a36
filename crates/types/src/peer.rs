// Path: crates/types/src/peer.rs
//! The opaque peer-message envelope exchanged between signing parties.
//!
//! The coordinator never inspects `payload`; it forwards the bytes to the
//! scheme engine untouched. On the REST surface each message travels as
//! base64 of the UTF-8 JSON form of [`PeerMessage`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// One protocol message between two signing parties.
///
/// `sender` and `recipient` are keygen party indices. Broadcast messages
/// carry `recipient: None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMessage {
    /// Keygen index of the sending party.
    pub sender: u16,
    /// Whether the message is addressed to all parties.
    pub is_broadcast: bool,
    /// Keygen index of the recipient for point-to-point messages.
    pub recipient: Option<u16>,
    /// Base64-encoded opaque scheme payload. Never parsed here.
    pub payload: String,
}

/// Errors decoding a wire envelope into a [`PeerMessage`].
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The outer base64 layer was malformed.
    #[error("invalid base64 envelope: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The inner JSON did not parse as a peer message.
    #[error("invalid peer message JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PeerMessage {
    /// Encodes this message into its REST envelope form
    /// (base64 over UTF-8 JSON).
    pub fn to_envelope(&self) -> String {
        // Serialization of this plain struct cannot fail.
        let json = serde_json::to_vec(self).expect("peer message serializes");
        BASE64.encode(json)
    }

    /// Decodes a REST envelope back into a message, preserving payload
    /// bytes exactly.
    pub fn from_envelope(envelope: &str) -> Result<Self, EnvelopeError> {
        let json = BASE64.decode(envelope)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip_preserves_payload() {
        let msg = PeerMessage {
            sender: 1,
            is_broadcast: false,
            recipient: Some(0),
            payload: "c29tZSBvcGFxdWUgYnl0ZXM=".into(),
        };
        let envelope = msg.to_envelope();
        let back = PeerMessage::from_envelope(&envelope).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn wire_json_uses_snake_case_fields() {
        let msg = PeerMessage {
            sender: 2,
            is_broadcast: true,
            recipient: None,
            payload: "AA==".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sender"], 2);
        assert_eq!(json["is_broadcast"], true);
        assert!(json["recipient"].is_null());
    }

    #[test]
    fn rejects_garbage_envelopes() {
        assert!(PeerMessage::from_envelope("not!!base64").is_err());
        let not_json = BASE64.encode(b"plain text");
        assert!(PeerMessage::from_envelope(&not_json).is_err());
    }
}
