// Path: crates/crypto/src/material.rs
//! Parsing of persisted key material.
//!
//! On disk a share is UTF-8 JSON: `{"coreShare": base64, "auxInfo": base64}`.
//! Both halves must come from the same DKG ceremony; the wrapper carries no
//! other fields that this service consumes.

use crate::error::CryptoError;
use crate::secret::SecretBuffer;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use zeroize::Zeroize;

/// The two halves of a party's CGGMP24 key material, each in its own
/// zeroizing buffer.
#[derive(Debug)]
pub struct KeyMaterial {
    /// Serialized core key share.
    pub core_share: SecretBuffer,
    /// Serialized auxiliary (Paillier) material from the same ceremony.
    pub aux_info: SecretBuffer,
}

#[derive(Deserialize)]
struct ShareFile {
    #[serde(rename = "coreShare")]
    core_share: String,
    #[serde(rename = "auxInfo")]
    aux_info: String,
}

impl Drop for ShareFile {
    fn drop(&mut self) {
        self.core_share.zeroize();
        self.aux_info.zeroize();
    }
}

impl KeyMaterial {
    /// Parses raw share-store bytes into zeroizing sub-buffers.
    ///
    /// Intermediate copies (the JSON strings, the decode output) are
    /// wiped before this returns, on success and on error alike.
    pub fn parse(raw: &[u8]) -> Result<Self, CryptoError> {
        let wrapper: ShareFile = serde_json::from_slice(raw)
            .map_err(|e| CryptoError::InvalidKeyMaterial(format!("share wrapper: {e}")))?;

        let core = BASE64
            .decode(&wrapper.core_share)
            .map_err(|e| CryptoError::InvalidKeyMaterial(format!("coreShare base64: {e}")))?;
        let core_share = SecretBuffer::new(core);

        let aux = BASE64
            .decode(&wrapper.aux_info)
            .map_err(|e| CryptoError::InvalidKeyMaterial(format!("auxInfo base64: {e}")))?;
        let aux_info = SecretBuffer::new(aux);

        if core_share.is_empty() || aux_info.is_empty() {
            return Err(CryptoError::InvalidKeyMaterial(
                "coreShare and auxInfo must be nonempty".into(),
            ));
        }

        Ok(Self {
            core_share,
            aux_info,
        })
    }

    /// Wipes both halves now.
    pub fn wipe(&mut self) {
        self.core_share.wipe();
        self.aux_info.wipe();
    }
}

/// Encodes a `{coreShare, auxInfo}` pair into the on-disk JSON wrapper.
/// Used by the DKG driver when persisting the server's share.
pub fn encode_share_file(core_share: &[u8], aux_info: &[u8]) -> Vec<u8> {
    let json = serde_json::json!({
        "coreShare": BASE64.encode(core_share),
        "auxInfo": BASE64.encode(aux_info),
    });
    // A two-field object of strings always serializes.
    serde_json::to_vec(&json).expect("share wrapper serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_the_disk_format() {
        let raw = encode_share_file(b"core bytes", b"aux bytes");
        let material = KeyMaterial::parse(&raw).unwrap();
        assert_eq!(material.core_share.as_slice(), b"core bytes");
        assert_eq!(material.aux_info.as_slice(), b"aux bytes");
    }

    #[test]
    fn rejects_missing_fields() {
        let err = KeyMaterial::parse(br#"{"coreShare": "AA=="}"#).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyMaterial(_)));
    }

    #[test]
    fn rejects_bad_base64() {
        let raw = br#"{"coreShare": "!!", "auxInfo": "AA=="}"#;
        assert!(KeyMaterial::parse(raw).is_err());
    }

    #[test]
    fn rejects_empty_halves() {
        let raw = encode_share_file(b"", b"aux");
        assert!(KeyMaterial::parse(&raw).is_err());
    }
}
