// Path: crates/crypto/src/address.rs
//! Ethereum address derivation from secp256k1 public keys.

use crate::error::CryptoError;
use alloy_primitives::{keccak256, Address};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;

/// Derives the Ethereum address of a 33-byte compressed secp256k1 point:
/// keccak-256 of the uncompressed coordinates, last 20 bytes.
pub fn address_from_compressed(pubkey: &[u8; 33]) -> Result<Address, CryptoError> {
    let point = PublicKey::from_sec1_bytes(pubkey)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let uncompressed = point.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag; hash the 64 coordinate bytes.
    let digest = keccak256(&uncompressed.as_bytes()[1..]);
    Ok(Address::from_slice(&digest[12..]))
}
