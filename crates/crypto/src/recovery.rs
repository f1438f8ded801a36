// Path: crates/crypto/src/recovery.rs
//! EIP-155 recovery-id computation.
//!
//! The scheme engine emits bare `(r, s)`; Ethereum additionally needs the
//! recovery id `v`. We try both recovery bits, recover a candidate public
//! key from the prehash, and accept the bit whose candidate matches the
//! key the session expects, byte for byte.

use crate::error::CryptoError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Derives `v ∈ {27, 28}` for `(r, s)` over `message_hash`, verified
/// against the expected 33-byte compressed public key.
///
/// Fails deterministically when neither bit recovers the expected key;
/// there is no degraded mode that accepts an unverified bit.
pub fn compute_recovery_id(
    r: &[u8; 32],
    s: &[u8; 32],
    message_hash: &[u8; 32],
    expected_pubkey: &[u8; 33],
) -> Result<u8, CryptoError> {
    if expected_pubkey[0] != 0x02 && expected_pubkey[0] != 0x03 {
        return Err(CryptoError::InvalidPublicKey(
            "expected key is not a compressed secp256k1 point".into(),
        ));
    }

    let signature = Signature::from_scalars(*r, *s)
        .map_err(|e| CryptoError::InvalidInput(format!("signature scalars: {e}")))?;

    for bit in [0u8, 1u8] {
        let recovery_id = RecoveryId::from_byte(bit)
            .ok_or_else(|| CryptoError::InvalidInput("recovery bit out of range".into()))?;

        let Ok(candidate) =
            VerifyingKey::recover_from_prehash(message_hash, &signature, recovery_id)
        else {
            continue;
        };

        if candidate.to_encoded_point(true).as_bytes() == expected_pubkey {
            return Ok(bit + 27);
        }
    }

    Err(CryptoError::RecoveryFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    fn test_key() -> SigningKey {
        let mut seed = [0u8; 32];
        seed[31] = 7;
        SigningKey::from_slice(&seed).unwrap()
    }

    #[test]
    fn recovers_the_bit_k256_reports() {
        let key = test_key();
        let hash = [0x42u8; 32];
        let (sig, recid) = key.sign_prehash_recoverable(&hash).unwrap();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig.r().to_bytes());
        s.copy_from_slice(&sig.s().to_bytes());

        let mut expected = [0u8; 33];
        expected.copy_from_slice(
            key.verifying_key().to_encoded_point(true).as_bytes(),
        );

        let v = compute_recovery_id(&r, &s, &hash, &expected).unwrap();
        assert_eq!(v, recid.to_byte() + 27);
    }

    #[test]
    fn wrong_expected_key_fails_deterministically() {
        let key = test_key();
        let hash = [0x42u8; 32];
        let (sig, _) = key.sign_prehash_recoverable(&hash).unwrap();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig.r().to_bytes());
        s.copy_from_slice(&sig.s().to_bytes());

        // A valid compressed point that is not the signer's key.
        let mut other_seed = [0u8; 32];
        other_seed[31] = 9;
        let other = SigningKey::from_slice(&other_seed).unwrap();
        let mut expected = [0u8; 33];
        expected.copy_from_slice(
            other.verifying_key().to_encoded_point(true).as_bytes(),
        );

        let err = compute_recovery_id(&r, &s, &hash, &expected).unwrap_err();
        assert!(matches!(err, CryptoError::RecoveryFailed));
    }

    #[test]
    fn rejects_uncompressed_expected_key() {
        let r = [1u8; 32];
        let s = [1u8; 32];
        let hash = [0u8; 32];
        let mut expected = [0u8; 33];
        expected[0] = 0x04;
        let err = compute_recovery_id(&r, &s, &hash, &expected).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidPublicKey(_)));
    }
}
