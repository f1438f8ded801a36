// Path: crates/test_utils/src/lib.rs
#![forbid(unsafe_code)]

//! In-memory collaborators and a deterministic mock scheme engine, shared
//! by the coordinator and gateway test suites.

pub mod chain;
pub mod engine;
pub mod repos;

pub use chain::MockChain;
pub use engine::MockSchemeEngine;
pub use repos::{InMemoryAuditRepo, InMemoryPolicyRepo, InMemoryShareStore, InMemorySignerRepo};

use alloy_primitives::Address;
use k256::ecdsa::SigningKey;
use std::path::PathBuf;
use warden_crypto::address::address_from_compressed;
use warden_crypto::material::encode_share_file;
use warden_types::signer::{Signer, SignerStatus};

/// Compressed public key of a 32-byte test seed.
pub fn pubkey_of_seed(seed: &[u8; 32]) -> [u8; 33] {
    let key = SigningKey::from_slice(seed).expect("test seed is a valid scalar");
    let mut compressed = [0u8; 33];
    compressed.copy_from_slice(key.verifying_key().to_encoded_point(true).as_bytes());
    compressed
}

/// Ethereum address of a 32-byte test seed.
pub fn address_of_seed(seed: &[u8; 32]) -> Address {
    address_from_compressed(&pubkey_of_seed(seed)).expect("valid point")
}

/// On-disk key-material wrapper understood by [`MockSchemeEngine`]: the
/// core share IS the raw 32-byte seed.
pub fn mock_share_file(seed: &[u8; 32]) -> Vec<u8> {
    encode_share_file(seed, b"mock aux info")
}

/// A ready-to-use active signer whose share lives at `share_path`.
pub fn test_signer(id: &str, seed: &[u8; 32], share_path: PathBuf) -> Signer {
    Signer {
        id: id.to_string(),
        eth_address: address_of_seed(seed),
        owner_address: Address::repeat_byte(0x99),
        status: SignerStatus::Active,
        share_path,
        scheme: "cggmp24".into(),
    }
}
