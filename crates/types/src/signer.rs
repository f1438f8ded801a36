// Path: crates/types/src/signer.rs
//! Signer registry records.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of a signer. Only `Active` signers may open or drive
/// signing sessions; a status change mid-session tears the session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerStatus {
    /// The signer may sign.
    Active,
    /// Signing is temporarily suspended by the owner.
    Paused,
    /// The signer has been permanently revoked.
    Revoked,
}

impl std::fmt::Display for SignerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerStatus::Active => write!(f, "active"),
            SignerStatus::Paused => write!(f, "paused"),
            SignerStatus::Revoked => write!(f, "revoked"),
        }
    }
}

/// A registered signer: one DKG ceremony's worth of key material, owned by
/// one wallet owner, living at one Ethereum address.
///
/// The registry itself is an external collaborator; the coordinator only
/// reads these records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signer {
    /// Stable signer id (registry primary key).
    pub id: String,
    /// The Ethereum address derived from the DKG public key.
    pub eth_address: Address,
    /// The owner's (human) wallet address.
    pub owner_address: Address,
    /// Current lifecycle state.
    pub status: SignerStatus,
    /// Filesystem path of the server's persisted key material.
    pub share_path: PathBuf,
    /// Threshold-signature scheme identifier (e.g. `"cggmp24"`).
    pub scheme: String,
}

impl Signer {
    /// True when the signer may participate in new or ongoing sessions.
    pub fn is_active(&self) -> bool {
        self.status == SignerStatus::Active
    }
}
