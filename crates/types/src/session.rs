// Path: crates/types/src/session.rs
//! Signing-session vocabulary: paths, party layout, limits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard cap on simultaneously open signing sessions per process.
pub const MAX_CONCURRENT_SESSIONS: usize = 1000;

/// Absolute session lifetime, measured from creation.
pub const SESSION_TTL: Duration = Duration::from_secs(120);

/// Interval of the background sweep that destroys expired sessions.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(10);

/// Nominal number of protocol rounds a signing ceremony takes; used to
/// report `rounds_remaining` to the peer before the engine says otherwise.
pub const NOMINAL_SIGN_ROUNDS: u32 = 4;

/// DKG party convention: index 0 is the signer (agent), 1 the server,
/// 2 the user (browser).
pub const PARTY_SIGNER: u16 = 0;
/// Server party index under the DKG convention.
pub const PARTY_SERVER: u16 = 1;
/// User (browser) party index under the DKG convention.
pub const PARTY_USER: u16 = 2;

/// Which two of the three shares cooperate in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SigningPath {
    /// Agent SDK/CLI with the server.
    SignerServer,
    /// Browser dashboard with the server.
    UserServer,
    /// Agent with the user's share, server down. The server never
    /// coordinates this path; it exists for completeness of the wire enum.
    SignerUser,
}

impl Default for SigningPath {
    fn default() -> Self {
        Self::SignerServer
    }
}

/// Party layout of one signing ceremony, fixed at session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyConfig {
    /// The server's party index at keygen time.
    pub server_party_index: u16,
    /// The peer's party index at keygen time.
    pub client_party_index: u16,
    /// Keygen indices of all parties in this ceremony, ascending.
    pub parties_at_keygen: Vec<u16>,
}

impl SigningPath {
    /// Resolves the fixed party layout for this path.
    pub fn party_config(&self) -> PartyConfig {
        match self {
            SigningPath::SignerServer | SigningPath::SignerUser => PartyConfig {
                server_party_index: PARTY_SERVER,
                client_party_index: PARTY_SIGNER,
                parties_at_keygen: vec![PARTY_SIGNER, PARTY_SERVER],
            },
            SigningPath::UserServer => PartyConfig {
                server_party_index: PARTY_SERVER,
                client_party_index: PARTY_USER,
                parties_at_keygen: vec![PARTY_SERVER, PARTY_USER],
            },
        }
    }

    /// Whether the peer's MPC arithmetic must be the WASM-compatible
    /// backend. Protocol messages are not interoperable across backends,
    /// and a browser peer cannot run the native one.
    pub fn requires_wasm_backend(&self) -> bool {
        matches!(self, SigningPath::UserServer)
    }
}

/// Cached outcome of the policy evaluation, kept for the audit entry
/// written at completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PolicyOutcome {
    /// Number of rules or policies evaluated.
    pub evaluated_count: u32,
    /// Wall-clock time the evaluation took.
    pub evaluation_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_layout_follows_dkg_convention() {
        let p = SigningPath::SignerServer.party_config();
        assert_eq!(p.server_party_index, 1);
        assert_eq!(p.client_party_index, 0);
        assert_eq!(p.parties_at_keygen, vec![0, 1]);

        let p = SigningPath::UserServer.party_config();
        assert_eq!(p.server_party_index, 1);
        assert_eq!(p.client_party_index, 2);
        assert_eq!(p.parties_at_keygen, vec![1, 2]);

        let p = SigningPath::SignerUser.party_config();
        assert_eq!(p.parties_at_keygen, vec![0, 1]);
    }

    #[test]
    fn only_browser_path_forces_wasm_backend() {
        assert!(SigningPath::UserServer.requires_wasm_backend());
        assert!(!SigningPath::SignerServer.requires_wasm_backend());
        assert!(!SigningPath::SignerUser.requires_wasm_backend());
    }
}
