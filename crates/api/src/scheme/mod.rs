// Path: crates/api/src/scheme/mod.rs
//! The opaque threshold-signing scheme engine contract.
//!
//! The engine owns all per-session protocol state; the coordinator holds
//! only the opaque session handle. Everything crossing this boundary is
//! bytes: the engine's wire messages are never parsed by callers.

use async_trait::async_trait;
use warden_types::error::SchemeError;
use warden_types::peer::PeerMessage;

/// Which big-integer arithmetic a session runs on. Protocol messages are
/// not interoperable across backends, so both parties must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeBackend {
    /// Pure-Rust big integers; the same arithmetic a browser WASM peer runs.
    WasmCompatible,
    /// Native GMP arithmetic, served by an out-of-process helper.
    Native,
}

/// Inputs to a new signing session.
pub struct CreateSignSession<'a> {
    /// Serialized core key share (one DKG party's output).
    pub core_share: &'a [u8],
    /// Serialized auxiliary material from the same ceremony.
    pub aux_info: &'a [u8],
    /// The 32-byte prehashed message to sign.
    pub message_hash: [u8; 32],
    /// This party's keygen index.
    pub party_index: u16,
    /// Keygen indices of all parties in this ceremony, ascending.
    pub parties_at_keygen: &'a [u16],
    /// 32-byte execution id binding the ceremony's messages together.
    pub eid: [u8; 32],
}

/// A freshly created signing session.
pub struct CreatedSession {
    /// Opaque engine-private session handle.
    pub session_id: String,
    /// First protocol messages to deliver to the peer.
    pub first_messages: Vec<PeerMessage>,
}

/// Output of one protocol round.
pub struct RoundOutput {
    /// Messages to deliver to the peer.
    pub messages: Vec<PeerMessage>,
    /// True once the protocol has produced a signature.
    pub complete: bool,
}

/// A raw ECDSA signature as the scheme emits it: big-endian scalars,
/// low-s normalized, no recovery id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSignature {
    /// The `r` scalar.
    pub r: [u8; 32],
    /// The `s` scalar.
    pub s: [u8; 32],
}

/// The scheme engine seam.
#[async_trait]
pub trait SchemeEngine: Send + Sync {
    /// The arithmetic backend sessions of this engine run on.
    fn backend(&self) -> SchemeBackend;

    /// Creates a signing session and returns the server's first messages.
    async fn create_sign_session(
        &self,
        params: CreateSignSession<'_>,
    ) -> Result<CreatedSession, SchemeError>;

    /// Delivers the peer's messages for one round and returns ours.
    async fn process_sign_round(
        &self,
        session_id: &str,
        incoming: &[PeerMessage],
    ) -> Result<RoundOutput, SchemeError>;

    /// Extracts the signature from a completed session.
    async fn finalize_sign(&self, session_id: &str) -> Result<RawSignature, SchemeError>;

    /// Reads the 33-byte compressed shared public key out of a serialized
    /// core share, without creating a session.
    fn extract_public_key(&self, core_share: &[u8]) -> Result<[u8; 33], SchemeError>;

    /// Destroys a session and frees its protocol state. Idempotent.
    async fn destroy_session(&self, session_id: &str);
}
