// Path: crates/types/src/error/mod.rs
//! Core error types for the Warden wallet service.

use crate::policy::PolicyViolation;
use crate::signer::SignerStatus;
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors from cryptographic helpers (key material, hashing, recovery).
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The persisted key material could not be parsed.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),
    /// A public key was malformed or had an unexpected encoding.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    /// Neither recovery bit produced the expected public key.
    #[error("Signature does not recover to the expected public key")]
    RecoveryFailed,
    /// A digest or length precondition was violated.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ErrorCode for CryptoError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidKeyMaterial(_) => "CRYPTO_INVALID_KEY_MATERIAL",
            Self::InvalidPublicKey(_) => "CRYPTO_INVALID_PUBLIC_KEY",
            Self::RecoveryFailed => "CRYPTO_RECOVERY_FAILED",
            Self::InvalidInput(_) => "CRYPTO_INVALID_INPUT",
        }
    }
}

/// Errors from the chain adapter (RPC, encoding, broadcast).
#[derive(Debug, Error)]
pub enum ChainError {
    /// A JSON-RPC call failed or timed out.
    #[error("Chain RPC error: {0}")]
    Rpc(String),
    /// Transaction encoding failed.
    #[error("Transaction encode error: {0}")]
    Encode(String),
    /// Transaction decoding failed.
    #[error("Transaction decode error: {0}")]
    Decode(String),
    /// The signed transaction was rejected at broadcast.
    #[error("Broadcast failed: {0}")]
    Broadcast(String),
    /// The requested chain id is not configured.
    #[error("Unknown chain id: {0}")]
    UnknownChain(u64),
}

impl ErrorCode for ChainError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rpc(_) => "CHAIN_RPC_ERROR",
            Self::Encode(_) => "CHAIN_ENCODE_ERROR",
            Self::Decode(_) => "CHAIN_DECODE_ERROR",
            Self::Broadcast(_) => "CHAIN_BROADCAST_FAILED",
            Self::UnknownChain(_) => "CHAIN_UNKNOWN_CHAIN",
        }
    }
}

/// Errors from the opaque threshold-signing scheme engine.
#[derive(Debug, Error)]
pub enum SchemeError {
    /// Session creation failed (bad key material, bad party set, ...).
    #[error("Scheme session creation failed: {0}")]
    CreateSession(String),
    /// A protocol round failed.
    #[error("Scheme round failed: {0}")]
    Round(String),
    /// Finalization failed or no signature was available.
    #[error("Scheme finalization failed: {0}")]
    Finalize(String),
    /// The engine has no session under the given handle.
    #[error("Unknown scheme session: {0}")]
    UnknownSession(String),
    /// The out-of-process signing backend failed.
    #[error("Signing backend bridge error: {0}")]
    Bridge(String),
}

impl ErrorCode for SchemeError {
    fn code(&self) -> &'static str {
        match self {
            Self::CreateSession(_) => "SCHEME_CREATE_FAILED",
            Self::Round(_) => "SCHEME_ROUND_FAILED",
            Self::Finalize(_) => "SCHEME_FINALIZE_FAILED",
            Self::UnknownSession(_) => "SCHEME_UNKNOWN_SESSION",
            Self::Bridge(_) => "SCHEME_BRIDGE_ERROR",
        }
    }
}

/// Errors from persistent collaborators (share store, registries, audit log).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The backing store failed.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "STORE_NOT_FOUND",
            Self::Backend(_) => "STORE_BACKEND_ERROR",
        }
    }
}

/// The coordinator-facing error taxonomy.
///
/// Variants map one-to-one onto the surface behavior of the REST API:
/// not-found, precondition/forbidden, policy block (with structured
/// violations), scheme failure, chain failure, and internal.
#[derive(Debug, Error)]
pub enum WardenError {
    /// No signer exists under the given id.
    #[error("Signer not found: {0}")]
    SignerNotFound(String),
    /// No active session exists under the given id.
    #[error("Signing session not found: {0}")]
    SessionNotFound(String),
    /// The signing session outlived its TTL and has been destroyed.
    #[error("Signing session expired")]
    SessionExpired,
    /// The session belongs to a different signer.
    #[error("Session does not belong to this signer")]
    SessionOwnership,
    /// The signer exists but is not in the `Active` state.
    #[error("Signer is {0}")]
    SignerNotActive(SignerStatus),
    /// The concurrent-session cap was reached.
    #[error("Too many concurrent signing sessions")]
    Saturated,
    /// A completion call was made against the wrong session flavor.
    #[error("Session is not a {0} session")]
    WrongSessionKind(&'static str),
    /// The transaction is missing a usable chain id.
    #[error("Transaction chainId is required and must be nonzero")]
    MissingChainId,
    /// Policy evaluation denied the request.
    #[error("Transaction blocked by policy")]
    PolicyBlocked(Vec<PolicyViolation>),
    /// The scheme engine failed; the session has been destroyed.
    #[error(transparent)]
    Scheme(#[from] SchemeError),
    /// A chain RPC, populate, or broadcast step failed.
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// A cryptographic helper failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// A persistent collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Anything else. Messages must never contain secret material.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorCode for WardenError {
    fn code(&self) -> &'static str {
        match self {
            Self::SignerNotFound(_) => "SIGNER_NOT_FOUND",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::SessionOwnership => "SESSION_OWNERSHIP_MISMATCH",
            Self::SignerNotActive(_) => "SIGNER_NOT_ACTIVE",
            Self::Saturated => "SESSION_CAP_REACHED",
            Self::WrongSessionKind(_) => "SESSION_KIND_MISMATCH",
            Self::MissingChainId => "MISSING_CHAIN_ID",
            Self::PolicyBlocked(_) => "POLICY_BLOCKED",
            Self::Scheme(e) => e.code(),
            Self::Chain(e) => e.code(),
            Self::Crypto(e) => e.code(),
            Self::Store(e) => e.code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl WardenError {
    /// True for errors that reflect a caller precondition rather than a
    /// server-side failure. Precondition messages are surfaced verbatim;
    /// everything else is logged and redacted at the HTTP boundary.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::SignerNotFound(_)
                | Self::SessionNotFound(_)
                | Self::SessionExpired
                | Self::SessionOwnership
                | Self::SignerNotActive(_)
                | Self::Saturated
                | Self::WrongSessionKind(_)
                | Self::MissingChainId
                | Self::PolicyBlocked(_)
        )
    }
}
