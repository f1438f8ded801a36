// Path: crates/crypto/src/error.rs
//! Local error types for the `warden-crypto` crate.

// Re-export the canonical error type from the types crate.
pub use warden_types::error::CryptoError;
