// Path: crates/crypto/src/lib.rs
#![forbid(unsafe_code)]

//! # Warden Crypto
//!
//! Cryptographic helpers around the signing coordinator: the zeroizing
//! [`SecretBuffer`], persisted key-material parsing, EIP-155 recovery-id
//! computation, and Ethereum address derivation.
//!
//! The threshold-signature math itself lives behind the scheme engine; this
//! crate only handles byte hygiene and plain secp256k1 verification.

pub mod address;
pub mod error;
pub mod material;
pub mod recovery;
pub mod secret;

pub use secret::SecretBuffer;
