// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]

//! # Warden API
//!
//! Trait seams between the signing coordinator and everything it talks to:
//! the share store, chain adapters, the signer/audit/policy registries, the
//! rules engine, and the opaque threshold-signing scheme engine.
//!
//! The coordinator depends only on these traits; concrete implementations
//! live in `warden-scheme`, `warden-chain-evm`, `warden-node`, and the test
//! utilities.

pub mod chain;
pub mod error;
pub mod repo;
pub mod rules;
pub mod scheme;
pub mod store;
