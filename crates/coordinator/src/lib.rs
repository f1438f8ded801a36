// Path: crates/coordinator/src/lib.rs
#![forbid(unsafe_code)]

//! # Warden Coordinator
//!
//! The server side of the interactive threshold-ECDSA signing protocol:
//! session lifecycle, policy gating, round relaying, signature extraction,
//! transaction population and broadcast, and secret-material hygiene.
//!
//! A session is one two-party CGGMP24 ceremony. The peer (agent CLI or
//! browser) opens it with a transaction template or message hash, the two
//! parties exchange opaque scheme messages over a few REST round trips,
//! and a final call extracts the signature, attaches the recovery id, and
//! (for transactions) broadcasts.

pub mod coordinator;
pub mod gate;
pub mod populate;
pub mod rules;
pub mod table;

pub use coordinator::{
    CompleteSignInput, CompleteSignOutput, CoordinatorConfig, CoordinatorDeps,
    CreateMessageSessionInput, CreateSessionOutput, CreateTxSessionInput, MessageSignOutput,
    ProcessRoundInput, ProcessRoundOutput, SigningCoordinator,
};
