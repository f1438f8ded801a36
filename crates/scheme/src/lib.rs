// Path: crates/scheme/src/lib.rs

//! # Warden Scheme
//!
//! The CGGMP24 threshold-ECDSA scheme engine behind the
//! [`SchemeEngine`](warden_api::scheme::SchemeEngine) seam:
//!
//! - [`engine::Cggmp24Engine`]: in-process per-party signing sessions on
//!   the num-bigint backend (the same arithmetic a browser WASM peer runs)
//! - [`dkg`]: the two-phase DKG ceremony driver (aux-info + keygen),
//!   run locally via protocol simulation
//! - [`bridge::GmpBridge`]: driver for the out-of-process native-GMP
//!   signing helper, speaking line-delimited JSON over stdio
//!
//! All MPC math lives in the `cggmp24` crate family; this crate only
//! drives state machines and moves opaque bytes.

pub mod bridge;
pub mod dkg;
pub mod engine;
mod session;
pub mod simulate;

pub use engine::Cggmp24Engine;
