// Path: crates/api/src/error/mod.rs
// Re-export all core error types from the central types crate.
pub use warden_types::error::{
    ChainError, CryptoError, ErrorCode, SchemeError, StoreError, WardenError,
};
pub use warden_types::Result;
