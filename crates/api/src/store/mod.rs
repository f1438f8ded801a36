// Path: crates/api/src/store/mod.rs
//! Access to persisted key-share material.

use async_trait::async_trait;
use std::path::Path;
use warden_types::error::StoreError;
use zeroize::Zeroizing;

/// Reads raw, JSON-wrapped key material from wherever shares live
/// (filesystem, vault, ...).
///
/// The returned buffer is zeroized on drop; callers move it into a
/// longer-lived secret container before parsing.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Fetches the raw key-material bytes stored at `path`.
    async fn get_share(&self, path: &Path) -> Result<Zeroizing<Vec<u8>>, StoreError>;
}
