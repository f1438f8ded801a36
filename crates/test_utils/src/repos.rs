// Path: crates/test_utils/src/repos.rs
//! In-memory signer, audit, policy, and share-store implementations.

use alloy_primitives::U256;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use warden_api::repo::{AuditRepository, PolicyRepository, SignerRepository};
use warden_api::store::ShareStore;
use warden_types::audit::{AuditEntry, AuditStatus, AuditWindow};
use warden_types::error::StoreError;
use warden_types::policy::{LegacyPolicy, RulesDocument};
use warden_types::signer::{Signer, SignerStatus};
use zeroize::Zeroizing;

/// Signer registry over a `DashMap`.
#[derive(Default)]
pub struct InMemorySignerRepo {
    signers: DashMap<String, Signer>,
}

impl InMemorySignerRepo {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a signer.
    pub fn insert(&self, signer: Signer) {
        self.signers.insert(signer.id.clone(), signer);
    }

    /// Flips a signer's status (simulates pause/revoke mid-session).
    pub fn set_status(&self, id: &str, status: SignerStatus) {
        if let Some(mut signer) = self.signers.get_mut(id) {
            signer.status = status;
        }
    }
}

#[async_trait]
impl SignerRepository for InMemorySignerRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Signer>, StoreError> {
        Ok(self.signers.get(id).map(|s| s.clone()))
    }
}

/// Append-only audit log over a mutex-guarded vector.
#[derive(Default)]
pub struct InMemoryAuditRepo {
    entries: Mutex<Vec<AuditEntry>>,
    fail_writes: Mutex<bool>,
}

impl InMemoryAuditRepo {
    /// Builds an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Entries with the given status.
    pub fn entries_with_status(&self, status: AuditStatus) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.status == status)
            .cloned()
            .collect()
    }

    /// Makes subsequent writes fail (audit-failure resilience tests).
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Seeds an entry directly (for roll-up tests).
    pub fn seed(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepo {
    async fn create(&self, entry: AuditEntry) -> Result<(), StoreError> {
        if *self.fail_writes.lock() {
            return Err(StoreError::Backend("audit store unavailable".into()));
        }
        self.entries.lock().push(entry);
        Ok(())
    }

    async fn count_by_signer_in_window(
        &self,
        signer_id: &str,
        window: AuditWindow,
    ) -> Result<u64, StoreError> {
        let cutoff = AuditEntry::now_ms().saturating_sub(window.as_millis());
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|e| e.signer_id == signer_id && e.created_at_ms >= cutoff)
            .count() as u64)
    }

    async fn sum_value_by_signer_in_window(
        &self,
        signer_id: &str,
        window: AuditWindow,
    ) -> Result<U256, StoreError> {
        let cutoff = AuditEntry::now_ms().saturating_sub(window.as_millis());
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|e| {
                e.signer_id == signer_id
                    && e.status == AuditStatus::Approved
                    && e.created_at_ms >= cutoff
            })
            .fold(U256::ZERO, |acc, e| acc.saturating_add(e.value_wei)))
    }
}

/// Policy-document store keyed by signer id.
#[derive(Default)]
pub struct InMemoryPolicyRepo {
    rules: DashMap<String, RulesDocument>,
    legacy: DashMap<String, Vec<LegacyPolicy>>,
}

impl InMemoryPolicyRepo {
    /// Builds an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a rules document to a signer.
    pub fn set_rules(&self, signer_id: &str, doc: RulesDocument) {
        self.rules.insert(signer_id.to_string(), doc);
    }

    /// Attaches legacy policies to a signer.
    pub fn set_legacy(&self, signer_id: &str, policies: Vec<LegacyPolicy>) {
        self.legacy.insert(signer_id.to_string(), policies);
    }
}

#[async_trait]
impl PolicyRepository for InMemoryPolicyRepo {
    async fn find_rules(&self, signer_id: &str) -> Result<Option<RulesDocument>, StoreError> {
        Ok(self.rules.get(signer_id).map(|d| d.clone()))
    }

    async fn find_legacy_policies(
        &self,
        signer_id: &str,
    ) -> Result<Vec<LegacyPolicy>, StoreError> {
        Ok(self
            .legacy
            .get(signer_id)
            .map(|p| p.clone())
            .unwrap_or_default())
    }
}

/// Share store over a path-keyed map.
#[derive(Default)]
pub struct InMemoryShareStore {
    shares: DashMap<PathBuf, Vec<u8>>,
}

impl InMemoryShareStore {
    /// Builds an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw key-material bytes under a path.
    pub fn put(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.shares.insert(path.into(), bytes);
    }
}

#[async_trait]
impl ShareStore for InMemoryShareStore {
    async fn get_share(&self, path: &Path) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        self.shares
            .get(path)
            .map(|bytes| Zeroizing::new(bytes.clone()))
            .ok_or_else(|| StoreError::NotFound(path.display().to_string()))
    }
}
