// Path: crates/node/src/stores.rs
//! Self-hosted default collaborators: a filesystem share store, config-file
//! registries, and an in-memory audit log.
//!
//! Production deployments swap these for real stores behind the same
//! traits; the node stays useful out of the box with nothing but a config
//! file and a shares directory.

use alloy_primitives::U256;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use warden_api::repo::{AuditRepository, PolicyRepository, SignerRepository};
use warden_api::store::ShareStore;
use warden_types::audit::{AuditEntry, AuditStatus, AuditWindow};
use warden_types::error::StoreError;
use warden_types::policy::{LegacyPolicy, RulesDocument};
use warden_types::signer::Signer;

use crate::config::PolicyConfig;

/// Reads raw key material from disk. The returned buffer zeroizes on drop.
pub struct FileShareStore;

#[async_trait]
impl ShareStore for FileShareStore {
    async fn get_share(&self, path: &Path) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Zeroizing::new(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(StoreError::Backend(format!(
                "read share {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Signer registry seeded from the config file.
pub struct ConfigSignerRepo {
    signers: DashMap<String, Signer>,
}

impl ConfigSignerRepo {
    /// Builds the registry from configured signers.
    pub fn new(signers: impl IntoIterator<Item = Signer>) -> Self {
        let map = DashMap::new();
        for signer in signers {
            map.insert(signer.id.clone(), signer);
        }
        Self { signers: map }
    }
}

#[async_trait]
impl SignerRepository for ConfigSignerRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Signer>, StoreError> {
        Ok(self.signers.get(id).map(|s| s.clone()))
    }
}

/// Policy store seeded from the config file.
pub struct ConfigPolicyRepo {
    rules: DashMap<String, RulesDocument>,
    legacy: DashMap<String, Vec<LegacyPolicy>>,
}

impl ConfigPolicyRepo {
    /// Builds the store from configured policy attachments.
    pub fn new(policies: impl IntoIterator<Item = PolicyConfig>) -> Self {
        let rules = DashMap::new();
        let legacy = DashMap::new();
        for policy in policies {
            if let Some(doc) = policy.rules {
                rules.insert(policy.signer_id.clone(), doc);
            }
            if !policy.legacy.is_empty() {
                legacy.insert(policy.signer_id, policy.legacy);
            }
        }
        Self { rules, legacy }
    }
}

#[async_trait]
impl PolicyRepository for ConfigPolicyRepo {
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

/// Append-only audit log kept in memory, optionally mirrored to a JSONL
/// file for operator forensics.
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
    mirror: Option<PathBuf>,
}

impl MemoryAuditLog {
    /// Builds the log; `mirror` appends each entry as a JSON line.
    pub fn new(mirror: Option<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            mirror,
        }
    }
}

#[async_trait]
impl AuditRepository for MemoryAuditLog {
    async fn create(&self, entry: AuditEntry) -> Result<(), StoreError> {
        if let Some(path) = &self.mirror {
            let line = serde_json::to_string(&entry)
                .map_err(|e| StoreError::Backend(format!("encode audit entry: {e}")))?;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .map_err(|e| StoreError::Backend(format!("open audit mirror: {e}")))?;
            tokio::io::AsyncWriteExt::write_all(&mut file, format!("{line}\n").as_bytes())
                .await
                .map_err(|e| StoreError::Backend(format!("append audit mirror: {e}")))?;
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_share_store_distinguishes_missing_from_broken() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("share.json");
        tokio::fs::write(&path, b"{\"coreShare\":\"AA==\",\"auxInfo\":\"AA==\"}")
            .await
            .unwrap();

        let store = FileShareStore;
        let bytes = store.get_share(&path).await.unwrap();
        assert!(bytes.starts_with(b"{"));

        let missing = store.get_share(&dir.path().join("nope.json")).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }
}
