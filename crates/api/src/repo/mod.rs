// Path: crates/api/src/repo/mod.rs
//! Registry and audit-log contracts.

use alloy_primitives::U256;
use async_trait::async_trait;
use warden_types::audit::{AuditEntry, AuditWindow};
use warden_types::error::StoreError;
use warden_types::policy::{LegacyPolicy, RulesDocument};
use warden_types::signer::Signer;

/// Read access to the signer registry.
#[async_trait]
pub trait SignerRepository: Send + Sync {
    /// Looks a signer up by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Signer>, StoreError>;
}

/// Append-only audit log with the rolling aggregates the policy gate needs.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends an entry.
    async fn create(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Number of signing requests recorded for `signer_id` in the window.
    async fn count_by_signer_in_window(
        &self,
        signer_id: &str,
        window: AuditWindow,
    ) -> Result<u64, StoreError>;

    /// Sum of approved transaction values for `signer_id` in the window.
    async fn sum_value_by_signer_in_window(
        &self,
        signer_id: &str,
        window: AuditWindow,
    ) -> Result<U256, StoreError>;
}

/// Read access to policy documents.
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// The signer's rules document, when one exists.
    async fn find_rules(&self, signer_id: &str) -> Result<Option<RulesDocument>, StoreError>;

    /// Legacy per-signer policies, used only when no rules document exists.
    async fn find_legacy_policies(&self, signer_id: &str)
        -> Result<Vec<LegacyPolicy>, StoreError>;
}
