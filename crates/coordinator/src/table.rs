// Path: crates/coordinator/src/table.rs
//! Process-local table of active signing sessions.
//!
//! The table is the synchronization point: handlers and the sweeper share
//! it, and each session's state sits behind its own mutex. The per-session
//! lock is only held for CPU-bound work within one request, never across a
//! peer round trip.

use alloy_primitives::Address;
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use warden_api::scheme::SchemeBackend;
use warden_crypto::SecretBuffer;
use warden_types::error::WardenError;
use warden_types::session::{PolicyOutcome, SigningPath};
use warden_types::tx::{DecodedTransaction, PopulatedTransaction};

/// Variant payload of a session.
pub enum SessionKind {
    /// Transaction signing: the populated transaction is kept so the
    /// unsigned bytes can be rebuilt at completion.
    Transaction {
        /// The populated transaction fixed at creation.
        transaction: PopulatedTransaction,
        /// Decoded fields cached for the audit entry.
        decoded: DecodedTransaction,
    },
    /// Message signing: only the peer-supplied hash.
    Message,
}

/// One active signing ceremony.
///
/// Mutable only by the task currently holding its mutex. Terminal
/// transitions wipe `server_key_material` and remove the entry.
pub struct SessionState {
    /// Owning signer id; every request must present it.
    pub signer_id: String,
    /// The wallet address, denormalized for audit.
    pub eth_address: Address,
    /// The owner address, denormalized for audit.
    pub owner_address: Address,
    /// Compressed secp256k1 point recovery-id verification checks against.
    pub expected_public_key: [u8; 33],
    /// Which two shares cooperate.
    pub signing_path: SigningPath,
    /// The raw, unparsed key material read from the share store.
    pub server_key_material: SecretBuffer,
    /// Cached policy-evaluation stats for the completion audit entry.
    pub policy_result: PolicyOutcome,
    /// Opaque handle into the scheme engine.
    pub scheme_session_id: String,
    /// Which engine backend owns the scheme session.
    pub backend: SchemeBackend,
    /// The 32-byte hash being signed, fixed at creation.
    pub message_hash: [u8; 32],
    /// Count of processed rounds, monotonically increasing.
    pub round: u32,
    /// Caller IP recorded at creation.
    pub caller_ip: Option<String>,
    /// Transaction or message payload.
    pub kind: SessionKind,
}

impl SessionState {
    /// Wipes the raw key material now.
    pub fn wipe(&mut self) {
        self.server_key_material.wipe();
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        // Belt and braces: SecretBuffer zeroizes itself too.
        self.server_key_material.wipe();
    }
}

struct Entry {
    state: Arc<Mutex<SessionState>>,
    created_at: Instant,
}

/// Result of a table lookup.
pub enum Lookup {
    /// The session is live.
    Live(Arc<Mutex<SessionState>>),
    /// The session outlived its TTL; the entry has been removed and the
    /// caller must finish cleanup (wipe + engine destroy).
    Expired(Arc<Mutex<SessionState>>),
    /// No such session.
    Missing,
}

/// Map of session id to state, with a hard capacity and a TTL.
pub struct SessionTable {
    entries: DashMap<Uuid, Entry>,
    // Serializes the len-check-then-insert pair so the cap cannot be
    // overshot by concurrent creates.
    insert_gate: SyncMutex<()>,
    ttl: Duration,
    capacity: usize,
}

impl SessionTable {
    /// Builds a table with the given TTL and capacity.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            insert_gate: SyncMutex::new(()),
            ttl,
            capacity,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no sessions are active.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the table cannot take another session.
    pub fn is_saturated(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Inserts a new session under a fresh random id, or fails when the
    /// table is saturated.
    pub fn try_insert(&self, state: SessionState) -> Result<Uuid, WardenError> {
        let _gate = self.insert_gate.lock();
        if self.entries.len() >= self.capacity {
            return Err(WardenError::Saturated);
        }
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            Entry {
                state: Arc::new(Mutex::new(state)),
                created_at: Instant::now(),
            },
        );
        Ok(id)
    }

    /// Looks a session up, removing it when its TTL has elapsed.
    pub fn lookup(&self, id: &Uuid) -> Lookup {
        let expired = match self.entries.get(id) {
            None => return Lookup::Missing,
            Some(entry) => entry.created_at.elapsed() > self.ttl,
        };
        if !expired {
            // Re-fetch to drop the read guard before cloning.
            return match self.entries.get(id) {
                Some(entry) => Lookup::Live(entry.state.clone()),
                None => Lookup::Missing,
            };
        }
        match self.entries.remove(id) {
            Some((_, entry)) => Lookup::Expired(entry.state),
            None => Lookup::Missing,
        }
    }

    /// Removes a session, returning its state for final cleanup.
    pub fn remove(&self, id: &Uuid) -> Option<Arc<Mutex<SessionState>>> {
        self.entries.remove(id).map(|(_, entry)| entry.state)
    }

    /// Removes and returns every expired session. Called by the sweeper.
    pub fn take_expired(&self) -> Vec<Arc<Mutex<SessionState>>> {
        let expired: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|entry| entry.created_at.elapsed() > self.ttl)
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|(_, e)| e.state))
            .collect()
    }

    /// Removes and returns everything. Called on shutdown.
    pub fn drain_all(&self) -> Vec<Arc<Mutex<SessionState>>> {
        let ids: Vec<Uuid> = self.entries.iter().map(|e| *e.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|(_, e)| e.state))
            .collect()
    }

    #[cfg(test)]
    fn backdate(&self, id: &Uuid, age: Duration) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            entry.created_at = Instant::now() - age;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::session::{MAX_CONCURRENT_SESSIONS, SESSION_TTL};

    fn dummy_state() -> SessionState {
        SessionState {
            signer_id: "signer-1".into(),
            eth_address: Address::ZERO,
            owner_address: Address::ZERO,
            expected_public_key: [2u8; 33],
            signing_path: SigningPath::SignerServer,
            server_key_material: SecretBuffer::new(vec![0xAA; 32]),
            policy_result: PolicyOutcome::default(),
            scheme_session_id: "scheme-1".into(),
            backend: SchemeBackend::WasmCompatible,
            message_hash: [0u8; 32],
            round: 0,
            caller_ip: None,
            kind: SessionKind::Message,
        }
    }

    #[test]
    fn cap_is_enforced_at_exactly_the_limit() {
        let table = SessionTable::new(SESSION_TTL, MAX_CONCURRENT_SESSIONS);
        for _ in 0..MAX_CONCURRENT_SESSIONS {
            table.try_insert(dummy_state()).unwrap();
        }
        assert_eq!(table.len(), MAX_CONCURRENT_SESSIONS);

        let err = table.try_insert(dummy_state()).unwrap_err();
        assert!(matches!(err, WardenError::Saturated));
        assert_eq!(table.len(), MAX_CONCURRENT_SESSIONS);
    }

    #[test]
    fn lookup_destroys_expired_entries() {
        let table = SessionTable::new(SESSION_TTL, 10);
        let id = table.try_insert(dummy_state()).unwrap();
        table.backdate(&id, SESSION_TTL + Duration::from_secs(1));

        assert!(matches!(table.lookup(&id), Lookup::Expired(_)));
        // The entry is gone; a second lookup misses.
        assert!(matches!(table.lookup(&id), Lookup::Missing));
        assert!(table.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let table = SessionTable::new(SESSION_TTL, 10);
        let old = table.try_insert(dummy_state()).unwrap();
        let fresh = table.try_insert(dummy_state()).unwrap();
        table.backdate(&old, SESSION_TTL + Duration::from_secs(1));

        let swept = table.take_expired();
        assert_eq!(swept.len(), 1);
        assert!(matches!(table.lookup(&old), Lookup::Missing));
        assert!(matches!(table.lookup(&fresh), Lookup::Live(_)));
    }

    #[tokio::test]
    async fn wipe_empties_the_key_material() {
        let table = SessionTable::new(SESSION_TTL, 10);
        let id = table.try_insert(dummy_state()).unwrap();
        let state = table.remove(&id).unwrap();
        let mut guard = state.lock().await;
        assert_eq!(guard.server_key_material.len(), 32);
        guard.wipe();
        assert!(guard.server_key_material.is_empty());
    }
}
